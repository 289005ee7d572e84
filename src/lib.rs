//! Rust Wallet Ledger Library
//! # Overview
//!
//! This library provides the wallet subsystem of a two-sided marketplace:
//! buyer, seller and platform balances, the operations that move money
//! between them, and a CSV replay tool with sync and async strategies.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Partition, Listing, Order, LedgerError, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::balance_store`] - Balance partitions, order and withdrawal histories
//!   - [`core::lock_manager`] - Per-operation lock keys
//!   - [`core::ledger`] - Money-movement operations
//!   - [`core::notification`] - Seller notifications
//! - [`io`] - CSV replay input, wallet output and persistence adapters
//! - [`strategy`] - Sync and async replay pipelines
//!
//! # Operations
//!
//! - **Purchase**: buyer pays the listing charge; seller gets 90% of the base
//!   price, the platform the rest
//! - **Subscription**: seller gets 75%, the platform 25%
//! - **Tip**: the full amount goes to the seller
//! - **Custom request**: buyer pays the price plus 10%; seller gets 90% of
//!   the price, the platform the difference
//! - **Withdrawal**: seller or platform takes funds out of its balance
//!
//! # Balances
//!
//! Each identity is a buyer, a seller, or one of the admin aliases that all
//! share the single platform balance. A username may hold both a buyer and a
//! seller balance.
//!
//! # Example
//!
//! ```
//! use rust_wallet_ledger::core::{Ledger, LedgerConfig};
//! use rust_wallet_ledger::types::Listing;
//! use rust_decimal_macros::dec;
//!
//! let ledger = Ledger::new(LedgerConfig::default());
//! ledger.set_buyer_balance("bob", dec!(50.00));
//!
//! let listing = Listing {
//!     id: "listing-1".to_string(),
//!     title: "Silk scarf".to_string(),
//!     description: String::new(),
//!     price: dec!(20.00),
//!     marked_up_price: Some(dec!(22.00)),
//!     image_urls: Vec::new(),
//!     seller: "sally".to_string(),
//! };
//!
//! assert!(ledger.purchase_listing(&listing, "bob"));
//! assert_eq!(ledger.buyer_balance("bob"), dec!(28.00));
//! assert_eq!(ledger.seller_balance("sally"), dec!(18.00));
//! assert_eq!(ledger.admin_balance(), dec!(4.00));
//! ```

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{BalanceStore, Ledger, LedgerCommand, LedgerConfig, LockManager};
pub use io::write_wallet_csv;
pub use types::{
    CustomRequest, LedgerError, Listing, Order, Partition, RequestStatus, WalletEntry, Withdrawal,
};
