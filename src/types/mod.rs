//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `balance`: Partitions, withdrawals and wallet rows
//! - `order`: Listings, order records and custom requests
//! - `error`: Error types for the wallet ledger

pub mod balance;
pub mod error;
pub mod order;

pub use balance::{Partition, Username, WalletEntry, Withdrawal};
pub use error::LedgerError;
pub use order::{CustomRequest, Listing, Order, RequestStatus};
