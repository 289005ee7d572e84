//! Core business logic module
//!
//! This module contains the wallet ledger components:
//! - `traits` - Notification and persistence seams
//! - `config` - Admin aliases and revenue splits
//! - `balance_store` - Balance partitions and histories
//! - `lock_manager` - Per-operation lock keys
//! - `ledger` - Money-movement operations
//! - `notification` - Seller notifications and sinks
//! - `command` - Replayable ledger commands
//! - `batch_processor` - Concurrent batch replay partitioned by debtor

pub mod balance_store;
pub mod batch_processor;
pub mod command;
pub mod config;
pub mod ledger;
pub mod lock_manager;
pub mod notification;
pub mod traits;

pub use balance_store::{BalanceStore, Posting};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use command::LedgerCommand;
pub use config::LedgerConfig;
pub use ledger::Ledger;
pub use lock_manager::{LockGuard, LockKey, LockManager};
pub use notification::{notification_channel, ChannelSink, Notification, NotificationKind, TracingSink};
pub use traits::{NotificationSink, PersistenceAdapter};
