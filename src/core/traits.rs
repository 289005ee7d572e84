//! Core traits for the ledger's external collaborators
//!
//! This module defines the seams the ledger publishes to and mirrors its
//! state through. Both are injected into a [`Ledger`](crate::core::Ledger)
//! so tests and embedders can swap implementations.

use crate::core::notification::Notification;
use crate::types::LedgerError;

/// Receiver of seller notifications
///
/// Invoked after a successful credit to a seller. Delivery is fire-and-forget:
/// implementations must not block and must not fail the ledger operation.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification
    fn notify(&self, notification: Notification);
}

/// Durable key-value store that mirrors the ledger
///
/// Each value is a full serialized snapshot of one part of the ledger,
/// rewritten after every mutation and read once at startup.
pub trait PersistenceAdapter: Send + Sync {
    /// Read the value stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<String>, LedgerError>;

    /// Replace the value stored under `key`
    fn store(&self, key: &str, value: &str) -> Result<(), LedgerError>;
}
