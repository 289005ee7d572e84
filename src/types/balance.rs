//! Balance-related types for the wallet ledger
//!
//! This module defines the partitions balances live in, the withdrawal
//! record, and the flattened wallet row used for display and CSV output.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Username identifying a buyer, seller, or admin alias
pub type Username = String;

/// The balance partition an identity belongs to
///
/// Buyers and sellers each have a map of named balances. The admin partition
/// is a single scalar shared by every configured admin alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Funds a buyer can spend on listings, subscriptions, tips and custom orders
    Buyer,

    /// Earnings a seller can withdraw
    Seller,

    /// The platform account, aliased under several admin usernames
    Admin,
}

impl Partition {
    /// Lowercase label used in logs and CSV output
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Buyer => "buyer",
            Partition::Seller => "seller",
            Partition::Admin => "admin",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a completed withdrawal
///
/// Appended to a seller's list or to the admin list. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Amount taken out of the balance
    pub amount: Decimal,

    /// When the withdrawal was recorded
    pub date: DateTime<Utc>,
}

impl Withdrawal {
    /// Create a withdrawal record stamped with the current time
    pub fn now(amount: Decimal) -> Self {
        Withdrawal {
            amount,
            date: Utc::now(),
        }
    }
}

/// One row of the aggregate wallet view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletEntry {
    pub username: Username,
    pub partition: Partition,
    pub balance: Decimal,
}
