//! Balance storage module
//!
//! This module provides the `BalanceStore` struct which holds the three
//! balance partitions and the order and withdrawal histories.
//!
//! The BalanceStore is responsible for:
//! - Reading balances (absent identities read as zero)
//! - Checked credit/debit of single balances
//! - Applying a set of postings all-or-nothing
//! - Appending immutable order and withdrawal records
//!
//! It performs no business validation. Callers check amounts and balances
//! first, and serialize conflicting callers through the
//! [`LockManager`](crate::core::LockManager) and the ledger's store mutex.

use crate::types::{LedgerError, Order, Partition, Username, Withdrawal};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// A single signed balance change
///
/// A set of postings is applied by [`BalanceStore::apply`] as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub partition: Partition,
    pub account: Username,
    pub delta: Decimal,
}

impl Posting {
    /// Posting that adds `amount` to the account
    pub fn credit(partition: Partition, account: &str, amount: Decimal) -> Self {
        Posting {
            partition,
            account: account.to_string(),
            delta: amount,
        }
    }

    /// Posting that subtracts `amount` from the account
    pub fn debit(partition: Partition, account: &str, amount: Decimal) -> Self {
        Posting {
            partition,
            account: account.to_string(),
            delta: -amount,
        }
    }
}

/// In-memory balances and histories
///
/// Buyer and seller balances are keyed by username. The admin partition is a
/// single scalar; the identity passed for `Partition::Admin` is ignored.
/// Histories keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceStore {
    pub(crate) buyer_balances: BTreeMap<Username, Decimal>,
    pub(crate) seller_balances: BTreeMap<Username, Decimal>,
    pub(crate) admin_balance: Decimal,
    pub(crate) order_history: Vec<Order>,
    pub(crate) seller_withdrawals: BTreeMap<Username, Vec<Withdrawal>>,
    pub(crate) admin_withdrawals: Vec<Withdrawal>,
}

impl BalanceStore {
    /// Create an empty store with a zero admin balance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the balance of `id` in `partition`
    ///
    /// Identities with no entry read as zero.
    pub fn balance(&self, partition: Partition, id: &str) -> Decimal {
        match partition {
            Partition::Buyer => self.buyer_balances.get(id).copied().unwrap_or_default(),
            Partition::Seller => self.seller_balances.get(id).copied().unwrap_or_default(),
            Partition::Admin => self.admin_balance,
        }
    }

    /// Whether `id` already has an entry in `partition`
    ///
    /// The admin partition always exists.
    pub fn has_entry(&self, partition: Partition, id: &str) -> bool {
        match partition {
            Partition::Buyer => self.buyer_balances.contains_key(id),
            Partition::Seller => self.seller_balances.contains_key(id),
            Partition::Admin => true,
        }
    }

    /// Overwrite the balance of `id` in `partition`
    pub fn set_balance(&mut self, partition: Partition, id: &str, value: Decimal) {
        match partition {
            Partition::Buyer => {
                self.buyer_balances.insert(id.to_string(), value);
            }
            Partition::Seller => {
                self.seller_balances.insert(id.to_string(), value);
            }
            Partition::Admin => self.admin_balance = value,
        }
    }

    /// Add `delta` to the balance of `id`, returning the new balance
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the result leaves the decimal range.
    /// The balance is unchanged in that case.
    pub fn credit(
        &mut self,
        partition: Partition,
        id: &str,
        delta: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let updated = self
            .balance(partition, id)
            .checked_add(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("credit", id))?;
        self.set_balance(partition, id, updated);
        Ok(updated)
    }

    /// Subtract `delta` from the balance of `id`, returning the new balance
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the result leaves the decimal range.
    pub fn debit(
        &mut self,
        partition: Partition,
        id: &str,
        delta: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let updated = self
            .balance(partition, id)
            .checked_sub(delta)
            .ok_or_else(|| LedgerError::arithmetic_overflow("debit", id))?;
        self.set_balance(partition, id, updated);
        Ok(updated)
    }

    /// Apply every posting, or none of them
    ///
    /// New balances are computed for the whole set before anything is
    /// written, so an overflow in any posting leaves the store untouched.
    /// Several postings against the same account accumulate.
    pub fn apply(&mut self, postings: &[Posting]) -> Result<(), LedgerError> {
        let mut staged: Vec<(Partition, &str, Decimal)> = Vec::with_capacity(postings.len());

        for posting in postings {
            let current = staged
                .iter()
                .rev()
                .find(|(partition, account, _)| {
                    *partition == posting.partition
                        && (posting.partition == Partition::Admin || *account == posting.account)
                })
                .map(|(_, _, value)| *value)
                .unwrap_or_else(|| self.balance(posting.partition, &posting.account));

            let updated = current.checked_add(posting.delta).ok_or_else(|| {
                LedgerError::arithmetic_overflow("posting", &posting.account)
            })?;
            staged.push((posting.partition, posting.account.as_str(), updated));
        }

        for (partition, account, value) in staged {
            self.set_balance(partition, account, value);
        }

        Ok(())
    }

    /// Append an order to the history
    pub fn append_order(&mut self, order: Order) {
        self.order_history.push(order);
    }

    /// Append a withdrawal to a seller's history
    pub fn append_seller_withdrawal(&mut self, seller: &str, withdrawal: Withdrawal) {
        self.seller_withdrawals
            .entry(seller.to_string())
            .or_default()
            .push(withdrawal);
    }

    /// Append a withdrawal to the admin history
    pub fn append_admin_withdrawal(&mut self, withdrawal: Withdrawal) {
        self.admin_withdrawals.push(withdrawal);
    }

    pub fn buyer_balances(&self) -> &BTreeMap<Username, Decimal> {
        &self.buyer_balances
    }

    pub fn seller_balances(&self) -> &BTreeMap<Username, Decimal> {
        &self.seller_balances
    }

    pub fn admin_balance(&self) -> Decimal {
        self.admin_balance
    }

    /// All orders in insertion order
    pub fn order_history(&self) -> &[Order] {
        &self.order_history
    }

    /// Withdrawals recorded for `seller`, oldest first
    pub fn seller_withdrawals(&self, seller: &str) -> &[Withdrawal] {
        self.seller_withdrawals
            .get(seller)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn all_seller_withdrawals(&self) -> &BTreeMap<Username, Vec<Withdrawal>> {
        &self.seller_withdrawals
    }

    pub fn admin_withdrawals(&self) -> &[Withdrawal] {
        &self.admin_withdrawals
    }
}
