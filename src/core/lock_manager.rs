//! Advisory operation locks
//!
//! This module provides the `LockManager`, a set of exclusive, non-reentrant
//! markers keyed by operation type and participants. A held key makes any
//! other invocation of the same operation for the same participants fail
//! immediately instead of queuing.
//!
//! # Design
//!
//! Keys are held in a `DashMap` keyed by [`LockKey`] itself, so acquisition
//! is an atomic test-and-set per key and unrelated keys never contend, even
//! when their rendered forms coincide. [`LockManager::try_lock`]
//! returns a [`LockGuard`] that releases the key when dropped, which covers
//! every exit path of an operation: success, validation failure, `?`
//! propagation and panics.

use crate::types::LedgerError;
use dashmap::DashMap;
use std::fmt;

/// Identity of one serialized critical section
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// `purchase:{buyer}:{seller}`
    Purchase { buyer: String, seller: String },

    /// `subscription:{buyer}:{seller}`
    Subscription { buyer: String, seller: String },

    /// `tip:{buyer}`
    Tip { buyer: String },

    /// `withdrawal:{seller}`
    Withdrawal { seller: String },

    /// `admin_withdrawal`
    AdminWithdrawal,

    /// `custom_request:{id}`
    CustomRequest { id: String },
}

impl LockKey {
    pub fn purchase(buyer: &str, seller: &str) -> Self {
        LockKey::Purchase {
            buyer: buyer.to_string(),
            seller: seller.to_string(),
        }
    }

    pub fn subscription(buyer: &str, seller: &str) -> Self {
        LockKey::Subscription {
            buyer: buyer.to_string(),
            seller: seller.to_string(),
        }
    }

    pub fn tip(buyer: &str) -> Self {
        LockKey::Tip {
            buyer: buyer.to_string(),
        }
    }

    pub fn withdrawal(seller: &str) -> Self {
        LockKey::Withdrawal {
            seller: seller.to_string(),
        }
    }

    pub fn custom_request(id: &str) -> Self {
        LockKey::CustomRequest { id: id.to_string() }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Purchase { buyer, seller } => write!(f, "purchase:{}:{}", buyer, seller),
            LockKey::Subscription { buyer, seller } => {
                write!(f, "subscription:{}:{}", buyer, seller)
            }
            LockKey::Tip { buyer } => write!(f, "tip:{}", buyer),
            LockKey::Withdrawal { seller } => write!(f, "withdrawal:{}", seller),
            LockKey::AdminWithdrawal => f.write_str("admin_withdrawal"),
            LockKey::CustomRequest { id } => write!(f, "custom_request:{}", id),
        }
    }
}

/// Set of currently held lock keys
#[derive(Debug, Default)]
pub struct LockManager {
    held: DashMap<LockKey, ()>,
}

impl LockManager {
    /// Create a manager with no held keys
    pub fn new() -> Self {
        Self {
            held: DashMap::new(),
        }
    }

    /// Mark `key` as held
    ///
    /// Returns `false` without changing anything if the key is already held.
    /// A successful call must be paired with [`release`](Self::release);
    /// prefer [`try_lock`](Self::try_lock), which does that automatically.
    pub fn acquire(&self, key: &LockKey) -> bool {
        let acquired = self.held.insert(key.clone(), ()).is_none();
        if acquired {
            tracing::debug!(%key, "Lock acquired");
        } else {
            tracing::debug!(%key, "Lock already held");
        }
        acquired
    }

    /// Clear the mark on `key` unconditionally
    ///
    /// Also serves as the administrative override for a key left held.
    pub fn release(&self, key: &LockKey) {
        if self.held.remove(key).is_some() {
            tracing::debug!(%key, "Lock released");
        }
    }

    /// Acquire `key` for the lifetime of the returned guard
    ///
    /// # Errors
    ///
    /// Returns `LockContention` if the key is already held.
    pub fn try_lock(&self, key: &LockKey) -> Result<LockGuard<'_>, LedgerError> {
        if self.acquire(key) {
            Ok(LockGuard {
                locks: self,
                key: key.clone(),
            })
        } else {
            Err(LedgerError::lock_contention(key.to_string()))
        }
    }

    pub fn is_held(&self, key: &LockKey) -> bool {
        self.held.contains_key(key)
    }

    /// Currently held keys, rendered and sorted
    pub fn held_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .held
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        keys.sort();
        keys
    }
}

/// Scoped ownership of one lock key
///
/// Dropping the guard releases the key.
#[derive(Debug)]
pub struct LockGuard<'a> {
    locks: &'a LockManager,
    key: LockKey,
}

impl LockGuard<'_> {
    pub fn key(&self) -> &LockKey {
        &self.key
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[rstest]
    #[case(LockKey::purchase("bob", "sally"), "purchase:bob:sally")]
    #[case(LockKey::subscription("bob", "sally"), "subscription:bob:sally")]
    #[case(LockKey::tip("bob"), "tip:bob")]
    #[case(LockKey::withdrawal("sally"), "withdrawal:sally")]
    #[case(LockKey::AdminWithdrawal, "admin_withdrawal")]
    #[case(LockKey::custom_request("req-1"), "custom_request:req-1")]
    fn test_key_format(#[case] key: LockKey, #[case] expected: &str) {
        assert_eq!(key.to_string(), expected);
    }

    #[test]
    fn test_acquire_is_exclusive() {
        let locks = LockManager::new();

        assert!(locks.acquire(&LockKey::withdrawal("sally")));
        assert!(!locks.acquire(&LockKey::withdrawal("sally")));
        assert!(locks.acquire(&LockKey::withdrawal("other")));
    }

    #[test]
    fn test_release_allows_reacquire() {
        let locks = LockManager::new();

        assert!(locks.acquire(&LockKey::AdminWithdrawal));
        locks.release(&LockKey::AdminWithdrawal);

        assert!(!locks.is_held(&LockKey::AdminWithdrawal));
        assert!(locks.acquire(&LockKey::AdminWithdrawal));
    }

    #[test]
    fn test_release_of_unheld_key_is_noop() {
        let locks = LockManager::new();
        locks.release(&LockKey::tip("never-held"));
        assert!(locks.held_keys().is_empty());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let locks = LockManager::new();
        let key = LockKey::withdrawal("sally");

        {
            let guard = locks.try_lock(&key).unwrap();
            assert_eq!(guard.key(), &key);
            assert!(locks.is_held(&key));
        }

        assert!(!locks.is_held(&key));
    }

    #[test]
    fn test_try_lock_is_not_reentrant() {
        let locks = LockManager::new();
        let key = LockKey::purchase("bob", "sally");

        let _guard = locks.try_lock(&key).unwrap();
        let second = locks.try_lock(&key);

        assert!(matches!(
            second,
            Err(LedgerError::LockContention { ref key }) if key == "purchase:bob:sally"
        ));
    }

    #[test]
    fn test_guard_releases_on_error_path() {
        fn guarded(locks: &LockManager) -> Result<(), LedgerError> {
            let _guard = locks.try_lock(&LockKey::AdminWithdrawal)?;
            Err(LedgerError::invalid_parameters("boom"))
        }

        let locks = LockManager::new();
        assert!(guarded(&locks).is_err());
        assert!(!locks.is_held(&LockKey::AdminWithdrawal));
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let locks = Arc::new(LockManager::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    locks.acquire(&LockKey::withdrawal("sally"))
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|acquired| *acquired)
            .count();

        assert_eq!(winners, 1);
    }

    #[test]
    fn test_held_keys_sorted() {
        let locks = LockManager::new();
        locks.acquire(&LockKey::withdrawal("zed"));
        locks.acquire(&LockKey::AdminWithdrawal);

        assert_eq!(locks.held_keys(), vec!["admin_withdrawal", "withdrawal:zed"]);
    }

    #[test]
    fn test_keys_with_separator_in_names_do_not_collide() {
        let locks = LockManager::new();
        let first = LockKey::purchase("a:b", "c");
        let second = LockKey::purchase("a", "b:c");
        assert_eq!(first.to_string(), second.to_string());

        let _guard = locks.try_lock(&first).unwrap();

        assert!(locks.try_lock(&second).is_ok());
        assert!(locks.is_held(&first));
    }
}
