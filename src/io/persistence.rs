//! Ledger persistence
//!
//! Maps the [`BalanceStore`] onto a [`PersistenceAdapter`] as six
//! independently stored keys, and provides two adapters: an in-memory map and
//! a directory of JSON files.
//!
//! # Stored keys
//!
//! | Key                       | Value                                     |
//! |---------------------------|-------------------------------------------|
//! | `wallet_buyers`           | JSON object of username to balance string |
//! | `wallet_sellers`          | JSON object of username to balance string |
//! | `wallet_admin`            | Raw decimal string                        |
//! | `wallet_orders`           | JSON array of tagged orders               |
//! | `wallet_sellerWithdrawals`| JSON object of username to withdrawals    |
//! | `wallet_adminWithdrawals` | JSON array of withdrawals                 |
//!
//! Absent keys load as empty state.

use crate::core::balance_store::BalanceStore;
use crate::core::traits::PersistenceAdapter;
use crate::types::LedgerError;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const BUYERS_KEY: &str = "wallet_buyers";
pub const SELLERS_KEY: &str = "wallet_sellers";
pub const ADMIN_KEY: &str = "wallet_admin";
pub const ORDERS_KEY: &str = "wallet_orders";
pub const SELLER_WITHDRAWALS_KEY: &str = "wallet_sellerWithdrawals";
pub const ADMIN_WITHDRAWALS_KEY: &str = "wallet_adminWithdrawals";

/// Every key written by [`save_store`]
pub const ALL_KEYS: [&str; 6] = [
    BUYERS_KEY,
    SELLERS_KEY,
    ADMIN_KEY,
    ORDERS_KEY,
    SELLER_WITHDRAWALS_KEY,
    ADMIN_WITHDRAWALS_KEY,
];

/// Write the full store to `adapter`
///
/// Every key is encoded before the first write, so an encoding failure
/// writes nothing.
pub fn save_store(adapter: &dyn PersistenceAdapter, store: &BalanceStore) -> Result<(), LedgerError> {
    let entries = [
        (BUYERS_KEY, encode(BUYERS_KEY, store.buyer_balances())?),
        (SELLERS_KEY, encode(SELLERS_KEY, store.seller_balances())?),
        (ADMIN_KEY, store.admin_balance().to_string()),
        (ORDERS_KEY, encode(ORDERS_KEY, store.order_history())?),
        (
            SELLER_WITHDRAWALS_KEY,
            encode(SELLER_WITHDRAWALS_KEY, store.all_seller_withdrawals())?,
        ),
        (
            ADMIN_WITHDRAWALS_KEY,
            encode(ADMIN_WITHDRAWALS_KEY, store.admin_withdrawals())?,
        ),
    ];

    for (key, value) in &entries {
        adapter.store(key, value)?;
    }

    tracing::debug!(keys = entries.len(), "Ledger state saved");
    Ok(())
}

/// Read a store back from `adapter`
///
/// # Errors
///
/// Returns `Serialization` naming the key whose value is malformed, or the
/// adapter's own error if a read fails.
pub fn load_store(adapter: &dyn PersistenceAdapter) -> Result<BalanceStore, LedgerError> {
    let admin_balance = match adapter.load(ADMIN_KEY)? {
        Some(raw) => Decimal::from_str(raw.trim())
            .map_err(|e| LedgerError::serialization(ADMIN_KEY, e))?,
        None => Decimal::ZERO,
    };

    Ok(BalanceStore {
        buyer_balances: decode(adapter, BUYERS_KEY)?,
        seller_balances: decode(adapter, SELLERS_KEY)?,
        admin_balance,
        order_history: decode(adapter, ORDERS_KEY)?,
        seller_withdrawals: decode(adapter, SELLER_WITHDRAWALS_KEY)?,
        admin_withdrawals: decode(adapter, ADMIN_WITHDRAWALS_KEY)?,
    })
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, LedgerError> {
    serde_json::to_string(value).map_err(|e| LedgerError::serialization(key, e))
}

fn decode<T: DeserializeOwned + Default>(
    adapter: &dyn PersistenceAdapter,
    key: &str,
) -> Result<T, LedgerError> {
    match adapter.load(key)? {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| LedgerError::serialization(key, e)),
        None => Ok(T::default()),
    }
}

/// Adapter keeping values in process memory
///
/// State is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PersistenceAdapter for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, LedgerError> {
        Ok(self.values.get(key).map(|value| value.clone()))
    }

    fn store(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Adapter storing each key as `{key}.json` in a directory
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous value in place.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the data directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| LedgerError::Persistence {
            message: format!("Failed to create data directory '{}': {}", dir.display(), e),
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl PersistenceAdapter for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, LedgerError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        let target = self.path_for(key);
        let staging = self.dir.join(format!("{}.json.tmp", key));

        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        Ok(())
    }
}
