//! I/O module
//!
//! Handles CSV parsing and output, and ledger persistence.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, wallet serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface
//! - `persistence` - Key-value snapshot of the ledger and storage adapters

pub mod async_reader;
pub mod csv_format;
pub mod persistence;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{convert_command_record, write_wallet_csv, CommandRecord};
pub use persistence::{load_store, save_store, FileStore, MemoryStore};
pub use sync_reader::SyncReader;
