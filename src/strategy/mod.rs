//! Replay strategy module
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering both CSV parsing and command execution against a ledger. This
//! allows different implementations (synchronous, asynchronous batch) to be
//! selected at runtime.

use crate::cli::StrategyType;
use crate::core::Ledger;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads ledger commands from a CSV file, executes them
/// against `ledger`, and writes the final wallet rows to `output`.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay commands from `input_path` and write the wallet to `output`
    ///
    /// # Errors
    ///
    /// Returns an error if the input file cannot be opened, a fatal I/O error
    /// occurs, or output cannot be written.
    ///
    /// Malformed rows and rejected commands are logged at `warn` and do not
    /// cause this method to return an error.
    fn process(
        &self,
        ledger: Arc<Ledger>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// `config` is only used by the async strategy; `None` selects the defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<crate::strategy::BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
