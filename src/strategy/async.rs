//! Asynchronous batch processing strategy
//!
//! Replays commands in batches on a tokio multi-thread runtime with
//! debtor-based partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (debtor partitioning + tasks)
//!         └── Arc<Ledger>
//! ```
//!
//! # Ordering
//!
//! - Batches run one after another, so a debtor's commands keep file order
//!   across the whole input
//! - Within a batch, each debtor's commands run sequentially in one task and
//!   different debtors run in parallel
//! - A command crediting a party may interleave with that party's own
//!   debits inside one batch

use crate::core::{BatchProcessor, Ledger};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_wallet_csv;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing
///
/// Controls how commands are batched and the number of worker threads
/// for parallel execution within each batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay commands batch by batch and write the wallet to `output`
    ///
    /// Each batch completes before the next one is read.
    fn process(
        &self,
        ledger: Arc<Ledger>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(Arc::clone(&ledger));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads through the futures AsyncRead traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);

            let mut reader = AsyncReader::new(compat_file);

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for processed in processor.process_batch(batch).await {
                    if let Err(e) = processed.result {
                        tracing::warn!(
                            command = processed.command.name(),
                            debtor = processed.command.debtor(ledger.config()),
                            error = %e,
                            "Command rejected"
                        );
                    }
                }
            }

            Ok::<(), String>(())
        })?;

        write_wallet_csv(&ledger.wallet_entries(), output)?;

        Ok(())
    }
}
