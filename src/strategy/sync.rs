//! Synchronous processing strategy
//!
//! Replays commands one at a time in file order. Orchestration only:
//! - CSV parsing is delegated to `SyncReader` (iterator interface)
//! - Money movement is delegated to `Ledger`
//! - CSV output is delegated to `csv_format::write_wallet_csv`

use crate::core::Ledger;
use crate::io::csv_format::write_wallet_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::ProcessingStrategy;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_wallet_ledger::core::Ledger;
/// use rust_wallet_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::sync::Arc;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy;
/// let mut output = io::stdout();
///
/// strategy
///     .process(Arc::new(Ledger::default()), Path::new("commands.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        ledger: Arc<Ledger>,
        input_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), String> {
        let reader = SyncReader::new(input_path)?;

        for result in reader {
            match result {
                Ok(command) => {
                    if let Err(e) = command.execute(&ledger) {
                        tracing::warn!(
                            command = command.name(),
                            debtor = command.debtor(ledger.config()),
                            error = %e,
                            "Command rejected"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping invalid row");
                }
            }
        }

        write_wallet_csv(&ledger.wallet_entries(), output)?;

        Ok(())
    }
}
