//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over ledger commands from a CSV file.
//! Supports batch reading for concurrent replay.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of LedgerCommands
//!                  ↓
//!           csv_format module
//!           (CommandRecord, convert_command_record)
//! ```

use crate::core::command::LedgerCommand;
use crate::io::csv_format::{convert_command_record, CommandRecord};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 0,
        }
    }

    /// Read up to `batch_size` commands
    ///
    /// Rows that fail to parse are logged at `warn` and skipped. Returns an
    /// empty vector once the end of the input is reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CommandRecord>();

        while batch.len() < batch_size {
            let Some(record) = records.next().await else {
                break;
            };
            self.line_num += 1;
            let line = self.line_num + 1;

            match record {
                Ok(csv_record) => match convert_command_record(csv_record) {
                    Ok(command) => batch.push(command),
                    Err(e) => tracing::warn!(line, error = %e, "Skipping invalid command"),
                },
                Err(e) => tracing::warn!(line, error = %e, "Skipping malformed CSV row"),
            }
        }

        batch
    }
}
