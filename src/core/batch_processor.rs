//! Batch processing with debtor-based partitioning for async replay
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! [`LedgerCommand`]s concurrently while keeping each debtor's commands in
//! input order.
//!
//! # Design
//!
//! A batch is partitioned by [`LedgerCommand::debtor`]. Each partition runs
//! sequentially in its own tokio task and partitions run concurrently.
//! Commands that only credit a party (a purchase crediting a seller) live in
//! the buyer's partition, so they may interleave with that seller's own
//! withdrawals inside one batch.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── Arc<Ledger>  (shared ledger, internally synchronized)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::command::LedgerCommand;
use crate::core::ledger::Ledger;
use crate::types::{LedgerError, Username};

/// Result of executing a single command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The command that was executed
    pub command: LedgerCommand,

    /// The outcome of executing it
    pub result: Result<(), LedgerError>,
}

/// Batch processor with debtor-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    ledger: Arc<Ledger>,
}

impl BatchProcessor {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Partition a batch of commands by debtor
    ///
    /// # Guarantees
    ///
    /// - Each command appears in exactly one sub-batch
    /// - Commands for each debtor keep their input order
    /// - Every command drawing on the admin balance shares one sub-batch
    pub fn partition_by_debtor(
        &self,
        batch: Vec<LedgerCommand>,
    ) -> HashMap<Username, Vec<LedgerCommand>> {
        let config = self.ledger.config();
        let mut debtor_batches: HashMap<Username, Vec<LedgerCommand>> = HashMap::new();

        for command in batch {
            debtor_batches
                .entry(command.debtor(config).to_string())
                .or_default()
                .push(command);
        }

        debtor_batches
    }

    /// Execute one debtor's commands sequentially
    ///
    /// Failures are captured in the results and do not stop later commands.
    pub async fn process_debtor_commands(
        &self,
        commands: Vec<LedgerCommand>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(commands.len());

        for command in commands {
            let result = command.execute(&self.ledger);
            results.push(ProcessingResult { command, result });
        }

        results
    }

    /// Execute a batch, running debtor partitions concurrently
    ///
    /// Results are grouped by debtor; their order across debtors is unspecified.
    pub async fn process_batch(&self, batch: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let debtor_batches = self.partition_by_debtor(batch);

        let mut tasks = Vec::with_capacity(debtor_batches.len());
        for (_debtor, commands) in debtor_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_debtor_commands(commands).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(debtor_results) => results.extend(debtor_results),
                Err(e) => {
                    tracing::error!(error = %e, "Batch partition task failed");
                }
            }
        }

        results
    }
}
