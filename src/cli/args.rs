use crate::core::LedgerConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay wallet ledger commands and print the resulting balances
#[derive(Parser, Debug)]
#[command(name = "wallet-ledger")]
#[command(about = "Replay wallet ledger commands and print the resulting balances", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing ledger commands
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Replay strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' for file order or 'async' for batched parallel replay"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads for batch replay (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Directory holding persisted ledger state
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        help = "Load ledger state from DIR before replay and save it back after each change"
    )]
    pub data_dir: Option<PathBuf>,

    /// Username that resolves to the admin balance
    #[arg(
        long = "admin-alias",
        value_name = "NAME",
        help = "Admin alias (repeatable; replaces the defaults admin, oakley, gerome)"
    )]
    pub admin_aliases: Vec<String>,
}

/// Available replay strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values use the defaults; zero values fall back to the defaults
    /// with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create a LedgerConfig from CLI arguments
    pub fn to_ledger_config(&self) -> LedgerConfig {
        if self.admin_aliases.is_empty() {
            LedgerConfig::default()
        } else {
            LedgerConfig::with_admin_aliases(self.admin_aliases.clone())
        }
    }
}
