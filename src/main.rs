//! Wallet ledger CLI
//!
//! Replays ledger commands from a CSV file and prints the resulting wallet.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > wallet.csv
//! cargo run -- --strategy sync commands.csv > wallet.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 commands.csv > wallet.csv
//! cargo run -- --data-dir ./state --admin-alias root commands.csv > wallet.csv
//! RUST_LOG=info cargo run -- commands.csv > wallet.csv
//! ```
//!
//! Logs go to stderr; the filter is read from `RUST_LOG` (default `warn`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, unreadable data directory, output failure, etc.)

use rust_wallet_ledger::cli;
use rust_wallet_ledger::core::{Ledger, TracingSink};
use rust_wallet_ledger::io::FileStore;
use rust_wallet_ledger::strategy;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    if let Err(e) = run(&args) {
        tracing::error!(error = %e, "Replay failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), String> {
    let config = args.to_ledger_config();

    let ledger = match &args.data_dir {
        Some(dir) => {
            let store = FileStore::new(dir).map_err(|e| e.to_string())?;
            Ledger::open(config, Arc::new(store)).map_err(|e| e.to_string())?
        }
        None => Ledger::new(config),
    };
    let ledger = Arc::new(ledger.with_notifier(Arc::new(TracingSink)));

    let strategy = {
        let config = if args.strategy == cli::StrategyType::Async {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    strategy.process(Arc::clone(&ledger), &args.input_file, &mut output)?;

    ledger.flush().map_err(|e| e.to_string())
}
