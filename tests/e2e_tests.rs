//! End-to-end integration tests
//!
//! These tests validate the complete replay pipeline using predefined CSV
//! fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays every command against a fresh ledger
//! 3. Generates the wallet CSV
//! 4. Compares actual output with expected.csv
//!
//! Fixtures whose outcome cannot depend on how debtor partitions interleave
//! run under both strategies. Fixtures where one party's credit funds its own
//! later debit run sync, and async with a batch size of one.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_wallet_ledger::cli::StrategyType;
    use rust_wallet_ledger::core::{Ledger, LedgerConfig};
    use rust_wallet_ledger::io::FileStore;
    use rust_wallet_ledger::strategy::{create_strategy, BatchConfig};
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::{NamedTempFile, TempDir};

    fn replay(
        ledger: Arc<Ledger>,
        input_path: &Path,
        strategy_type: StrategyType,
        config: Option<BatchConfig>,
    ) -> String {
        let strategy = create_strategy(strategy_type, config);

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");
        strategy
            .process(ledger, input_path, &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay commands: {}", e));
        temp_output.flush().expect("Failed to flush temp file");

        fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e))
    }

    /// Replay tests/fixtures/{fixture_name}/input.csv and compare with expected.csv
    fn run_test_fixture(
        fixture_name: &str,
        strategy_type: StrategyType,
        config: Option<BatchConfig>,
    ) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );

        let ledger = Arc::new(Ledger::new(LedgerConfig::default()));
        let actual_output = replay(ledger, Path::new(&input_path), strategy_type, config);

        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    #[rstest]
    #[case("happy_path")]
    #[case("insufficient_funds")]
    #[case("custom_requests")]
    #[case("precision")]
    #[case("malformed_data")]
    #[case("admin_aliases")]
    #[case("mixed_roles")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy, None);
    }

    #[rstest]
    #[case::sync(StrategyType::Sync, None)]
    #[case::async_single_command_batches(StrategyType::Async, Some(BatchConfig::new(1, 2)))]
    fn test_withdrawals_fixture(
        #[case] strategy: StrategyType,
        #[case] config: Option<BatchConfig>,
    ) {
        run_test_fixture("withdrawals", strategy, config);
    }

    #[test]
    fn test_replay_resumes_from_data_dir() {
        let data_dir = TempDir::new().unwrap();

        let mut first = NamedTempFile::new().unwrap();
        first
            .write_all(b"op,user,counterparty,amount\nfund,bob,,50\ntip,bob,sally,10\n")
            .unwrap();
        let store = Arc::new(FileStore::new(data_dir.path()).unwrap());
        let ledger = Arc::new(Ledger::open(LedgerConfig::default(), store).unwrap());
        replay(ledger, first.path(), StrategyType::Sync, None);

        let mut second = NamedTempFile::new().unwrap();
        second
            .write_all(b"op,user,counterparty,amount\nwithdraw,sally,,4\ntip,bob,sally,1\n")
            .unwrap();
        let store = Arc::new(FileStore::new(data_dir.path()).unwrap());
        let ledger = Arc::new(Ledger::open(LedgerConfig::default(), store).unwrap());
        let output = replay(Arc::clone(&ledger), second.path(), StrategyType::Sync, None);

        assert_eq!(
            output,
            "username,role,balance\nadmin,admin,0.00\nbob,buyer,39.00\nsally,seller,7.00\n"
        );
        assert_eq!(ledger.seller_withdrawals("sally").len(), 1);
    }

    #[test]
    fn test_custom_admin_alias() {
        let mut input = NamedTempFile::new().unwrap();
        input
            .write_all(b"op,user,counterparty,amount\ncredit,root,,3\ncredit,oakley,,2\n")
            .unwrap();

        let config = LedgerConfig::with_admin_aliases(vec!["root".to_string()]);
        let output = replay(
            Arc::new(Ledger::new(config)),
            input.path(),
            StrategyType::Sync,
            None,
        );

        assert_eq!(
            output,
            "username,role,balance\noakley,seller,2.00\nroot,admin,3.00\n"
        );
    }
}
