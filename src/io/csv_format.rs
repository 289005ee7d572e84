//! CSV format handling for command records and wallet output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CommandRecord structure for deserialization
//! - Conversion from CSV records to ledger commands
//! - Wallet output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Input columns
//!
//! `op,user,counterparty,amount,markup,reference,title`
//!
//! | op               | user   | counterparty | amount | markup   | reference  | title    |
//! |------------------|--------|--------------|--------|----------|------------|----------|
//! | `fund`           | buyer  |              | yes    |          |            |          |
//! | `credit`         | user   |              | yes    |          |            |          |
//! | `purchase`       | buyer  | seller       | price  | optional | listing id | required |
//! | `subscribe`      | buyer  | seller       | yes    |          |            |          |
//! | `tip`            | buyer  | seller       | yes    |          |            |          |
//! | `withdraw`       | seller |              | yes    |          |            |          |
//! | `admin_withdraw` |        |              | yes    |          |            |          |
//! | `custom`         | buyer  | seller       | price  |          | request id | required |

use crate::core::command::LedgerCommand;
use crate::types::{CustomRequest, Listing, RequestStatus, WalletEntry};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Only `op` is always required; which other columns must be present
/// depends on the operation.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CommandRecord {
    pub op: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub counterparty: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub markup: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Convert a CommandRecord to a LedgerCommand
///
/// # Returns
///
/// * `Ok(LedgerCommand)` - Successfully converted record
/// * `Err(String)` - Description of the missing or malformed column
pub fn convert_command_record(record: CommandRecord) -> Result<LedgerCommand, String> {
    let op = record.op.trim().to_lowercase();

    let command = match op.as_str() {
        "fund" => LedgerCommand::Fund {
            buyer: required(&op, "user", record.user)?,
            amount: amount(&op, "amount", record.amount)?,
        },
        "credit" => LedgerCommand::Credit {
            username: required(&op, "user", record.user)?,
            amount: amount(&op, "amount", record.amount)?,
        },
        "purchase" => {
            let marked_up_price = match present(record.markup) {
                Some(markup) => Some(parse_amount(&op, "markup", &markup)?),
                None => None,
            };
            LedgerCommand::Purchase {
                buyer: required(&op, "user", record.user)?,
                listing: Listing {
                    id: required(&op, "reference", record.reference)?,
                    title: required(&op, "title", record.title)?,
                    description: String::new(),
                    price: amount(&op, "amount", record.amount)?,
                    marked_up_price,
                    image_urls: Vec::new(),
                    seller: required(&op, "counterparty", record.counterparty)?,
                },
            }
        }
        "subscribe" => LedgerCommand::Subscribe {
            buyer: required(&op, "user", record.user)?,
            seller: required(&op, "counterparty", record.counterparty)?,
            amount: amount(&op, "amount", record.amount)?,
        },
        "tip" => LedgerCommand::Tip {
            buyer: required(&op, "user", record.user)?,
            seller: required(&op, "counterparty", record.counterparty)?,
            amount: amount(&op, "amount", record.amount)?,
        },
        "withdraw" => LedgerCommand::Withdraw {
            seller: required(&op, "user", record.user)?,
            amount: amount(&op, "amount", record.amount)?,
        },
        "admin_withdraw" => LedgerCommand::AdminWithdraw {
            amount: amount(&op, "amount", record.amount)?,
        },
        "custom" => LedgerCommand::PayCustomRequest {
            request: CustomRequest {
                id: required(&op, "reference", record.reference)?,
                title: required(&op, "title", record.title)?,
                description: String::new(),
                price: amount(&op, "amount", record.amount)?,
                seller: required(&op, "counterparty", record.counterparty)?,
                buyer: required(&op, "user", record.user)?,
                tags: Vec::new(),
                status: RequestStatus::Accepted,
            },
        },
        _ => return Err(format!("Invalid operation: '{}'", record.op)),
    };

    Ok(command)
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(op: &str, column: &str, value: Option<String>) -> Result<String, String> {
    present(value).ok_or_else(|| format!("{} requires a {}", op, column))
}

fn amount(op: &str, column: &str, value: Option<String>) -> Result<Decimal, String> {
    let raw = present(value).ok_or_else(|| format!("{} requires an {}", op, column))?;
    parse_amount(op, column, &raw)
}

fn parse_amount(op: &str, column: &str, raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|_| format!("Invalid {} '{}' for {}", column, raw, op))
}

/// Write wallet rows to CSV format
///
/// Writes rows with columns: username, role, balance. Rows are sorted by
/// username, then role, and balances are written with two decimal places.
pub fn write_wallet_csv(entries: &[WalletEntry], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["username", "role", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_entries = entries.to_vec();
    sorted_entries.sort_by(|a, b| {
        a.username
            .cmp(&b.username)
            .then_with(|| a.partition.cmp(&b.partition))
    });

    for entry in sorted_entries {
        writer
            .write_record(&[
                entry.username,
                entry.partition.to_string(),
                format!(
                    "{:.2}",
                    entry
                        .balance
                        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
                ),
            ])
            .map_err(|e| format!("Failed to write wallet record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
