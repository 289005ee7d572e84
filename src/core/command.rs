//! Replayable ledger commands
//!
//! A `LedgerCommand` describes one ledger operation with all of its inputs,
//! so a sequence of operations can be read from a file and replayed against
//! a [`Ledger`].

use crate::core::config::LedgerConfig;
use crate::core::ledger::Ledger;
use crate::types::{CustomRequest, LedgerError, Listing, Partition, RequestStatus, Username};
use rust_decimal::Decimal;

/// One ledger operation and its inputs
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    /// Add funds to a buyer balance
    Fund { buyer: Username, amount: Decimal },

    /// Credit a username through partition inference
    Credit { username: Username, amount: Decimal },

    Purchase { buyer: Username, listing: Listing },

    Subscribe {
        buyer: Username,
        seller: Username,
        amount: Decimal,
    },

    Tip {
        buyer: Username,
        seller: Username,
        amount: Decimal,
    },

    Withdraw { seller: Username, amount: Decimal },

    AdminWithdraw { amount: Decimal },

    PayCustomRequest { request: CustomRequest },
}

impl LedgerCommand {
    /// The party whose balance this command checks or changes first
    ///
    /// Commands with the same debtor must run in input order. Every admin
    /// alias shares one balance, so admin withdrawals and commands naming any
    /// alias all report the primary admin alias of `config`.
    pub fn debtor<'a>(&'a self, config: &'a LedgerConfig) -> &'a str {
        let named: &str = match self {
            LedgerCommand::Fund { buyer, .. }
            | LedgerCommand::Purchase { buyer, .. }
            | LedgerCommand::Subscribe { buyer, .. }
            | LedgerCommand::Tip { buyer, .. } => buyer,
            LedgerCommand::Credit { username, .. } => username,
            LedgerCommand::Withdraw { seller, .. } => seller,
            LedgerCommand::AdminWithdraw { .. } => return config.primary_admin(),
            LedgerCommand::PayCustomRequest { request } => &request.buyer,
        };
        if config.is_admin(named) {
            config.primary_admin()
        } else {
            named
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCommand::Fund { .. } => "fund",
            LedgerCommand::Credit { .. } => "credit",
            LedgerCommand::Purchase { .. } => "purchase",
            LedgerCommand::Subscribe { .. } => "subscribe",
            LedgerCommand::Tip { .. } => "tip",
            LedgerCommand::Withdraw { .. } => "withdraw",
            LedgerCommand::AdminWithdraw { .. } => "admin_withdraw",
            LedgerCommand::PayCustomRequest { .. } => "custom",
        }
    }

    /// Run the command against `ledger`
    pub fn execute(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        match self {
            LedgerCommand::Fund { buyer, amount } => {
                if *amount <= Decimal::ZERO {
                    return Err(LedgerError::invalid_parameters(format!(
                        "fund amount must be positive, got {}",
                        amount
                    )));
                }
                ledger.update_wallet_as(Partition::Buyer, buyer, *amount, None)
            }
            LedgerCommand::Credit { username, amount } => {
                ledger.update_wallet(username, *amount, None);
                Ok(())
            }
            LedgerCommand::Purchase { buyer, listing } => {
                ledger.try_purchase_listing(listing, buyer).map(|_| ())
            }
            LedgerCommand::Subscribe {
                buyer,
                seller,
                amount,
            } => ledger.try_subscribe_to_seller_with_payment(buyer, seller, *amount),
            LedgerCommand::Tip {
                buyer,
                seller,
                amount,
            } => ledger.try_send_tip(buyer, seller, *amount),
            LedgerCommand::Withdraw { seller, amount } => {
                ledger.add_seller_withdrawal(seller, *amount).map(|_| ())
            }
            LedgerCommand::AdminWithdraw { amount } => {
                ledger.add_admin_withdrawal(*amount).map(|_| ())
            }
            LedgerCommand::PayCustomRequest { request } => {
                // A replayed file carries its own copy of the request, so the
                // paid status lives in the order history.
                if ledger.has_custom_fulfillment(&request.id) {
                    return Err(LedgerError::request_not_payable(
                        &request.id,
                        RequestStatus::Paid,
                    ));
                }
                let mut request = request.clone();
                ledger.pay_custom_request(&mut request).map(|_| ())
            }
        }
    }
}
