//! Ledger configuration
//!
//! Revenue splits and admin aliases used by the money-movement operations.
//! Invalid values fall back to the defaults with a warning, the same way
//! batch settings do.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Configuration for a [`Ledger`](crate::core::Ledger)
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Usernames that all resolve to the single admin balance
    ///
    /// The first alias is the primary one used in the wallet rows.
    pub admin_aliases: Vec<String>,

    /// Fraction of a listing's base price credited to the seller
    pub purchase_seller_share: Decimal,

    /// Fraction of a subscription payment credited to the seller
    pub subscription_seller_share: Decimal,

    /// Multiplier applied to a custom request's base price to get the buyer charge
    pub custom_markup_rate: Decimal,

    /// Fraction of a custom request's base price credited to the seller
    pub custom_seller_share: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            admin_aliases: vec![
                "admin".to_string(),
                "oakley".to_string(),
                "gerome".to_string(),
            ],
            purchase_seller_share: dec!(0.90),
            subscription_seller_share: dec!(0.75),
            custom_markup_rate: dec!(1.10),
            custom_seller_share: dec!(0.90),
        }
    }
}

impl LedgerConfig {
    /// Create a config with custom admin aliases and default splits
    pub fn with_admin_aliases(aliases: Vec<String>) -> Self {
        let default = Self::default();

        let admin_aliases: Vec<String> = aliases
            .into_iter()
            .map(|alias| alias.trim().to_string())
            .filter(|alias| !alias.is_empty())
            .collect();

        let admin_aliases = if admin_aliases.is_empty() {
            tracing::warn!(
                default = ?default.admin_aliases,
                "No valid admin aliases given, using defaults"
            );
            default.admin_aliases
        } else {
            admin_aliases
        };

        Self {
            admin_aliases,
            ..default
        }
    }

    /// Replace any share outside `(0, 1]` or markup below 1 with its default
    pub fn validated(self) -> Self {
        let default = Self::default();

        let share = |value: Decimal, fallback: Decimal, name: &str| {
            if value > Decimal::ZERO && value <= Decimal::ONE {
                value
            } else {
                tracing::warn!(%value, %fallback, "Invalid {}, using default", name);
                fallback
            }
        };

        let purchase_seller_share = share(
            self.purchase_seller_share,
            default.purchase_seller_share,
            "purchase_seller_share",
        );
        let subscription_seller_share = share(
            self.subscription_seller_share,
            default.subscription_seller_share,
            "subscription_seller_share",
        );
        let custom_seller_share = share(
            self.custom_seller_share,
            default.custom_seller_share,
            "custom_seller_share",
        );

        let custom_markup_rate = if self.custom_markup_rate >= Decimal::ONE {
            self.custom_markup_rate
        } else {
            tracing::warn!(
                value = %self.custom_markup_rate,
                "Invalid custom_markup_rate, using default"
            );
            default.custom_markup_rate
        };

        let admin_aliases = if self.admin_aliases.is_empty() {
            default.admin_aliases
        } else {
            self.admin_aliases
        };

        Self {
            admin_aliases,
            purchase_seller_share,
            subscription_seller_share,
            custom_markup_rate,
            custom_seller_share,
        }
    }

    /// Whether `username` is one of the admin aliases
    pub fn is_admin(&self, username: &str) -> bool {
        self.admin_aliases.iter().any(|alias| alias == username)
    }

    /// The alias the admin balance is listed under
    pub fn primary_admin(&self) -> &str {
        self.admin_aliases
            .first()
            .map(String::as_str)
            .unwrap_or("admin")
    }
}
