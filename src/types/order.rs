//! Order-related types for the wallet ledger
//!
//! This module defines the marketplace listing a buyer purchases, the
//! tagged order record kept in the order history, and the custom request
//! whose payment produces a fulfilment order.

use super::balance::Username;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A marketplace listing offered for purchase
///
/// `price` is the seller's base price. `marked_up_price`, when present, is
/// the buyer-facing price that funds the platform cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub description: String,

    /// Base price set by the seller
    pub price: Decimal,

    /// Buyer-facing price, if the listing carries a markup
    pub marked_up_price: Option<Decimal>,

    /// Image references, the first of which is copied into the order
    pub image_urls: Vec<String>,

    pub seller: Username,
}

impl Listing {
    /// The amount charged to the buyer
    ///
    /// The marked-up price if present, otherwise the base price.
    pub fn charge(&self) -> Decimal {
        self.marked_up_price.unwrap_or(self.price)
    }

    /// Check the fields a purchase depends on
    ///
    /// `seller_share` is the fraction of `price` credited to the seller. A
    /// markup may sit below the base price as long as the charge still
    /// covers the seller's cut.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field:
    /// - `id`, `title` or `seller` is empty
    /// - `price` is not positive
    /// - `marked_up_price` is not positive, or below `price * seller_share`
    pub fn validate(&self, seller_share: Decimal) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("listing id is empty".to_string());
        }
        if self.title.trim().is_empty() {
            return Err(format!("listing {} has an empty title", self.id));
        }
        if self.seller.trim().is_empty() {
            return Err(format!("listing {} has no seller", self.id));
        }
        if self.price <= Decimal::ZERO {
            return Err(format!(
                "listing {} has non-positive price {}",
                self.id, self.price
            ));
        }
        if let Some(marked_up) = self.marked_up_price {
            if marked_up <= Decimal::ZERO {
                return Err(format!(
                    "listing {} has non-positive marked-up price {}",
                    self.id, marked_up
                ));
            }
            let seller_cut = self.price * seller_share;
            if marked_up < seller_cut {
                return Err(format!(
                    "listing {} marked-up price {} is below the seller cut {}",
                    self.id, marked_up, seller_cut
                ));
            }
        }
        Ok(())
    }
}

/// Immutable record of a completed sale or custom-request fulfilment
///
/// Created only by a successful purchase or a seller credit carrying an
/// attached order. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Order {
    /// A marketplace listing bought at its listed price
    Purchase {
        id: String,
        title: String,
        description: String,
        price: Decimal,
        marked_up_price: Decimal,
        image_url: Option<String>,
        date: DateTime<Utc>,
        seller: Username,
        buyer: Username,
    },

    /// A negotiated custom request paid by the buyer
    CustomFulfillment {
        id: String,
        title: String,
        description: String,
        price: Decimal,
        marked_up_price: Decimal,
        date: DateTime<Utc>,
        seller: Username,
        buyer: Username,
        tags: Vec<String>,
    },
}

impl Order {
    /// Snapshot a listing as a purchase order for `buyer`
    pub fn purchase(listing: &Listing, buyer: &str, date: DateTime<Utc>) -> Self {
        Order::Purchase {
            id: listing.id.clone(),
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: listing.price,
            marked_up_price: listing.charge(),
            image_url: listing.image_urls.first().cloned(),
            date,
            seller: listing.seller.clone(),
            buyer: buyer.to_string(),
        }
    }

    /// Snapshot a custom request as a fulfilment order
    pub fn custom_fulfillment(
        request: &CustomRequest,
        marked_up_price: Decimal,
        date: DateTime<Utc>,
    ) -> Self {
        Order::CustomFulfillment {
            id: request.id.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            price: request.price,
            marked_up_price,
            date,
            seller: request.seller.clone(),
            buyer: request.buyer.clone(),
            tags: request.tags.clone(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Order::Purchase { id, .. } | Order::CustomFulfillment { id, .. } => id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Order::Purchase { title, .. } | Order::CustomFulfillment { title, .. } => title,
        }
    }

    pub fn seller(&self) -> &str {
        match self {
            Order::Purchase { seller, .. } | Order::CustomFulfillment { seller, .. } => seller,
        }
    }

    pub fn buyer(&self) -> &str {
        match self {
            Order::Purchase { buyer, .. } | Order::CustomFulfillment { buyer, .. } => buyer,
        }
    }

    pub fn price(&self) -> Decimal {
        match self {
            Order::Purchase { price, .. } | Order::CustomFulfillment { price, .. } => *price,
        }
    }

    pub fn marked_up_price(&self) -> Decimal {
        match self {
            Order::Purchase {
                marked_up_price, ..
            }
            | Order::CustomFulfillment {
                marked_up_price, ..
            } => *marked_up_price,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Order::Purchase { date, .. } | Order::CustomFulfillment { date, .. } => *date,
        }
    }
}

/// Lifecycle of a custom request
///
/// Negotiation (pending, edited, accepted, rejected) happens outside the
/// ledger. The ledger only moves an accepted request to `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Edited,
    Paid,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Edited => "edited",
            RequestStatus::Paid => "paid",
        };
        f.write_str(label)
    }
}

/// A buyer-initiated custom order proposal
///
/// Owned by the negotiation layer. The ledger reads `price`, `seller` and
/// `buyer` at payment time and sets `status` to `Paid` on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRequest {
    pub id: String,
    pub title: String,
    pub description: String,

    /// Base price agreed with the seller, before markup
    pub price: Decimal,

    pub seller: Username,
    pub buyer: Username,
    pub tags: Vec<String>,
    pub status: RequestStatus,
}
