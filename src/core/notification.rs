//! Seller notifications
//!
//! The ledger publishes a [`Notification`] after each successful credit to a
//! seller. Two sinks are provided: a tokio channel for embedders that want
//! to consume events, and a tracing sink that logs them.

use crate::core::traits::NotificationSink;
use rust_decimal::Decimal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Sale,
    Subscription,
    Tip,
    CustomOrder,
}

/// A message for one seller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn sale(seller: &str, title: &str, charge: Decimal) -> Self {
        Notification {
            recipient: seller.to_string(),
            kind: NotificationKind::Sale,
            message: format!("💸 New sale: \"{}\" for ${:.2}", title, charge),
        }
    }

    pub fn subscription(seller: &str, buyer: &str, amount: Decimal) -> Self {
        Notification {
            recipient: seller.to_string(),
            kind: NotificationKind::Subscription,
            message: format!("💰 New subscriber: {} paid ${:.2}/month", buyer, amount),
        }
    }

    pub fn tip(seller: &str, buyer: &str, amount: Decimal) -> Self {
        Notification {
            recipient: seller.to_string(),
            kind: NotificationKind::Tip,
            message: format!("🎁 {} sent you a ${:.2} tip", buyer, amount),
        }
    }

    pub fn custom_order(seller: &str, buyer: &str, title: &str) -> Self {
        Notification {
            recipient: seller.to_string(),
            kind: NotificationKind::CustomOrder,
            message: format!("🛒 New custom order to fulfil: \"{}\" from {}", title, buyer),
        }
    }
}

/// Sink that forwards notifications into an unbounded tokio channel
///
/// Sending never blocks. If the receiver has been dropped the
/// notification is discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<Notification>,
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.sender.send(notification) {
            tracing::debug!(recipient = %err.0.recipient, "Notification receiver dropped");
        }
    }
}

/// Create a channel sink and the receiver its notifications arrive on
pub fn notification_channel() -> (ChannelSink, UnboundedReceiver<Notification>) {
    let (sender, receiver) = unbounded_channel();
    (ChannelSink { sender }, receiver)
}

/// Sink that logs each notification at `info` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            recipient = %notification.recipient,
            kind = ?notification.kind,
            "{}",
            notification.message
        );
    }
}
