//! Ledger operations
//!
//! This module provides the `Ledger` that moves money between buyers,
//! sellers and the platform account by coordinating the
//! [`BalanceStore`](crate::core::BalanceStore), the
//! [`LockManager`](crate::core::LockManager) and the injected
//! notification and persistence collaborators.
//!
//! The ledger enforces business rules such as:
//! - Per-operation lock keys, released on every exit path
//! - Balance checks before any mutation (all-or-nothing)
//! - Revenue splits between seller and platform
//! - Seller notification and persistence after each successful mutation
//!
//! # Concurrency
//!
//! Lock keys only stop the same logical operation from re-entering for the
//! same participants. Different operations touching the same balance (a
//! purchase crediting a seller while that seller withdraws) are serialized by
//! a single store mutex held for each read-validate-write.

use crate::core::balance_store::{BalanceStore, Posting};
use crate::core::config::LedgerConfig;
use crate::core::lock_manager::{LockKey, LockManager};
use crate::core::notification::Notification;
use crate::core::traits::{NotificationSink, PersistenceAdapter};
use crate::io::persistence;
use crate::types::{
    CustomRequest, LedgerError, Listing, Order, Partition, RequestStatus, WalletEntry, Withdrawal,
};
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Wallet ledger for buyers, sellers and the platform account
///
/// Construct one per data store and share it (`Arc<Ledger>`) between call
/// sites. Every operation takes `&self`.
pub struct Ledger {
    config: LedgerConfig,
    store: Mutex<BalanceStore>,
    locks: LockManager,
    notifier: Option<Arc<dyn NotificationSink>>,
    persistence: Option<Arc<dyn PersistenceAdapter>>,
}

impl Ledger {
    /// Create an empty ledger with no notifier and no persistence
    pub fn new(config: LedgerConfig) -> Self {
        Self::from_store(config, BalanceStore::new())
    }

    /// Create a ledger seeded with an existing store
    pub fn from_store(config: LedgerConfig, store: BalanceStore) -> Self {
        Ledger {
            config: config.validated(),
            store: Mutex::new(store),
            locks: LockManager::new(),
            notifier: None,
            persistence: None,
        }
    }

    /// Create a ledger seeded from `adapter` that mirrors every mutation back to it
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot be read or a stored value is
    /// malformed. Absent keys seed empty state.
    pub fn open(
        config: LedgerConfig,
        adapter: Arc<dyn PersistenceAdapter>,
    ) -> Result<Self, LedgerError> {
        let store = persistence::load_store(adapter.as_ref())?;
        tracing::info!(
            buyers = store.buyer_balances().len(),
            sellers = store.seller_balances().len(),
            orders = store.order_history().len(),
            "Ledger state loaded"
        );
        Ok(Self::from_store(config, store).with_persistence(adapter))
    }

    /// Attach the sink that receives seller notifications
    pub fn with_notifier(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(sink);
        self
    }

    /// Attach the adapter that mirrors state after each mutation
    pub fn with_persistence(mut self, adapter: Arc<dyn PersistenceAdapter>) -> Self {
        self.persistence = Some(adapter);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// The lock keys guarding ledger operations
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    // A panic while holding the guard leaves the store as it was before the
    // panicking operation's first write, so the poisoned value is still valid.
    fn store(&self) -> MutexGuard<'_, BalanceStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, store: &BalanceStore) {
        if let Some(adapter) = &self.persistence {
            if let Err(e) = persistence::save_store(adapter.as_ref(), store) {
                tracing::error!(error = %e, "Failed to persist ledger state");
            }
        }
    }

    fn notify(&self, notification: Notification) {
        if let Some(sink) = &self.notifier {
            sink.notify(notification);
        }
    }

    /// Write the full state to the persistence adapter now
    ///
    /// A no-op when no adapter is attached.
    pub fn flush(&self) -> Result<(), LedgerError> {
        match &self.persistence {
            Some(adapter) => persistence::save_store(adapter.as_ref(), &self.store()),
            None => Ok(()),
        }
    }

    /// Purchase a listing for `buyer`
    ///
    /// Returns `true` only if the whole purchase completed. On `false`
    /// nothing was changed. See [`try_purchase_listing`](Self::try_purchase_listing).
    pub fn purchase_listing(&self, listing: &Listing, buyer: &str) -> bool {
        match self.try_purchase_listing(listing, buyer) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(listing = %listing.id, buyer, error = %e, "Purchase rejected");
                false
            }
        }
    }

    /// Purchase a listing for `buyer`, returning the recorded order
    ///
    /// The buyer pays the listing's charge (marked-up price if present). The
    /// seller receives the configured share of the base price and the
    /// platform receives the rest of the charge.
    ///
    /// # Errors
    ///
    /// Checked in this order, with no balance mutated on failure:
    /// - `LockContention` if `purchase:{buyer}:{seller}` is held
    /// - `InsufficientBalance` if the buyer cannot cover the charge
    /// - `InvalidParameters` if the listing or buyer is malformed
    pub fn try_purchase_listing(
        &self,
        listing: &Listing,
        buyer: &str,
    ) -> Result<Order, LedgerError> {
        let _guard = self
            .locks
            .try_lock(&LockKey::purchase(buyer, &listing.seller))?;

        let charge = listing.charge();

        let order = {
            let mut store = self.store();

            let available = store.balance(Partition::Buyer, buyer);
            if available < charge {
                return Err(LedgerError::insufficient_balance(buyer, available, charge));
            }

            listing
                .validate(self.config.purchase_seller_share)
                .map_err(LedgerError::invalid_parameters)?;
            require_identity("buyer", buyer)?;

            let seller_cut = share_of(listing.price, self.config.purchase_seller_share, buyer)?;
            let platform_cut = charge - seller_cut;

            store.apply(&[
                Posting::debit(Partition::Buyer, buyer, charge),
                Posting::credit(Partition::Seller, &listing.seller, seller_cut),
                Posting::credit(Partition::Admin, self.config.primary_admin(), platform_cut),
            ])?;

            let order = Order::purchase(listing, buyer, Utc::now());
            store.append_order(order.clone());
            self.persist(&store);

            tracing::info!(
                listing = %listing.id,
                buyer,
                seller = %listing.seller,
                %charge,
                %seller_cut,
                %platform_cut,
                "Listing purchased"
            );
            order
        };

        self.notify(Notification::sale(&listing.seller, &listing.title, charge));
        Ok(order)
    }

    /// Pay a subscription from `buyer` to `seller`
    ///
    /// Returns `false` with nothing changed if any precondition fails.
    pub fn subscribe_to_seller_with_payment(
        &self,
        buyer: &str,
        seller: &str,
        amount: Decimal,
    ) -> bool {
        match self.try_subscribe_to_seller_with_payment(buyer, seller, amount) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(buyer, seller, %amount, error = %e, "Subscription rejected");
                false
            }
        }
    }

    /// Pay a subscription, reporting why it was rejected
    ///
    /// The seller receives the configured subscription share and the
    /// platform the remainder. No order is recorded.
    pub fn try_subscribe_to_seller_with_payment(
        &self,
        buyer: &str,
        seller: &str,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        require_identity("buyer", buyer)?;
        require_identity("seller", seller)?;
        require_positive(amount)?;

        let _guard = self.locks.try_lock(&LockKey::subscription(buyer, seller))?;

        {
            let mut store = self.store();

            let available = store.balance(Partition::Buyer, buyer);
            if available < amount {
                return Err(LedgerError::insufficient_balance(buyer, available, amount));
            }

            let seller_cut = share_of(amount, self.config.subscription_seller_share, seller)?;
            let admin_cut = amount - seller_cut;

            store.apply(&[
                Posting::debit(Partition::Buyer, buyer, amount),
                Posting::credit(Partition::Seller, seller, seller_cut),
                Posting::credit(Partition::Admin, self.config.primary_admin(), admin_cut),
            ])?;
            self.persist(&store);

            tracing::info!(buyer, seller, %amount, %seller_cut, %admin_cut, "Subscription paid");
        }

        self.notify(Notification::subscription(seller, buyer, amount));
        Ok(())
    }

    /// Send a tip from `buyer` to `seller`
    ///
    /// Returns `false` with nothing changed if any precondition fails.
    pub fn send_tip(&self, buyer: &str, seller: &str, amount: Decimal) -> bool {
        match self.try_send_tip(buyer, seller, amount) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(buyer, seller, %amount, error = %e, "Tip rejected");
                false
            }
        }
    }

    /// Send a tip, reporting why it was rejected
    ///
    /// The whole amount moves from buyer to seller. Tips from one buyer are
    /// serialized under `tip:{buyer}`.
    pub fn try_send_tip(&self, buyer: &str, seller: &str, amount: Decimal) -> Result<(), LedgerError> {
        require_identity("buyer", buyer)?;
        require_identity("seller", seller)?;
        require_positive(amount)?;

        let _guard = self.locks.try_lock(&LockKey::tip(buyer))?;

        {
            let mut store = self.store();

            let available = store.balance(Partition::Buyer, buyer);
            if available < amount {
                return Err(LedgerError::insufficient_balance(buyer, available, amount));
            }

            store.apply(&[
                Posting::debit(Partition::Buyer, buyer, amount),
                Posting::credit(Partition::Seller, seller, amount),
            ])?;
            self.persist(&store);

            tracing::info!(buyer, seller, %amount, "Tip sent");
        }

        self.notify(Notification::tip(seller, buyer, amount));
        Ok(())
    }

    /// Credit (or, with a negative amount, debit) `username` with an inferred partition
    ///
    /// The partition is resolved in priority order:
    /// 1. an admin alias credits the admin balance
    /// 2. an existing seller entry, or an attached order naming `username` as
    ///    seller, credits the seller balance
    /// 3. an existing buyer entry credits the buyer balance
    /// 4. otherwise a positive amount is treated as a new seller's first
    ///    credit and anything else as a buyer debit
    ///
    /// When the resolved partition is the seller's and the attached order
    /// names `username` as seller, the credit and the order append happen as
    /// one step and the seller is notified. This never fails; callers
    /// validate amounts and balances first. Prefer
    /// [`update_wallet_as`](Self::update_wallet_as), which takes the partition
    /// explicitly.
    pub fn update_wallet(&self, username: &str, amount: Decimal, order: Option<Order>) {
        let notification = {
            let mut store = self.store();
            let partition = self.resolve_partition(&store, username, amount, order.as_ref());

            let order = match order {
                Some(order) if partition == Partition::Seller && order.seller() == username => {
                    Some(order)
                }
                Some(order) => {
                    tracing::warn!(
                        username,
                        %partition,
                        order = %order.id(),
                        "Dropping order attached to a non-seller credit"
                    );
                    None
                }
                None => None,
            };

            match apply_credit(&mut store, partition, username, amount, order) {
                Ok(notification) => {
                    self.persist(&store);
                    tracing::info!(username, %partition, %amount, "Wallet updated");
                    notification
                }
                Err(e) => {
                    tracing::error!(username, %partition, %amount, error = %e, "Wallet update failed");
                    None
                }
            }
        };

        if let Some(notification) = notification {
            self.notify(notification);
        }
    }

    /// Credit (or debit) `username` in an explicit partition
    ///
    /// An attached order is appended atomically with the credit and the
    /// seller is notified.
    ///
    /// # Errors
    ///
    /// - `InvalidParameters` if `username` is empty for a buyer or seller, an
    ///   attached order is not for `Partition::Seller`, or the order names a
    ///   different seller
    /// - `ArithmeticOverflow` if the balance would leave the decimal range
    pub fn update_wallet_as(
        &self,
        partition: Partition,
        username: &str,
        amount: Decimal,
        order: Option<Order>,
    ) -> Result<(), LedgerError> {
        if partition != Partition::Admin {
            require_identity("username", username)?;
        }
        if let Some(order) = &order {
            if partition != Partition::Seller {
                return Err(LedgerError::invalid_parameters(format!(
                    "order {} can only be attached to a seller credit, not {}",
                    order.id(),
                    partition
                )));
            }
            if order.seller() != username {
                return Err(LedgerError::invalid_parameters(format!(
                    "order {} belongs to seller {}, not {}",
                    order.id(),
                    order.seller(),
                    username
                )));
            }
        }

        let notification = {
            let mut store = self.store();
            let notification = apply_credit(&mut store, partition, username, amount, order)?;
            self.persist(&store);
            tracing::info!(username, %partition, %amount, "Wallet updated");
            notification
        };

        if let Some(notification) = notification {
            self.notify(notification);
        }
        Ok(())
    }

    fn resolve_partition(
        &self,
        store: &BalanceStore,
        username: &str,
        amount: Decimal,
        order: Option<&Order>,
    ) -> Partition {
        if self.config.is_admin(username) {
            Partition::Admin
        } else if store.has_entry(Partition::Seller, username)
            || order.is_some_and(|order| order.seller() == username)
        {
            Partition::Seller
        } else if store.has_entry(Partition::Buyer, username) {
            Partition::Buyer
        } else if amount > Decimal::ZERO {
            Partition::Seller
        } else {
            Partition::Buyer
        }
    }

    /// Withdraw seller earnings
    ///
    /// # Errors
    ///
    /// - `InvalidParameters` if `username` is empty or `amount` is not positive
    /// - `LockContention` if another withdrawal for the seller is in progress
    /// - `InsufficientBalance` if the seller balance is below `amount`
    pub fn add_seller_withdrawal(
        &self,
        username: &str,
        amount: Decimal,
    ) -> Result<Withdrawal, LedgerError> {
        require_identity("seller", username)?;
        require_positive(amount)?;

        let _guard = self.locks.try_lock(&LockKey::withdrawal(username))?;

        let mut store = self.store();

        let available = store.balance(Partition::Seller, username);
        if available < amount {
            return Err(LedgerError::insufficient_balance(username, available, amount));
        }

        store.debit(Partition::Seller, username, amount)?;
        let withdrawal = Withdrawal::now(amount);
        store.append_seller_withdrawal(username, withdrawal.clone());
        self.persist(&store);

        tracing::info!(seller = username, %amount, "Seller withdrawal recorded");
        Ok(withdrawal)
    }

    /// Withdraw from the platform account
    ///
    /// # Errors
    ///
    /// - `InvalidParameters` if `amount` is not positive
    /// - `LockContention` if another admin withdrawal is in progress
    /// - `InsufficientBalance` if the admin balance is below `amount`
    pub fn add_admin_withdrawal(&self, amount: Decimal) -> Result<Withdrawal, LedgerError> {
        require_positive(amount)?;

        let _guard = self.locks.try_lock(&LockKey::AdminWithdrawal)?;

        let mut store = self.store();

        let available = store.admin_balance();
        if available < amount {
            return Err(LedgerError::insufficient_balance(
                self.config.primary_admin(),
                available,
                amount,
            ));
        }

        store.debit(Partition::Admin, self.config.primary_admin(), amount)?;
        let withdrawal = Withdrawal::now(amount);
        store.append_admin_withdrawal(withdrawal.clone());
        self.persist(&store);

        tracing::info!(%amount, "Admin withdrawal recorded");
        Ok(withdrawal)
    }

    /// Pay an accepted custom request and mark it paid
    ///
    /// The buyer is charged the base price times the markup rate. The seller
    /// receives the seller share of the base price and the platform the
    /// difference, each rounded to cents. The debit, both credits and the
    /// fulfilment order are applied together.
    ///
    /// # Errors
    ///
    /// - `RequestNotPayable` unless the request is `Accepted`
    /// - `InvalidParameters` for an empty id, title or identity, or a
    ///   non-positive price
    /// - `LockContention` if the same request is being paid concurrently
    /// - `InsufficientBalance` if the buyer cannot cover the marked-up price
    pub fn pay_custom_request(&self, request: &mut CustomRequest) -> Result<Order, LedgerError> {
        if request.status != RequestStatus::Accepted {
            return Err(LedgerError::request_not_payable(&request.id, request.status));
        }
        require_identity("request id", &request.id)?;
        require_identity("request title", &request.title)?;
        require_identity("buyer", &request.buyer)?;
        require_identity("seller", &request.seller)?;
        require_positive(request.price)?;

        let _guard = self.locks.try_lock(&LockKey::custom_request(&request.id))?;

        let markup_price = round_cents(share_of(
            request.price,
            self.config.custom_markup_rate,
            &request.buyer,
        )?);
        let seller_share = round_cents(share_of(
            request.price,
            self.config.custom_seller_share,
            &request.seller,
        )?);
        let admin_cut = round_cents(markup_price - seller_share);

        let order = {
            let mut store = self.store();

            let available = store.balance(Partition::Buyer, &request.buyer);
            if available < markup_price {
                return Err(LedgerError::insufficient_balance(
                    &request.buyer,
                    available,
                    markup_price,
                ));
            }

            store.apply(&[
                Posting::debit(Partition::Buyer, &request.buyer, markup_price),
                Posting::credit(Partition::Admin, self.config.primary_admin(), admin_cut),
                Posting::credit(Partition::Seller, &request.seller, seller_share),
            ])?;

            let order = Order::custom_fulfillment(request, markup_price, Utc::now());
            store.append_order(order.clone());
            self.persist(&store);

            tracing::info!(
                request = %request.id,
                buyer = %request.buyer,
                seller = %request.seller,
                %markup_price,
                %seller_share,
                %admin_cut,
                "Custom request paid"
            );
            order
        };

        request.status = RequestStatus::Paid;
        self.notify(Notification::custom_order(
            &request.seller,
            &request.buyer,
            &request.title,
        ));
        Ok(order)
    }

    pub fn balance(&self, partition: Partition, username: &str) -> Decimal {
        self.store().balance(partition, username)
    }

    pub fn buyer_balance(&self, username: &str) -> Decimal {
        self.balance(Partition::Buyer, username)
    }

    pub fn seller_balance(&self, username: &str) -> Decimal {
        self.balance(Partition::Seller, username)
    }

    pub fn admin_balance(&self) -> Decimal {
        self.store().admin_balance()
    }

    /// Overwrite a buyer balance (top-ups and administrative corrections)
    pub fn set_buyer_balance(&self, username: &str, balance: Decimal) {
        self.set_balance(Partition::Buyer, username, balance);
    }

    pub fn set_seller_balance(&self, username: &str, balance: Decimal) {
        self.set_balance(Partition::Seller, username, balance);
    }

    pub fn set_admin_balance(&self, balance: Decimal) {
        let primary = self.config.primary_admin().to_string();
        self.set_balance(Partition::Admin, &primary, balance);
    }

    fn set_balance(&self, partition: Partition, username: &str, balance: Decimal) {
        let mut store = self.store();
        store.set_balance(partition, username, balance);
        self.persist(&store);
        tracing::info!(username, %partition, %balance, "Balance set");
    }

    /// Record an order without moving any money
    pub fn add_order(&self, order: Order) {
        let mut store = self.store();
        store.append_order(order);
        self.persist(&store);
    }

    /// All orders, oldest first
    pub fn order_history(&self) -> Vec<Order> {
        self.store().order_history().to_vec()
    }

    /// Whether a custom request with `id` has already been paid
    pub fn has_custom_fulfillment(&self, id: &str) -> bool {
        self.store()
            .order_history()
            .iter()
            .any(|order| matches!(order, Order::CustomFulfillment { .. }) && order.id() == id)
    }

    pub fn seller_withdrawals(&self, username: &str) -> Vec<Withdrawal> {
        self.store().seller_withdrawals(username).to_vec()
    }

    pub fn admin_withdrawals(&self) -> Vec<Withdrawal> {
        self.store().admin_withdrawals().to_vec()
    }

    /// Aggregate balance by username
    ///
    /// Buyers, then sellers, then every admin alias mapped to the admin
    /// balance. A later source overwrites an earlier one for the same name.
    pub fn wallet(&self) -> BTreeMap<String, Decimal> {
        let store = self.store();

        let mut wallet = store.buyer_balances().clone();
        wallet.extend(
            store
                .seller_balances()
                .iter()
                .map(|(username, balance)| (username.clone(), *balance)),
        );
        for alias in &self.config.admin_aliases {
            wallet.insert(alias.clone(), store.admin_balance());
        }

        wallet
    }

    /// One row per buyer, per seller, and one admin row under the primary alias
    ///
    /// Sorted by username, then partition.
    pub fn wallet_entries(&self) -> Vec<WalletEntry> {
        let store = self.store();

        let row = |partition: Partition| {
            move |(username, balance): (&String, &Decimal)| WalletEntry {
                username: username.clone(),
                partition,
                balance: *balance,
            }
        };

        let mut entries: Vec<WalletEntry> = store
            .buyer_balances()
            .iter()
            .map(row(Partition::Buyer))
            .chain(store.seller_balances().iter().map(row(Partition::Seller)))
            .collect();
        entries.push(WalletEntry {
            username: self.config.primary_admin().to_string(),
            partition: Partition::Admin,
            balance: store.admin_balance(),
        });

        entries.sort_by(|a, b| {
            a.username
                .cmp(&b.username)
                .then_with(|| a.partition.cmp(&b.partition))
        });
        entries
    }

    /// Copy of the full in-memory state
    pub fn snapshot(&self) -> BalanceStore {
        self.store().clone()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .field("notifier", &self.notifier.is_some())
            .field("persistence", &self.persistence.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

/// Credit `amount` and append `order`, returning the seller notification if an order was appended
fn apply_credit(
    store: &mut BalanceStore,
    partition: Partition,
    username: &str,
    amount: Decimal,
    order: Option<Order>,
) -> Result<Option<Notification>, LedgerError> {
    store.credit(partition, username, amount)?;

    Ok(order.map(|order| {
        let notification = Notification::custom_order(username, order.buyer(), order.title());
        store.append_order(order);
        notification
    }))
}

fn require_identity(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        Err(LedgerError::invalid_parameters(format!("{} is empty", field)))
    } else {
        Ok(())
    }
}

fn require_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(LedgerError::invalid_parameters(format!(
            "amount must be positive, got {}",
            amount
        )))
    }
}

fn share_of(amount: Decimal, rate: Decimal, account: &str) -> Result<Decimal, LedgerError> {
    amount
        .checked_mul(rate)
        .ok_or_else(|| LedgerError::arithmetic_overflow("split", account))
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notification::{notification_channel, NotificationKind};
    use crate::io::persistence::MemoryStore;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn listing(price: Decimal, marked_up: Option<Decimal>) -> Listing {
        Listing {
            id: "listing-1".to_string(),
            title: "Silk scarf".to_string(),
            description: "Worn once".to_string(),
            price,
            marked_up_price: marked_up,
            image_urls: vec!["scarf.png".to_string()],
            seller: "sally".to_string(),
        }
    }

    fn custom_request(price: Decimal) -> CustomRequest {
        CustomRequest {
            id: "req-1".to_string(),
            title: "Custom set".to_string(),
            description: "Made to order".to_string(),
            price,
            seller: "sally".to_string(),
            buyer: "bob".to_string(),
            tags: vec!["lace".to_string()],
            status: RequestStatus::Accepted,
        }
    }

    fn funded_ledger(buyer_balance: Decimal) -> Ledger {
        let ledger = Ledger::default();
        ledger.set_buyer_balance("bob", buyer_balance);
        ledger
    }

    #[test]
    fn test_purchase_splits_marked_up_charge() {
        let ledger = funded_ledger(dec!(50.00));

        let order = ledger
            .try_purchase_listing(&listing(dec!(20.00), Some(dec!(22.00))), "bob")
            .unwrap();

        assert_eq!(ledger.buyer_balance("bob"), dec!(28.00));
        assert_eq!(ledger.seller_balance("sally"), dec!(18.00));
        assert_eq!(ledger.admin_balance(), dec!(4.00));
        assert_eq!(order.buyer(), "bob");
        assert_eq!(order.marked_up_price(), dec!(22.00));
        assert_eq!(ledger.order_history(), vec![order]);
    }

    #[test]
    fn test_purchase_without_markup_charges_base_price() {
        let ledger = funded_ledger(dec!(20.00));

        assert!(ledger.purchase_listing(&listing(dec!(20.00), None), "bob"));

        assert_eq!(ledger.buyer_balance("bob"), Decimal::ZERO);
        assert_eq!(ledger.seller_balance("sally"), dec!(18.00));
        assert_eq!(ledger.admin_balance(), dec!(2.00));
    }

    #[rstest]
    #[case::below_base_price(dec!(19.00), dec!(1.00))]
    #[case::equal_to_seller_cut(dec!(18.00), Decimal::ZERO)]
    fn test_purchase_accepts_markup_covering_seller_cut(
        #[case] marked_up: Decimal,
        #[case] admin_cut: Decimal,
    ) {
        let ledger = funded_ledger(dec!(50.00));

        let order = ledger
            .try_purchase_listing(&listing(dec!(20.00), Some(marked_up)), "bob")
            .unwrap();

        assert_eq!(ledger.buyer_balance("bob"), dec!(50.00) - marked_up);
        assert_eq!(ledger.seller_balance("sally"), dec!(18.00));
        assert_eq!(ledger.admin_balance(), admin_cut);
        assert_eq!(order.price(), dec!(20.00));
    }

    #[test]
    fn test_purchase_rejects_markup_below_seller_cut() {
        let ledger = funded_ledger(dec!(50.00));
        let before = ledger.snapshot();

        let result = ledger.try_purchase_listing(&listing(dec!(20.00), Some(dec!(17.50))), "bob");

        assert!(matches!(result, Err(LedgerError::InvalidParameters { .. })));
        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_purchase_with_insufficient_balance_changes_nothing() {
        let ledger = funded_ledger(dec!(10.00));
        let before = ledger.snapshot();

        let result = ledger.try_purchase_listing(&listing(dec!(20.00), Some(dec!(22.00))), "bob");

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ledger.snapshot(), before);
        assert!(!ledger.locks().is_held(&LockKey::purchase("bob", "sally")));
    }

    #[test]
    fn test_purchase_rejects_malformed_listing() {
        let ledger = funded_ledger(dec!(50.00));
        let mut bad = listing(dec!(20.00), Some(dec!(22.00)));
        bad.title = String::new();

        let result = ledger.try_purchase_listing(&bad, "bob");

        assert!(matches!(result, Err(LedgerError::InvalidParameters { .. })));
        assert_eq!(ledger.buyer_balance("bob"), dec!(50.00));
        assert!(ledger.order_history().is_empty());
    }

    #[test]
    fn test_purchase_fails_while_lock_held() {
        let ledger = funded_ledger(dec!(50.00));
        let _held = ledger
            .locks()
            .try_lock(&LockKey::purchase("bob", "sally"))
            .unwrap();

        assert!(!ledger.purchase_listing(&listing(dec!(20.00), None), "bob"));
        assert_eq!(ledger.buyer_balance("bob"), dec!(50.00));
    }

    #[test]
    fn test_purchase_notifies_seller() {
        let (sink, mut receiver) = notification_channel();
        let ledger = funded_ledger(dec!(50.00)).with_notifier(Arc::new(sink));

        assert!(ledger.purchase_listing(&listing(dec!(20.00), Some(dec!(22.00))), "bob"));

        let notification = receiver.try_recv().unwrap();
        assert_eq!(notification.recipient, "sally");
        assert_eq!(notification.kind, NotificationKind::Sale);
        assert!(notification.message.contains("$22.00"));
    }

    #[test]
    fn test_failed_purchase_does_not_notify() {
        let (sink, mut receiver) = notification_channel();
        let ledger = funded_ledger(dec!(1.00)).with_notifier(Arc::new(sink));

        assert!(!ledger.purchase_listing(&listing(dec!(20.00), None), "bob"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_subscription_splits_75_25() {
        let ledger = funded_ledger(dec!(30.00));

        assert!(ledger.subscribe_to_seller_with_payment("bob", "sally", dec!(20.00)));

        assert_eq!(ledger.buyer_balance("bob"), dec!(10.00));
        assert_eq!(ledger.seller_balance("sally"), dec!(15.00));
        assert_eq!(ledger.admin_balance(), dec!(5.00));
        assert!(ledger.order_history().is_empty());
    }

    #[test]
    fn test_subscription_validation_failures() {
        let ledger = funded_ledger(dec!(5.00));

        assert!(matches!(
            ledger.try_subscribe_to_seller_with_payment("", "sally", dec!(1)),
            Err(LedgerError::InvalidParameters { .. })
        ));
        assert!(matches!(
            ledger.try_subscribe_to_seller_with_payment("bob", "sally", Decimal::ZERO),
            Err(LedgerError::InvalidParameters { .. })
        ));
        assert!(matches!(
            ledger.try_subscribe_to_seller_with_payment("bob", "sally", dec!(6)),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.buyer_balance("bob"), dec!(5.00));
        assert!(ledger.locks().held_keys().is_empty());
    }

    #[test]
    fn test_tip_moves_full_amount() {
        let ledger = funded_ledger(dec!(10.00));

        assert!(ledger.send_tip("bob", "sally", dec!(4.00)));

        assert_eq!(ledger.buyer_balance("bob"), dec!(6.00));
        assert_eq!(ledger.seller_balance("sally"), dec!(4.00));
        assert_eq!(ledger.admin_balance(), Decimal::ZERO);
    }

    #[test]
    fn test_tip_is_serialized_per_buyer() {
        let ledger = funded_ledger(dec!(10.00));
        let _held = ledger.locks().try_lock(&LockKey::tip("bob")).unwrap();

        let result = ledger.try_send_tip("bob", "sally", dec!(1.00));

        assert!(matches!(result, Err(LedgerError::LockContention { .. })));
    }

    #[test]
    fn test_update_wallet_routes_admin_alias() {
        let ledger = Ledger::default();

        ledger.update_wallet("oakley", dec!(2.20), None);
        ledger.update_wallet("gerome", dec!(1.00), None);

        assert_eq!(ledger.admin_balance(), dec!(3.20));
        assert!(ledger.snapshot().seller_balances().is_empty());
    }

    #[test]
    fn test_update_wallet_with_order_credits_and_records() {
        let ledger = Ledger::default();
        let order = Order::custom_fulfillment(&custom_request(dec!(20.00)), dec!(22.00), Utc::now());

        ledger.update_wallet("sally", dec!(18.00), Some(order.clone()));

        assert_eq!(ledger.seller_balance("sally"), dec!(18.00));
        assert_eq!(ledger.order_history(), vec![order]);
    }

    #[test]
    fn test_update_wallet_existing_buyer_debit() {
        let ledger = funded_ledger(dec!(30.00));

        ledger.update_wallet("bob", dec!(-22.00), None);

        assert_eq!(ledger.buyer_balance("bob"), dec!(8.00));
    }

    #[test]
    fn test_update_wallet_unclassified_defaults_by_sign() {
        let ledger = Ledger::default();

        ledger.update_wallet("newseller", dec!(5), None);
        ledger.update_wallet("newbuyer", dec!(-5), None);

        assert_eq!(ledger.seller_balance("newseller"), dec!(5));
        assert_eq!(ledger.buyer_balance("newbuyer"), dec!(-5));
    }

    #[test]
    fn test_update_wallet_drops_order_for_buyer_credit() {
        let ledger = funded_ledger(dec!(1.00));
        let order = Order::custom_fulfillment(&custom_request(dec!(20.00)), dec!(22.00), Utc::now());

        ledger.update_wallet("bob", dec!(1.00), Some(order));

        assert_eq!(ledger.buyer_balance("bob"), dec!(2.00));
        assert!(ledger.order_history().is_empty());
    }

    #[test]
    fn test_update_wallet_as_rejects_order_on_buyer() {
        let ledger = Ledger::default();
        let order = Order::custom_fulfillment(&custom_request(dec!(20.00)), dec!(22.00), Utc::now());

        let result = ledger.update_wallet_as(Partition::Buyer, "bob", dec!(1), Some(order.clone()));
        assert!(matches!(result, Err(LedgerError::InvalidParameters { .. })));

        let result = ledger.update_wallet_as(Partition::Seller, "other", dec!(1), Some(order));
        assert!(matches!(result, Err(LedgerError::InvalidParameters { .. })));

        assert_eq!(ledger.seller_balance("other"), Decimal::ZERO);
        assert!(ledger.order_history().is_empty());
    }

    #[test]
    fn test_update_wallet_as_notifies_on_order() {
        let (sink, mut receiver) = notification_channel();
        let ledger = Ledger::default().with_notifier(Arc::new(sink));
        let order = Order::custom_fulfillment(&custom_request(dec!(20.00)), dec!(22.00), Utc::now());

        ledger
            .update_wallet_as(Partition::Seller, "sally", dec!(18.00), Some(order))
            .unwrap();

        let notification = receiver.try_recv().unwrap();
        assert_eq!(notification.kind, NotificationKind::CustomOrder);
        assert_eq!(notification.recipient, "sally");
    }

    #[test]
    fn test_seller_withdrawal() {
        let ledger = Ledger::default();
        ledger.set_seller_balance("sally", dec!(50.00));

        let withdrawal = ledger.add_seller_withdrawal("sally", dec!(20.00)).unwrap();

        assert_eq!(withdrawal.amount, dec!(20.00));
        assert_eq!(ledger.seller_balance("sally"), dec!(30.00));
        assert_eq!(ledger.seller_withdrawals("sally"), vec![withdrawal]);
        assert!(!ledger.locks().is_held(&LockKey::withdrawal("sally")));
    }

    #[test]
    fn test_seller_withdrawal_errors() {
        let ledger = Ledger::default();
        ledger.set_seller_balance("sally", dec!(10.00));

        assert!(matches!(
            ledger.add_seller_withdrawal("sally", dec!(10.01)),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            ledger.add_seller_withdrawal("sally", dec!(-1)),
            Err(LedgerError::InvalidParameters { .. })
        ));

        let _held = ledger.locks().try_lock(&LockKey::withdrawal("sally")).unwrap();
        assert!(matches!(
            ledger.add_seller_withdrawal("sally", dec!(1)),
            Err(LedgerError::LockContention { .. })
        ));

        assert_eq!(ledger.seller_balance("sally"), dec!(10.00));
        assert!(ledger.seller_withdrawals("sally").is_empty());
    }

    #[test]
    fn test_admin_withdrawal() {
        let ledger = Ledger::default();
        ledger.set_admin_balance(dec!(12.00));

        ledger.add_admin_withdrawal(dec!(2.00)).unwrap();
        let overdraw = ledger.add_admin_withdrawal(dec!(11.00));

        assert!(matches!(overdraw, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ledger.admin_balance(), dec!(10.00));
        assert_eq!(ledger.admin_withdrawals().len(), 1);
    }

    #[test]
    fn test_pay_custom_request() {
        let ledger = funded_ledger(dec!(30.00));
        let mut request = custom_request(dec!(20.00));

        let order = ledger.pay_custom_request(&mut request).unwrap();

        assert_eq!(request.status, RequestStatus::Paid);
        assert_eq!(ledger.buyer_balance("bob"), dec!(8.00));
        assert_eq!(ledger.seller_balance("sally"), dec!(18.00));
        assert_eq!(ledger.admin_balance(), dec!(4.00));
        assert!(matches!(order, Order::CustomFulfillment { ref tags, .. } if tags == &["lace"]));
        assert_eq!(ledger.order_history().len(), 1);
    }

    #[test]
    fn test_pay_custom_request_rounds_to_cents() {
        let ledger = funded_ledger(dec!(100.00));
        let mut request = custom_request(dec!(9.99));

        let order = ledger.pay_custom_request(&mut request).unwrap();

        // 9.99 * 1.10 = 10.989 and 9.99 * 0.90 = 8.991
        assert_eq!(order.marked_up_price(), dec!(10.99));
        assert_eq!(ledger.seller_balance("sally"), dec!(8.99));
        assert_eq!(ledger.admin_balance(), dec!(2.00));
        assert_eq!(ledger.buyer_balance("bob"), dec!(89.01));
    }

    #[test]
    fn test_pay_custom_request_only_once() {
        let ledger = funded_ledger(dec!(100.00));
        let mut request = custom_request(dec!(20.00));

        ledger.pay_custom_request(&mut request).unwrap();
        let second = ledger.pay_custom_request(&mut request);

        assert!(matches!(
            second,
            Err(LedgerError::RequestNotPayable { status: RequestStatus::Paid, .. })
        ));
        assert_eq!(ledger.buyer_balance("bob"), dec!(78.00));
    }

    #[test]
    fn test_pay_custom_request_insufficient_keeps_status() {
        let ledger = funded_ledger(dec!(21.99));
        let mut request = custom_request(dec!(20.00));

        let result = ledger.pay_custom_request(&mut request);

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(request.status, RequestStatus::Accepted);
        assert!(ledger.order_history().is_empty());
    }

    #[test]
    fn test_wallet_aggregates_partitions() {
        let ledger = funded_ledger(dec!(50.00));
        ledger.set_seller_balance("sally", dec!(7.00));
        ledger.set_admin_balance(dec!(3.00));

        let wallet = ledger.wallet();

        assert_eq!(wallet.get("bob"), Some(&dec!(50.00)));
        assert_eq!(wallet.get("sally"), Some(&dec!(7.00)));
        assert_eq!(wallet.get("admin"), Some(&dec!(3.00)));
        assert_eq!(wallet.get("oakley"), Some(&dec!(3.00)));
        assert_eq!(wallet.get("gerome"), Some(&dec!(3.00)));
    }

    #[test]
    fn test_wallet_entries_sorted_with_single_admin_row() {
        let ledger = funded_ledger(dec!(50.00));
        ledger.set_seller_balance("sally", dec!(7.00));

        let entries = ledger.wallet_entries();
        let names: Vec<(&str, Partition)> = entries
            .iter()
            .map(|entry| (entry.username.as_str(), entry.partition))
            .collect();

        assert_eq!(
            names,
            vec![
                ("admin", Partition::Admin),
                ("bob", Partition::Buyer),
                ("sally", Partition::Seller),
            ]
        );
    }

    #[test]
    fn test_mutations_are_persisted() {
        let adapter = Arc::new(MemoryStore::new());
        let ledger = Ledger::open(LedgerConfig::default(), adapter.clone()).unwrap();

        ledger.set_buyer_balance("bob", dec!(50.00));
        ledger
            .try_purchase_listing(&listing(dec!(20.00), Some(dec!(22.00))), "bob")
            .unwrap();

        let reopened = Ledger::open(LedgerConfig::default(), adapter).unwrap();
        assert_eq!(reopened.snapshot(), ledger.snapshot());
        assert_eq!(reopened.buyer_balance("bob"), dec!(28.00));
    }
}
