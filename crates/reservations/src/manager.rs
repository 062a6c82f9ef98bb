use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use orderflow_core::{DomainResult, OrderId, ProductId, ReservationId};
use orderflow_stock::StockLedger;

use crate::reservation::Reservation;
use crate::store::ReservationStore;

/// Default time a reservation holds stock before the sweep reclaims it.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was decremented and an active row recorded.
    Reserved(Reservation),
    /// The conditional stock update refused; nothing was mutated.
    Insufficient { available: u32 },
}

/// Creates and tracks per-order-item reservations, pairing every row with
/// its ledger decrement, and reclaims stock on cancellation or expiry.
#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<dyn ReservationStore>,
    ledger: Arc<dyn StockLedger>,
    ttl: Duration,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn ReservationStore>, ledger: Arc<dyn StockLedger>) -> Self {
        Self {
            store,
            ledger,
            ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }

    /// Override the reservation time-to-live (tests, short-lived holds).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reserve stock for one order item: the ledger decrement and the active
    /// row insert are applied as one unit. If the insert is refused the
    /// decrement is compensated before returning, so a decrement never exists
    /// without a matching active row, or vice versa.
    pub fn reserve(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<ReserveOutcome> {
        if !self.ledger.reserve(product_id, quantity)? {
            return Ok(ReserveOutcome::Insufficient {
                available: self.ledger.available(product_id)?,
            });
        }

        let reservation = Reservation::new(
            ReservationId::new(),
            order_id,
            product_id,
            quantity,
            now,
            self.ttl,
        )?;

        if let Err(err) = self.store.insert(reservation.clone()) {
            self.ledger.release(product_id, quantity)?;
            return Err(err);
        }

        debug!(
            order_id = %order_id,
            product_id = %product_id,
            quantity,
            expires_at = %reservation.expires_at(),
            "reservation created"
        );
        Ok(ReserveOutcome::Reserved(reservation))
    }

    /// Transition all active reservations of an order to `Completed`.
    /// Called exactly once, on successful payment; held stock stays consumed.
    pub fn complete_reservations(&self, order_id: OrderId) -> DomainResult<usize> {
        let mut completed = 0;
        for mut reservation in self.store.active_by_order(order_id) {
            reservation.complete()?;
            self.store.update(&reservation)?;
            completed += 1;
        }
        Ok(completed)
    }

    /// For each active reservation of the order: release its stock, then mark
    /// it `Cancelled`. Rows that are already completed, cancelled, or expired
    /// are left untouched, so calling this again releases nothing twice.
    pub fn cancel_reservations(&self, order_id: OrderId) -> DomainResult<Vec<Reservation>> {
        let mut cancelled = Vec::new();
        for mut reservation in self.store.active_by_order(order_id) {
            self.ledger
                .release(reservation.product_id(), reservation.quantity())?;
            reservation.cancel()?;
            self.store.update(&reservation)?;
            cancelled.push(reservation);
        }
        if !cancelled.is_empty() {
            info!(order_id = %order_id, count = cancelled.len(), "reservations cancelled");
        }
        Ok(cancelled)
    }

    /// Transition every active reservation past its expiry to `Expired` and
    /// return its stock to the ledger. The only reclaim path that needs no
    /// action on the owning order.
    pub fn expire_due(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let mut expired = Vec::new();
        for mut reservation in self.store.due(now) {
            self.ledger
                .release(reservation.product_id(), reservation.quantity())?;
            reservation.expire()?;
            self.store.update(&reservation)?;
            expired.push(reservation);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "reservations expired and stock released");
        }
        Ok(expired)
    }

    pub fn reservations_for_order(&self, order_id: OrderId) -> Vec<Reservation> {
        self.store.list_by_order(order_id)
    }

    pub fn active_quantity_for_product(&self, product_id: ProductId) -> u32 {
        self.store.active_quantity_for_product(product_id)
    }
}
