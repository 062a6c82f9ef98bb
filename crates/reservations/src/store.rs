use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use orderflow_core::{DomainError, DomainResult, OrderId, ProductId, ReservationId};

use crate::reservation::Reservation;

/// Storage seam for reservation rows.
pub trait ReservationStore: Send + Sync {
    /// Insert a new reservation. At most one **active** row may exist per
    /// (order, product) pair; a second insert for the pair conflicts.
    fn insert(&self, reservation: Reservation) -> DomainResult<()>;

    /// Replace the stored reservation (same id) with its updated state.
    fn update(&self, reservation: &Reservation) -> DomainResult<()>;

    fn list_by_order(&self, order_id: OrderId) -> Vec<Reservation>;

    /// Active rows for an order (the ones holding stock).
    fn active_by_order(&self, order_id: OrderId) -> Vec<Reservation>;

    /// Active rows whose expiry time has passed.
    fn due(&self, now: DateTime<Utc>) -> Vec<Reservation>;

    /// Total quantity currently held by active reservations of a product.
    fn active_quantity_for_product(&self, product_id: ProductId) -> u32;
}

impl<S> ReservationStore for Arc<S>
where
    S: ReservationStore + ?Sized,
{
    fn insert(&self, reservation: Reservation) -> DomainResult<()> {
        (**self).insert(reservation)
    }

    fn update(&self, reservation: &Reservation) -> DomainResult<()> {
        (**self).update(reservation)
    }

    fn list_by_order(&self, order_id: OrderId) -> Vec<Reservation> {
        (**self).list_by_order(order_id)
    }

    fn active_by_order(&self, order_id: OrderId) -> Vec<Reservation> {
        (**self).active_by_order(order_id)
    }

    fn due(&self, now: DateTime<Utc>) -> Vec<Reservation> {
        (**self).due(now)
    }

    fn active_quantity_for_product(&self, product_id: ProductId) -> u32 {
        (**self).active_quantity_for_product(product_id)
    }
}

/// In-memory reservation store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    inner: RwLock<HashMap<ReservationId, Reservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::internal("reservation store lock poisoned")
    }

    fn collect<F>(&self, predicate: F) -> Vec<Reservation>
    where
        F: Fn(&Reservation) -> bool,
    {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut rows: Vec<_> = map.values().filter(|r| predicate(r)).cloned().collect();
        rows.sort_by_key(|r| r.reserved_at());
        rows
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn insert(&self, reservation: Reservation) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;

        let duplicate = map.values().any(|r| {
            r.is_active()
                && r.order_id() == reservation.order_id()
                && r.product_id() == reservation.product_id()
        });
        if duplicate {
            return Err(DomainError::conflict(format!(
                "active reservation already exists for order {} / product {}",
                reservation.order_id(),
                reservation.product_id()
            )));
        }

        map.insert(reservation.id_typed(), reservation);
        Ok(())
    }

    fn update(&self, reservation: &Reservation) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        match map.get_mut(&reservation.id_typed()) {
            Some(stored) => {
                *stored = reservation.clone();
                Ok(())
            }
            None => Err(DomainError::not_found(
                "reservation",
                reservation.id_typed(),
            )),
        }
    }

    fn list_by_order(&self, order_id: OrderId) -> Vec<Reservation> {
        self.collect(|r| r.order_id() == order_id)
    }

    fn active_by_order(&self, order_id: OrderId) -> Vec<Reservation> {
        self.collect(|r| r.is_active() && r.order_id() == order_id)
    }

    fn due(&self, now: DateTime<Utc>) -> Vec<Reservation> {
        self.collect(|r| r.is_due(now))
    }

    fn active_quantity_for_product(&self, product_id: ProductId) -> u32 {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return 0,
        };
        map.values()
            .filter(|r| r.is_active() && r.product_id() == product_id)
            .map(Reservation::quantity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn active_reservation(order_id: OrderId, product_id: ProductId, quantity: u32) -> Reservation {
        Reservation::new(
            ReservationId::new(),
            order_id,
            product_id,
            quantity,
            Utc::now(),
            Duration::hours(24),
        )
        .unwrap()
    }

    #[test]
    fn insert_rejects_second_active_row_for_same_pair() {
        let store = InMemoryReservationStore::new();
        let order_id = OrderId::new();
        let product_id = ProductId::new();

        store
            .insert(active_reservation(order_id, product_id, 1))
            .unwrap();
        let err = store
            .insert(active_reservation(order_id, product_id, 2))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn cancelled_row_does_not_block_a_new_attempt() {
        let store = InMemoryReservationStore::new();
        let order_id = OrderId::new();
        let product_id = ProductId::new();

        let mut first = active_reservation(order_id, product_id, 1);
        store.insert(first.clone()).unwrap();
        first.cancel().unwrap();
        store.update(&first).unwrap();

        store
            .insert(active_reservation(order_id, product_id, 1))
            .unwrap();
        assert_eq!(store.active_by_order(order_id).len(), 1);
        assert_eq!(store.list_by_order(order_id).len(), 2);
    }

    #[test]
    fn due_only_returns_expired_active_rows() {
        let store = InMemoryReservationStore::new();
        let order_id = OrderId::new();

        let fresh = active_reservation(order_id, ProductId::new(), 1);
        store.insert(fresh).unwrap();

        let mut overdue = Reservation::new(
            ReservationId::new(),
            order_id,
            ProductId::new(),
            2,
            Utc::now() - Duration::hours(48),
            Duration::hours(24),
        )
        .unwrap();
        store.insert(overdue.clone()).unwrap();

        let due = store.due(Utc::now());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id_typed(), overdue.id_typed());

        // A completed row stops being due even when overdue.
        overdue.complete().unwrap();
        store.update(&overdue).unwrap();
        assert!(store.due(Utc::now()).is_empty());
    }

    #[test]
    fn active_quantity_sums_only_active_rows() {
        let store = InMemoryReservationStore::new();
        let product_id = ProductId::new();

        store
            .insert(active_reservation(OrderId::new(), product_id, 3))
            .unwrap();
        let mut other = active_reservation(OrderId::new(), product_id, 5);
        store.insert(other.clone()).unwrap();

        assert_eq!(store.active_quantity_for_product(product_id), 8);

        other.cancel().unwrap();
        store.update(&other).unwrap();
        assert_eq!(store.active_quantity_for_product(product_id), 3);
    }
}
