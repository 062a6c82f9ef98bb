use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{DomainError, DomainResult, Entity, OrderId, ProductId, ReservationId};

/// Reservation status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
}

/// A record committing a quantity of one product's stock to one order for a
/// bounded time window.
///
/// A reservation exists only together with the ledger decrement that backs
/// it, and its stock is returned exactly once: on cancellation or on expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: u32,
    status: ReservationStatus,
    reserved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        id: ReservationId,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        reserved_at: DateTime<Utc>,
        ttl: Duration,
    ) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation(
                "reserved quantity must be positive",
            ));
        }
        Ok(Self {
            id,
            order_id,
            product_id,
            quantity,
            status: ReservationStatus::Active,
            reserved_at,
            expires_at: reserved_at + ttl,
        })
    }

    pub fn id_typed(&self) -> ReservationId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn reserved_at(&self) -> DateTime<Utc> {
        self.reserved_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// An active reservation past its expiry time, eligible for the sweep.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.expires_at < now
    }

    /// `Active → Completed`, on successful payment.
    pub fn complete(&mut self) -> DomainResult<()> {
        self.transition_from_active(ReservationStatus::Completed)
    }

    /// `Active → Cancelled`, on order cancellation or rollback.
    pub fn cancel(&mut self) -> DomainResult<()> {
        self.transition_from_active(ReservationStatus::Cancelled)
    }

    /// `Active → Expired`, by the expiry sweep.
    pub fn expire(&mut self) -> DomainResult<()> {
        self.transition_from_active(ReservationStatus::Expired)
    }

    fn transition_from_active(&mut self, next: ReservationStatus) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::invalid_state(
                "reservation",
                self.id,
                format!("only active reservations can transition (status: {:?})", self.status),
            ));
        }
        self.status = next;
        Ok(())
    }
}

impl Entity for Reservation {
    type Id = ReservationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_reservation(quantity: u32) -> DomainResult<Reservation> {
        Reservation::new(
            ReservationId::new(),
            OrderId::new(),
            ProductId::new(),
            quantity,
            Utc::now(),
            Duration::hours(24),
        )
    }

    #[test]
    fn new_reservation_is_active_with_ttl_expiry() {
        let now = Utc::now();
        let r = Reservation::new(
            ReservationId::new(),
            OrderId::new(),
            ProductId::new(),
            3,
            now,
            Duration::hours(24),
        )
        .unwrap();

        assert_eq!(r.status(), ReservationStatus::Active);
        assert_eq!(r.expires_at(), now + Duration::hours(24));
        assert!(!r.is_due(now + Duration::hours(23)));
        assert!(r.is_due(now + Duration::hours(25)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(matches!(
            test_reservation(0).unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn only_active_reservations_transition() {
        let mut r = test_reservation(1).unwrap();
        r.complete().unwrap();
        assert_eq!(r.status(), ReservationStatus::Completed);

        assert!(matches!(
            r.cancel().unwrap_err(),
            DomainError::InvalidState { .. }
        ));
        assert_eq!(r.status(), ReservationStatus::Completed);
    }

    #[test]
    fn completed_reservation_is_not_due() {
        let mut r = test_reservation(1).unwrap();
        r.complete().unwrap();
        assert!(!r.is_due(Utc::now() + Duration::days(2)));
    }
}
