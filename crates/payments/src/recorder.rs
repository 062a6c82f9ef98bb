use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use orderflow_core::{DomainError, DomainResult, OrderId, PaymentId};

use crate::payment::{Payment, PaymentMethod, PaymentStatus};

/// Storage seam for payment rows.
pub trait PaymentStore: Send + Sync {
    fn insert(&self, payment: Payment) -> DomainResult<()>;

    fn update(&self, payment: &Payment) -> DomainResult<()>;

    fn find_by_order(&self, order_id: OrderId) -> Option<Payment>;

    fn find_by_transaction_id(&self, transaction_id: &str) -> Option<Payment>;
}

impl<S> PaymentStore for Arc<S>
where
    S: PaymentStore + ?Sized,
{
    fn insert(&self, payment: Payment) -> DomainResult<()> {
        (**self).insert(payment)
    }

    fn update(&self, payment: &Payment) -> DomainResult<()> {
        (**self).update(payment)
    }

    fn find_by_order(&self, order_id: OrderId) -> Option<Payment> {
        (**self).find_by_order(order_id)
    }

    fn find_by_transaction_id(&self, transaction_id: &str) -> Option<Payment> {
        (**self).find_by_transaction_id(transaction_id)
    }
}

/// In-memory payment store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    inner: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::internal("payment store lock poisoned")
    }
}

impl PaymentStore for InMemoryPaymentStore {
    fn insert(&self, payment: Payment) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.insert(payment.id_typed(), payment);
        Ok(())
    }

    fn update(&self, payment: &Payment) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        match map.get_mut(&payment.id_typed()) {
            Some(stored) => {
                *stored = payment.clone();
                Ok(())
            }
            None => Err(DomainError::not_found("payment", payment.id_typed())),
        }
    }

    fn find_by_order(&self, order_id: OrderId) -> Option<Payment> {
        let map = self.inner.read().ok()?;
        map.values().find(|p| p.order_id() == order_id).cloned()
    }

    fn find_by_transaction_id(&self, transaction_id: &str) -> Option<Payment> {
        let map = self.inner.read().ok()?;
        map.values()
            .find(|p| p.transaction_id() == transaction_id)
            .cloned()
    }
}

/// Persists settlement outcomes and links them to orders.
///
/// Simple, but its outcome gates lifecycle transitions: an order only moves
/// to `Paid` once a completed payment is on record, and the
/// one-payment-per-order invariant is enforced here.
#[derive(Clone)]
pub struct PaymentRecorder {
    store: Arc<dyn PaymentStore>,
}

impl PaymentRecorder {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    /// Record one completed payment for an order.
    ///
    /// A second call for an order that already has a completed payment fails
    /// with Conflict.
    pub fn record(
        &self,
        order_id: OrderId,
        amount: u64,
        method: PaymentMethod,
        transaction_id: impl Into<String>,
        notes: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> DomainResult<Payment> {
        if let Some(existing) = self.store.find_by_order(order_id) {
            if existing.status() == PaymentStatus::Completed {
                return Err(DomainError::conflict(format!(
                    "order {order_id} already has a completed payment ({})",
                    existing.transaction_id()
                )));
            }
        }

        let payment = Payment::completed(
            PaymentId::new(),
            order_id,
            amount,
            method,
            transaction_id,
            notes,
            paid_at,
        );
        self.store.insert(payment.clone())?;
        info!(
            order_id = %order_id,
            payment_id = %payment.id_typed(),
            amount,
            "payment recorded"
        );
        Ok(payment)
    }

    /// Flip a completed payment to `Refunded` (paid-order cancellation).
    pub fn mark_refunded(&self, order_id: OrderId) -> DomainResult<Payment> {
        let mut payment = self
            .store
            .find_by_order(order_id)
            .ok_or_else(|| DomainError::not_found("payment", order_id))?;
        payment.mark_refunded()?;
        self.store.update(&payment)?;
        info!(order_id = %order_id, payment_id = %payment.id_typed(), "payment refunded");
        Ok(payment)
    }

    pub fn find_by_order(&self, order_id: OrderId) -> Option<Payment> {
        self.store.find_by_order(order_id)
    }

    pub fn find_by_transaction_id(&self, transaction_id: &str) -> Option<Payment> {
        self.store.find_by_transaction_id(transaction_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> PaymentRecorder {
        PaymentRecorder::new(Arc::new(InMemoryPaymentStore::new()))
    }

    #[test]
    fn record_then_lookup_by_order_and_transaction() {
        let recorder = recorder();
        let order_id = OrderId::new();

        let payment = recorder
            .record(
                order_id,
                250,
                PaymentMethod::CreditCard,
                "txn-1",
                None,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(payment.status(), PaymentStatus::Completed);

        assert_eq!(recorder.find_by_order(order_id), Some(payment.clone()));
        assert_eq!(recorder.find_by_transaction_id("txn-1"), Some(payment));
    }

    #[test]
    fn second_completed_payment_for_an_order_conflicts() {
        let recorder = recorder();
        let order_id = OrderId::new();

        recorder
            .record(order_id, 100, PaymentMethod::Cash, "txn-1", None, Utc::now())
            .unwrap();
        let err = recorder
            .record(order_id, 100, PaymentMethod::Cash, "txn-2", None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn refund_marks_the_completed_payment() {
        let recorder = recorder();
        let order_id = OrderId::new();

        recorder
            .record(order_id, 100, PaymentMethod::Paypal, "txn-9", None, Utc::now())
            .unwrap();
        let refunded = recorder.mark_refunded(order_id).unwrap();
        assert_eq!(refunded.status(), PaymentStatus::Refunded);

        // No completed payment left; refunds are terminal for this order.
        let err = recorder.mark_refunded(order_id).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[test]
    fn refund_without_payment_is_not_found() {
        let recorder = recorder();
        let err = recorder.mark_refunded(OrderId::new()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
