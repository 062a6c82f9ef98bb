//! Order lifecycle orchestration.
//!
//! The controller drives the order state machine and is the only writer of
//! orders, reservations, and payments. Each operation holds the order's lock
//! for its full duration, and either completes fully or leaves no visible
//! partial effect.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use orderflow_catalog::{CustomerDirectory, ProductDirectory};
use orderflow_core::{CustomerId, DomainError, DomainResult, OrderId};
use orderflow_events::EventBus;
use orderflow_orders::{Order, OrderItem, OrderStatus, OrderStore};
use orderflow_payments::{
    ChargeMetadata, ChargeOutcome, PaymentGateway, PaymentMethod, PaymentRecorder, PaymentStatus,
};
use orderflow_reservations::{Reservation, ReservationManager, ReserveOutcome};
use orderflow_stock::StockLedger;

use crate::events::FulfillmentEvent;
use crate::locks::OrderLocks;

/// What to do with an order line whose submitted unit price differs from the
/// catalog price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceMismatchPolicy {
    /// Refuse the order with a validation error.
    Reject,
    /// Accept the order at the current catalog price.
    Reprice,
    /// Accept the order at the submitted price, logging a warning.
    #[default]
    Honor,
}

/// Settlement request forwarded to the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

/// Read-side view of an order, returned by every lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Derived on read: Σ quantity × unit price.
    pub total_amount: u64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderSnapshot {
    fn of(order: &Order) -> Self {
        Self {
            id: order.id_typed(),
            customer_id: order.customer_id(),
            status: order.status(),
            items: order.items().to_vec(),
            total_amount: order.total_amount(),
            notes: order.notes().map(str::to_owned),
            created_at: order.created_at(),
        }
    }
}

/// Drives the order state machine, orchestrating the stock ledger,
/// reservation manager, payment gateway, and payment recorder.
pub struct OrderLifecycleController<B>
where
    B: EventBus<FulfillmentEvent>,
{
    orders: Arc<dyn OrderStore>,
    customers: Arc<dyn CustomerDirectory>,
    products: Arc<dyn ProductDirectory>,
    ledger: Arc<dyn StockLedger>,
    reservations: ReservationManager,
    payments: PaymentRecorder,
    gateway: Arc<dyn PaymentGateway>,
    bus: Arc<B>,
    locks: OrderLocks,
    price_mismatch_policy: PriceMismatchPolicy,
}

impl<B> OrderLifecycleController<B>
where
    B: EventBus<FulfillmentEvent>,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        customers: Arc<dyn CustomerDirectory>,
        products: Arc<dyn ProductDirectory>,
        ledger: Arc<dyn StockLedger>,
        reservations: ReservationManager,
        payments: PaymentRecorder,
        gateway: Arc<dyn PaymentGateway>,
        bus: Arc<B>,
    ) -> Self {
        Self {
            orders,
            customers,
            products,
            ledger,
            reservations,
            payments,
            gateway,
            bus,
            locks: OrderLocks::new(),
            price_mismatch_policy: PriceMismatchPolicy::default(),
        }
    }

    pub fn with_price_mismatch_policy(mut self, policy: PriceMismatchPolicy) -> Self {
        self.price_mismatch_policy = policy;
        self
    }

    /// Intake: validate and store a new order in `New`. No stock is touched.
    pub fn create_order(
        &self,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        notes: Option<String>,
    ) -> DomainResult<OrderSnapshot> {
        self.customers.require(&customer_id)?;
        if items.is_empty() {
            return Err(DomainError::validation(
                "order must contain at least one item",
            ));
        }

        let mut items = items;
        for item in &mut items {
            let product = self.products.require(&item.product_id)?;
            if item.quantity == 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }
            if item.unit_price == 0 {
                return Err(DomainError::validation("item unit price must be positive"));
            }
            if item.unit_price != product.price {
                match self.price_mismatch_policy {
                    PriceMismatchPolicy::Reject => {
                        return Err(DomainError::validation(format!(
                            "submitted unit price {} differs from catalog price {} for product {}",
                            item.unit_price, product.price, product.id
                        )));
                    }
                    PriceMismatchPolicy::Reprice => {
                        warn!(
                            product_id = %product.id,
                            submitted = item.unit_price,
                            catalog = product.price,
                            "repricing order line to catalog price"
                        );
                        item.unit_price = product.price;
                    }
                    PriceMismatchPolicy::Honor => {
                        warn!(
                            product_id = %product.id,
                            submitted = item.unit_price,
                            catalog = product.price,
                            "order line accepted at non-catalog unit price"
                        );
                    }
                }
            }
        }

        let order = Order::new(OrderId::new(), customer_id, items, notes, Utc::now())?;
        self.orders.insert(order.clone())?;
        info!(order_id = %order.id_typed(), customer_id = %customer_id, "order created");

        self.publish(FulfillmentEvent::OrderCreated {
            order_id: order.id_typed(),
            customer_id,
            total_amount: order.total_amount(),
            occurred_at: order.created_at(),
        });
        Ok(OrderSnapshot::of(&order))
    }

    /// Reserve stock for every item of a `New` order, in submitted order.
    ///
    /// All-or-nothing: the first item that cannot be satisfied aborts the
    /// operation and rolls back the reservations already made in this call,
    /// returning their stock. The order then remains in `New`.
    pub fn reserve_order_items(&self, order_id: OrderId) -> DomainResult<OrderSnapshot> {
        let lock = self.locks.for_order(order_id);
        let _guard = lock
            .lock()
            .map_err(|_| DomainError::internal("order lock poisoned"))?;

        let mut order = self.orders.require(&order_id)?;
        if order.status() != OrderStatus::New {
            return Err(DomainError::invalid_state(
                "order",
                order_id,
                format!(
                    "cannot reserve items for an order in status {}",
                    order.status()
                ),
            ));
        }

        let now = Utc::now();
        for item in order.items() {
            if let Err(err) = self.reserve_item(order_id, item, now) {
                // Return the stock held by earlier items of this call; the
                // only active rows for a New order are the ones just made.
                self.reservations.cancel_reservations(order_id)?;
                return Err(err);
            }
        }

        order.mark_reserved()?;
        self.orders.save(&order)?;
        info!(order_id = %order_id, items = order.items().len(), "order reserved");

        self.publish(FulfillmentEvent::OrderReserved {
            order_id,
            occurred_at: now,
        });
        Ok(OrderSnapshot::of(&order))
    }

    /// Settle a `Reserved` order through the payment gateway.
    ///
    /// On success the payment is recorded, reservations complete, and the
    /// order moves to `Paid`. On decline the order stays `Reserved` and its
    /// reservations stay active: a failed attempt does not forfeit held
    /// stock, so the payment can be retried.
    pub fn process_order_payment(
        &self,
        order_id: OrderId,
        request: PaymentRequest,
    ) -> DomainResult<OrderSnapshot> {
        let lock = self.locks.for_order(order_id);
        let _guard = lock
            .lock()
            .map_err(|_| DomainError::internal("order lock poisoned"))?;

        let mut order = self.orders.require(&order_id)?;
        if order.status() != OrderStatus::Reserved {
            return Err(DomainError::invalid_state(
                "order",
                order_id,
                format!("cannot pay for an order in status {}", order.status()),
            ));
        }

        let amount = order.total_amount();
        let metadata = ChargeMetadata {
            order_id,
            customer_id: order.customer_id(),
        };
        debug!(order_id = %order_id, amount, "charging payment gateway");

        match self.gateway.charge(amount, request.method, &metadata) {
            ChargeOutcome::Approved { transaction_id } => {
                let payment = self.payments.record(
                    order_id,
                    amount,
                    request.method,
                    transaction_id.clone(),
                    request.notes,
                    Utc::now(),
                )?;
                self.reservations.complete_reservations(order_id)?;
                order.mark_paid()?;
                self.orders.save(&order)?;
                info!(order_id = %order_id, transaction_id = %transaction_id, "order paid");

                self.publish(FulfillmentEvent::OrderPaid {
                    order_id,
                    payment_id: payment.id_typed(),
                    transaction_id,
                    occurred_at: payment.paid_at(),
                });
                Ok(OrderSnapshot::of(&order))
            }
            ChargeOutcome::Declined { reason } => {
                warn!(order_id = %order_id, reason = %reason, "payment declined");
                self.publish(FulfillmentEvent::PaymentDeclined {
                    order_id,
                    reason: reason.clone(),
                    occurred_at: Utc::now(),
                });
                Err(DomainError::PaymentFailed { order_id, reason })
            }
        }
    }

    /// Cancel an order from any non-terminal status, releasing its active
    /// stock holds. Cancelling a paid order also flips its payment to
    /// refunded.
    pub fn cancel_order(&self, order_id: OrderId) -> DomainResult<OrderSnapshot> {
        let lock = self.locks.for_order(order_id);
        let _guard = lock
            .lock()
            .map_err(|_| DomainError::internal("order lock poisoned"))?;

        let mut order = self.orders.require(&order_id)?;
        if order.status() == OrderStatus::Cancelled {
            return Err(DomainError::invalid_state(
                "order",
                order_id,
                "order is already cancelled",
            ));
        }

        self.reservations.cancel_reservations(order_id)?;

        if self
            .payments
            .find_by_order(order_id)
            .is_some_and(|p| p.status() == PaymentStatus::Completed)
        {
            self.payments.mark_refunded(order_id)?;
        }

        order.mark_cancelled()?;
        self.orders.save(&order)?;
        info!(order_id = %order_id, "order cancelled");

        self.publish(FulfillmentEvent::OrderCancelled {
            order_id,
            occurred_at: Utc::now(),
        });
        Ok(OrderSnapshot::of(&order))
    }

    /// Administrative status transition (shipping/delivery bookkeeping).
    /// No side effects on stock, reservations, or payments.
    pub fn update_order_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> DomainResult<OrderSnapshot> {
        let lock = self.locks.for_order(order_id);
        let _guard = lock
            .lock()
            .map_err(|_| DomainError::internal("order lock poisoned"))?;

        let mut order = self.orders.require(&order_id)?;
        order.set_status(status);
        self.orders.save(&order)?;

        self.publish(FulfillmentEvent::OrderStatusUpdated {
            order_id,
            status,
            occurred_at: Utc::now(),
        });
        Ok(OrderSnapshot::of(&order))
    }

    /// Reclaim stock held by reservations past their expiry. Safe to run
    /// periodically (see the sweeper) or on demand; owning orders are not
    /// touched.
    pub fn expire_due_reservations(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let expired = self.reservations.expire_due(now)?;
        for reservation in &expired {
            self.publish(FulfillmentEvent::ReservationExpired {
                reservation_id: reservation.id_typed(),
                order_id: reservation.order_id(),
                product_id: reservation.product_id(),
                quantity: reservation.quantity(),
                occurred_at: now,
            });
        }
        Ok(expired)
    }

    pub fn get_order(&self, order_id: OrderId) -> DomainResult<OrderSnapshot> {
        Ok(OrderSnapshot::of(&self.orders.require(&order_id)?))
    }

    pub fn list_orders_by_customer(&self, customer_id: CustomerId) -> Vec<OrderSnapshot> {
        self.orders
            .list_by_customer(customer_id)
            .iter()
            .map(OrderSnapshot::of)
            .collect()
    }

    pub fn list_orders_by_status(&self, status: OrderStatus) -> Vec<OrderSnapshot> {
        self.orders
            .list_by_status(status)
            .iter()
            .map(OrderSnapshot::of)
            .collect()
    }

    /// Fast-fail on availability, then run the authoritative conditional
    /// update. A refusal after the check passed means a concurrent caller
    /// won the stock in between; that lost race is retried once before being
    /// surfaced as ReservationFailure.
    fn reserve_item(
        &self,
        order_id: OrderId,
        item: &OrderItem,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            if !self
                .ledger
                .check_availability(item.product_id, item.quantity)?
            {
                return Err(DomainError::InsufficientStock {
                    product_id: item.product_id,
                    available: self.ledger.available(item.product_id)?,
                    required: item.quantity,
                });
            }

            match self
                .reservations
                .reserve(order_id, item.product_id, item.quantity, now)?
            {
                ReserveOutcome::Reserved(reservation) => return Ok(reservation),
                ReserveOutcome::Insufficient { .. } if attempts < 2 => {
                    debug!(
                        order_id = %order_id,
                        product_id = %item.product_id,
                        "lost a concurrent stock race; retrying reservation"
                    );
                }
                ReserveOutcome::Insufficient { .. } => {
                    return Err(DomainError::ReservationFailure {
                        product_id: item.product_id,
                    });
                }
            }
        }
    }

    /// Events are notifications: the stores are the source of truth, so a
    /// publish failure is logged rather than unwinding committed state.
    fn publish(&self, event: FulfillmentEvent) {
        if let Err(err) = self.bus.publish(event) {
            warn!(error = ?err, "failed to publish lifecycle event");
        }
    }
}
