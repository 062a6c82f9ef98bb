use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{CustomerId, OrderId, PaymentId, ProductId, ReservationId};
use orderflow_events::Event;
use orderflow_orders::OrderStatus;

/// Lifecycle events published after the corresponding state change has been
/// persisted. Consumers (read models, notifications) must be idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FulfillmentEvent {
    OrderCreated {
        order_id: OrderId,
        customer_id: CustomerId,
        total_amount: u64,
        occurred_at: DateTime<Utc>,
    },
    OrderReserved {
        order_id: OrderId,
        occurred_at: DateTime<Utc>,
    },
    OrderPaid {
        order_id: OrderId,
        payment_id: PaymentId,
        transaction_id: String,
        occurred_at: DateTime<Utc>,
    },
    PaymentDeclined {
        order_id: OrderId,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
    OrderCancelled {
        order_id: OrderId,
        occurred_at: DateTime<Utc>,
    },
    OrderStatusUpdated {
        order_id: OrderId,
        status: OrderStatus,
        occurred_at: DateTime<Utc>,
    },
    ReservationExpired {
        reservation_id: ReservationId,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for FulfillmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FulfillmentEvent::OrderCreated { .. } => "order.created",
            FulfillmentEvent::OrderReserved { .. } => "order.reserved",
            FulfillmentEvent::OrderPaid { .. } => "order.paid",
            FulfillmentEvent::PaymentDeclined { .. } => "order.payment_declined",
            FulfillmentEvent::OrderCancelled { .. } => "order.cancelled",
            FulfillmentEvent::OrderStatusUpdated { .. } => "order.status_updated",
            FulfillmentEvent::ReservationExpired { .. } => "reservation.expired",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FulfillmentEvent::OrderCreated { occurred_at, .. }
            | FulfillmentEvent::OrderReserved { occurred_at, .. }
            | FulfillmentEvent::OrderPaid { occurred_at, .. }
            | FulfillmentEvent::PaymentDeclined { occurred_at, .. }
            | FulfillmentEvent::OrderCancelled { occurred_at, .. }
            | FulfillmentEvent::OrderStatusUpdated { occurred_at, .. }
            | FulfillmentEvent::ReservationExpired { occurred_at, .. } => *occurred_at,
        }
    }
}
