use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{DomainError, DomainResult, Entity, OrderId, PaymentId};

/// How the customer settles an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    BankTransfer,
    Cash,
    Paypal,
    Other,
}

/// Payment settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

/// A settlement outcome linked one-to-one to an order.
///
/// Recorded only after the order has reached `Reserved`; the amount must
/// equal the order's total at the time of payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: OrderId,
    /// Amount in smallest currency unit (e.g., cents).
    amount: u64,
    method: PaymentMethod,
    status: PaymentStatus,
    transaction_id: String,
    notes: Option<String>,
    paid_at: DateTime<Utc>,
}

impl Payment {
    /// A successfully settled payment.
    pub fn completed(
        id: PaymentId,
        order_id: OrderId,
        amount: u64,
        method: PaymentMethod,
        transaction_id: impl Into<String>,
        notes: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            amount,
            method,
            status: PaymentStatus::Completed,
            transaction_id: transaction_id.into(),
            notes,
            paid_at,
        }
    }

    pub fn id_typed(&self) -> PaymentId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn paid_at(&self) -> DateTime<Utc> {
        self.paid_at
    }

    /// `Completed → Refunded`, when a paid order is cancelled.
    pub fn mark_refunded(&mut self) -> DomainResult<()> {
        if self.status != PaymentStatus::Completed {
            return Err(DomainError::invalid_state(
                "payment",
                self.id,
                format!("only completed payments can be refunded (status: {:?})", self.status),
            ));
        }
        self.status = PaymentStatus::Refunded;
        Ok(())
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
