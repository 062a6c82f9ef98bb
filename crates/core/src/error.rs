//! Domain error model.

use thiserror::Error;

use crate::id::{OrderId, ProductId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Every
/// variant carries the identity of the entity it refers to, so callers can
/// surface failures without re-deriving context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or empty input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// An operation was attempted from a status that forbids it.
    #[error("invalid state for {entity} {id}: {reason}")]
    InvalidState {
        entity: &'static str,
        id: String,
        reason: String,
    },

    /// A reservation could not be satisfied. Not an exceptional bug: this is
    /// the normal "not enough stock" business outcome.
    #[error(
        "insufficient stock for product {product_id}: available {available}, required {required}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
        required: u32,
    },

    /// The atomic stock update raced and lost after a prior availability
    /// check passed. Retriable; must never be silently ignored.
    #[error("reservation lost a concurrent stock update for product {product_id}")]
    ReservationFailure { product_id: ProductId },

    /// The payment gateway declined the charge.
    #[error("payment failed for order {order_id}: {reason}")]
    PaymentFailed { order_id: OrderId, reason: String },

    /// A conflict occurred (e.g. duplicate payment for an order).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected fault. Must not leave records partially updated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(
        entity: &'static str,
        id: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
