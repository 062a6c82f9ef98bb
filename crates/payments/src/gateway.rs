//! External payment gateway seam.
//!
//! The gateway is an opaque, possibly slow, possibly failing remote call.
//! Modelling it as a trait keeps settlement deterministic under test: the
//! engine never decides success by chance, the injected gateway does.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use orderflow_core::{CustomerId, OrderId};

use crate::payment::PaymentMethod;

/// Context forwarded to the gateway alongside the charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeMetadata {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
}

/// Result of a charge attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

/// Opaque external payment processor.
///
/// The call may block; no timeout is imposed here (caller policy).
pub trait PaymentGateway: Send + Sync {
    fn charge(
        &self,
        amount: u64,
        method: PaymentMethod,
        metadata: &ChargeMetadata,
    ) -> ChargeOutcome;
}

impl<G> PaymentGateway for Arc<G>
where
    G: PaymentGateway + ?Sized,
{
    fn charge(
        &self,
        amount: u64,
        method: PaymentMethod,
        metadata: &ChargeMetadata,
    ) -> ChargeOutcome {
        (**self).charge(amount, method, metadata)
    }
}

/// Gateway that approves every charge with sequential transaction ids.
#[derive(Debug, Default)]
pub struct ApprovingGateway {
    next: AtomicU64,
}

impl ApprovingGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentGateway for ApprovingGateway {
    fn charge(
        &self,
        _amount: u64,
        _method: PaymentMethod,
        _metadata: &ChargeMetadata,
    ) -> ChargeOutcome {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        ChargeOutcome::Approved {
            transaction_id: format!("txn-{n:06}"),
        }
    }
}

/// Gateway that declines every charge with a fixed reason.
#[derive(Debug)]
pub struct DecliningGateway {
    reason: String,
}

impl DecliningGateway {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PaymentGateway for DecliningGateway {
    fn charge(
        &self,
        _amount: u64,
        _method: PaymentMethod,
        _metadata: &ChargeMetadata,
    ) -> ChargeOutcome {
        ChargeOutcome::Declined {
            reason: self.reason.clone(),
        }
    }
}

/// Gateway that replays a queued script of outcomes, in order.
///
/// Once the script is exhausted every further charge is declined, which makes
/// an unexpected extra call visible in tests.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    outcomes: Mutex<VecDeque<ChargeOutcome>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = ChargeOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
        }
    }

    pub fn push(&self, outcome: ChargeOutcome) {
        if let Ok(mut q) = self.outcomes.lock() {
            q.push_back(outcome);
        }
    }
}

impl PaymentGateway for ScriptedGateway {
    fn charge(
        &self,
        _amount: u64,
        _method: PaymentMethod,
        _metadata: &ChargeMetadata,
    ) -> ChargeOutcome {
        self.outcomes
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(ChargeOutcome::Declined {
                reason: "gateway script exhausted".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ChargeMetadata {
        ChargeMetadata {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
        }
    }

    #[test]
    fn approving_gateway_issues_sequential_transaction_ids() {
        let gateway = ApprovingGateway::new();
        let first = gateway.charge(100, PaymentMethod::CreditCard, &metadata());
        let second = gateway.charge(100, PaymentMethod::CreditCard, &metadata());

        assert_eq!(
            first,
            ChargeOutcome::Approved {
                transaction_id: "txn-000001".to_string()
            }
        );
        assert_eq!(
            second,
            ChargeOutcome::Approved {
                transaction_id: "txn-000002".to_string()
            }
        );
    }

    #[test]
    fn scripted_gateway_replays_then_declines() {
        let gateway = ScriptedGateway::with_outcomes([
            ChargeOutcome::Declined {
                reason: "card expired".to_string(),
            },
            ChargeOutcome::Approved {
                transaction_id: "txn-x".to_string(),
            },
        ]);

        assert!(matches!(
            gateway.charge(50, PaymentMethod::Paypal, &metadata()),
            ChargeOutcome::Declined { .. }
        ));
        assert!(matches!(
            gateway.charge(50, PaymentMethod::Paypal, &metadata()),
            ChargeOutcome::Approved { .. }
        ));
        assert!(matches!(
            gateway.charge(50, PaymentMethod::Paypal, &metadata()),
            ChargeOutcome::Declined { .. }
        ));
    }
}
