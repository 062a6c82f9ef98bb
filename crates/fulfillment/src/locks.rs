use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use orderflow_core::OrderId;

/// Per-order mutual exclusion.
///
/// The state machine has no valid concurrent transitions, so lifecycle
/// operations on one order are linearized: each operation holds the order's
/// lock from status check to final save. Operations on different orders
/// proceed in parallel and contend only inside the stock ledger.
#[derive(Debug, Default)]
pub struct OrderLocks {
    inner: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the lock for one order. Lock it for the duration of a
    /// lifecycle operation.
    pub fn for_order(&self, order_id: OrderId) -> Arc<Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.entry(order_id).or_default().clone()
    }
}
