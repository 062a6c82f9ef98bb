use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use orderflow_core::{DomainError, DomainResult, ProductId, WarehouseId};

/// Authoritative per-product stock position.
///
/// `available` is decremented only through [`StockLedger::reserve`] and
/// incremented only through [`StockLedger::release`] (or an administrative
/// [`StockLedger::adjust`]). The unsigned type makes negative stock
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_id: ProductId,
    pub available: u32,
    pub warehouse_id: WarehouseId,
}

/// Concurrency-safe store of per-product available quantity.
///
/// `reserve` is the authoritative decision point: it performs the
/// check-and-decrement as one conditional update, never as a separate
/// read-then-write pair, so two reservations racing for the last units can
/// never both succeed.
pub trait StockLedger: Send + Sync {
    /// Register (or replace) the stock record for a product.
    fn register(&self, record: StockRecord);

    /// Atomically check `available >= quantity` and decrement on success.
    ///
    /// Returns `Ok(false)` when stock is insufficient — a normal business
    /// outcome, not an error. Unknown products fail with NotFound.
    fn reserve(&self, product_id: ProductId, quantity: u32) -> DomainResult<bool>;

    /// Unconditionally increment `available` by `quantity`.
    ///
    /// Idempotency is the caller's responsibility: a reservation must be
    /// released exactly once.
    fn release(&self, product_id: ProductId, quantity: u32) -> DomainResult<()>;

    /// Administrative restock/correction. Returns the new available quantity.
    fn adjust(&self, product_id: ProductId, delta: i64) -> DomainResult<u32>;

    /// Non-authoritative read-only check, used only to fast-fail before a
    /// reservation attempt. The authoritative decision is `reserve`'s result.
    fn check_availability(&self, product_id: ProductId, quantity: u32) -> DomainResult<bool>;

    /// Current available quantity.
    fn available(&self, product_id: ProductId) -> DomainResult<u32>;
}

impl<L> StockLedger for Arc<L>
where
    L: StockLedger + ?Sized,
{
    fn register(&self, record: StockRecord) {
        (**self).register(record)
    }

    fn reserve(&self, product_id: ProductId, quantity: u32) -> DomainResult<bool> {
        (**self).reserve(product_id, quantity)
    }

    fn release(&self, product_id: ProductId, quantity: u32) -> DomainResult<()> {
        (**self).release(product_id, quantity)
    }

    fn adjust(&self, product_id: ProductId, delta: i64) -> DomainResult<u32> {
        (**self).adjust(product_id, delta)
    }

    fn check_availability(&self, product_id: ProductId, quantity: u32) -> DomainResult<bool> {
        (**self).check_availability(product_id, quantity)
    }

    fn available(&self, product_id: ProductId) -> DomainResult<u32> {
        (**self).available(product_id)
    }
}

/// In-memory stock ledger.
///
/// Mutations take the write lock for the whole conditional update, which is
/// the per-product mutual exclusion the reservation engine relies on.
#[derive(Debug, Default)]
pub struct InMemoryStockLedger {
    records: RwLock<HashMap<ProductId, StockRecord>>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::internal("stock ledger lock poisoned")
    }
}

impl StockLedger for InMemoryStockLedger {
    fn register(&self, record: StockRecord) {
        if let Ok(mut records) = self.records.write() {
            records.insert(record.product_id, record);
        }
    }

    fn reserve(&self, product_id: ProductId, quantity: u32) -> DomainResult<bool> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let record = records
            .get_mut(&product_id)
            .ok_or_else(|| DomainError::not_found("product stock", product_id))?;

        // Check and decrement inside one write-locked section.
        if record.available >= quantity {
            record.available -= quantity;
            debug!(product_id = %product_id, quantity, remaining = record.available, "stock reserved");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn release(&self, product_id: ProductId, quantity: u32) -> DomainResult<()> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let record = records
            .get_mut(&product_id)
            .ok_or_else(|| DomainError::not_found("product stock", product_id))?;

        record.available = record
            .available
            .checked_add(quantity)
            .ok_or_else(|| DomainError::internal("stock quantity overflow on release"))?;
        debug!(product_id = %product_id, quantity, available = record.available, "stock released");
        Ok(())
    }

    fn adjust(&self, product_id: ProductId, delta: i64) -> DomainResult<u32> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        let record = records
            .get_mut(&product_id)
            .ok_or_else(|| DomainError::not_found("product stock", product_id))?;

        let next = i64::from(record.available) + delta;
        if next < 0 {
            return Err(DomainError::validation("stock cannot go negative"));
        }
        record.available = u32::try_from(next)
            .map_err(|_| DomainError::internal("stock quantity overflow on adjust"))?;
        Ok(record.available)
    }

    fn check_availability(&self, product_id: ProductId, quantity: u32) -> DomainResult<bool> {
        Ok(self.available(product_id)? >= quantity)
    }

    fn available(&self, product_id: ProductId) -> DomainResult<u32> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        records
            .get(&product_id)
            .map(|r| r.available)
            .ok_or_else(|| DomainError::not_found("product stock", product_id))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn ledger_with(available: u32) -> (InMemoryStockLedger, ProductId) {
        let ledger = InMemoryStockLedger::new();
        let product_id = ProductId::new();
        ledger.register(StockRecord {
            product_id,
            available,
            warehouse_id: WarehouseId::new(),
        });
        (ledger, product_id)
    }

    #[test]
    fn reserve_decrements_when_sufficient() {
        let (ledger, product_id) = ledger_with(5);

        assert!(ledger.reserve(product_id, 5).unwrap());
        assert_eq!(ledger.available(product_id).unwrap(), 0);
    }

    #[test]
    fn reserve_refuses_without_mutation_when_insufficient() {
        let (ledger, product_id) = ledger_with(3);

        assert!(!ledger.reserve(product_id, 4).unwrap());
        assert_eq!(ledger.available(product_id).unwrap(), 3);
    }

    #[test]
    fn reserve_unknown_product_is_not_found() {
        let ledger = InMemoryStockLedger::new();
        let missing = ProductId::new();
        assert_eq!(
            ledger.reserve(missing, 1).unwrap_err(),
            DomainError::not_found("product stock", missing)
        );
    }

    #[test]
    fn release_restores_prior_quantity_exactly() {
        let (ledger, product_id) = ledger_with(10);

        assert!(ledger.reserve(product_id, 7).unwrap());
        ledger.release(product_id, 7).unwrap();
        assert_eq!(ledger.available(product_id).unwrap(), 10);
    }

    #[test]
    fn adjust_refuses_negative_stock() {
        let (ledger, product_id) = ledger_with(2);

        let err = ledger.adjust(product_id, -3).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(ledger.available(product_id).unwrap(), 2);

        assert_eq!(ledger.adjust(product_id, 8).unwrap(), 10);
    }

    #[test]
    fn concurrent_reservations_never_oversell() {
        // 16 threads racing for 10 units, 3 each: at most 3 can win.
        let (ledger, product_id) = ledger_with(10);
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                thread::spawn(move || ledger.reserve(product_id, 3).unwrap())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|reserved| *reserved)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(ledger.available(product_id).unwrap(), 10 - 3 * 3);
    }
}
