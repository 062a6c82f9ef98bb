use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use orderflow_core::{CustomerId, DomainError, DomainResult, OrderId};

use crate::order::{Order, OrderStatus};

/// Storage seam for orders.
///
/// The controller is the only writer; reads are served to the excluded HTTP
/// layer through the controller's accessors.
pub trait OrderStore: Send + Sync {
    fn insert(&self, order: Order) -> DomainResult<()>;

    /// Replace the stored order (same id) with its updated state.
    fn save(&self, order: &Order) -> DomainResult<()>;

    fn get(&self, id: &OrderId) -> Option<Order>;

    fn list_by_customer(&self, customer_id: CustomerId) -> Vec<Order>;

    fn list_by_status(&self, status: OrderStatus) -> Vec<Order>;

    /// Load an order or fail with NotFound.
    fn require(&self, id: &OrderId) -> DomainResult<Order> {
        self.get(id).ok_or_else(|| DomainError::not_found("order", id))
    }
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn insert(&self, order: Order) -> DomainResult<()> {
        (**self).insert(order)
    }

    fn save(&self, order: &Order) -> DomainResult<()> {
        (**self).save(order)
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        (**self).get(id)
    }

    fn list_by_customer(&self, customer_id: CustomerId) -> Vec<Order> {
        (**self).list_by_customer(customer_id)
    }

    fn list_by_status(&self, status: OrderStatus) -> Vec<Order> {
        (**self).list_by_status(status)
    }
}

/// In-memory order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    inner: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::internal("order store lock poisoned")
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: Order) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        if map.contains_key(&order.id_typed()) {
            return Err(DomainError::conflict(format!(
                "order already exists: {}",
                order.id_typed()
            )));
        }
        map.insert(order.id_typed(), order);
        Ok(())
    }

    fn save(&self, order: &Order) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        match map.get_mut(&order.id_typed()) {
            Some(stored) => {
                *stored = order.clone();
                Ok(())
            }
            None => Err(DomainError::not_found("order", order.id_typed())),
        }
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        let map = self.inner.read().ok()?;
        map.get(id).cloned()
    }

    fn list_by_customer(&self, customer_id: CustomerId) -> Vec<Order> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut orders: Vec<_> = map
            .values()
            .filter(|o| o.customer_id() == customer_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at());
        orders
    }

    fn list_by_status(&self, status: OrderStatus) -> Vec<Order> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut orders: Vec<_> = map
            .values()
            .filter(|o| o.status() == status)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at());
        orders
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use orderflow_core::ProductId;

    use super::*;
    use crate::order::OrderItem;

    fn test_order(customer_id: CustomerId) -> Order {
        Order::new(
            OrderId::new(),
            customer_id,
            vec![OrderItem {
                product_id: ProductId::new(),
                quantity: 1,
                unit_price: 100,
            }],
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let store = InMemoryOrderStore::new();
        let order = test_order(CustomerId::new());
        let id = order.id_typed();

        store.insert(order.clone()).unwrap();
        assert_eq!(store.get(&id), Some(order));
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let store = InMemoryOrderStore::new();
        let order = test_order(CustomerId::new());

        store.insert(order.clone()).unwrap();
        let err = store.insert(order).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn save_requires_existing_order() {
        let store = InMemoryOrderStore::new();
        let order = test_order(CustomerId::new());

        let err = store.save(&order).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn listings_filter_by_customer_and_status() {
        let store = InMemoryOrderStore::new();
        let customer = CustomerId::new();

        let mut reserved = test_order(customer);
        reserved.mark_reserved().unwrap();
        store.insert(reserved).unwrap();
        store.insert(test_order(customer)).unwrap();
        store.insert(test_order(CustomerId::new())).unwrap();

        assert_eq!(store.list_by_customer(customer).len(), 2);
        assert_eq!(store.list_by_status(OrderStatus::Reserved).len(), 1);
        assert_eq!(store.list_by_status(OrderStatus::New).len(), 2);
    }
}
