use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use orderflow_core::{CustomerId, DomainError, DomainResult, Entity};

/// Customer record as seen by the fulfillment core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
}

impl Customer {
    pub fn new(
        id: CustomerId,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            email: email.into(),
        })
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Customer lookup seam consumed by the fulfillment core.
pub trait CustomerDirectory: Send + Sync {
    fn get(&self, id: &CustomerId) -> Option<Customer>;

    fn insert(&self, customer: Customer);

    /// Resolve a customer or fail with NotFound.
    fn require(&self, id: &CustomerId) -> DomainResult<Customer> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found("customer", id))
    }
}

impl<D> CustomerDirectory for Arc<D>
where
    D: CustomerDirectory + ?Sized,
{
    fn get(&self, id: &CustomerId) -> Option<Customer> {
        (**self).get(id)
    }

    fn insert(&self, customer: Customer) {
        (**self).insert(customer)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCustomerDirectory {
    inner: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustomerDirectory for InMemoryCustomerDirectory {
    fn get(&self, id: &CustomerId) -> Option<Customer> {
        let map = self.inner.read().ok()?;
        map.get(id).cloned()
    }

    fn insert(&self, customer: Customer) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(customer.id, customer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_customer_rejects_empty_name() {
        let err = Customer::new(CustomerId::new(), "", "a@b.test").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn directory_require_reports_not_found() {
        let dir = InMemoryCustomerDirectory::new();
        let id = CustomerId::new();
        assert_eq!(
            dir.require(&id).unwrap_err(),
            DomainError::not_found("customer", id)
        );

        dir.insert(Customer::new(id, "Ada", "ada@example.test").unwrap());
        assert_eq!(dir.require(&id).unwrap().name, "Ada");
    }
}
