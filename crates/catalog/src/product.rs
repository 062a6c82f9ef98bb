use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use orderflow_core::{DomainError, DomainResult, Entity, ProductId, WarehouseId};

/// Catalog record for a sellable product.
///
/// Available quantity is deliberately *not* part of this record: the stock
/// ledger is the single authority for quantities, and the catalog only
/// carries descriptive data and the current list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// List price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub warehouse_id: WarehouseId,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: u64,
        warehouse_id: WarehouseId,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if price == 0 {
            return Err(DomainError::validation("product price must be positive"));
        }
        Ok(Self {
            id,
            name,
            description: None,
            price,
            warehouse_id,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Product lookup seam consumed by the fulfillment core.
///
/// The catalog subsystem proper (search, pricing rules, CRUD surfaces) lives
/// outside this engine; the controller only needs resolution by id.
pub trait ProductDirectory: Send + Sync {
    fn get(&self, id: &ProductId) -> Option<Product>;

    fn insert(&self, product: Product);

    /// Resolve a product or fail with NotFound.
    fn require(&self, id: &ProductId) -> DomainResult<Product> {
        self.get(id)
            .ok_or_else(|| DomainError::not_found("product", id))
    }
}

impl<D> ProductDirectory for Arc<D>
where
    D: ProductDirectory + ?Sized,
{
    fn get(&self, id: &ProductId) -> Option<Product> {
        (**self).get(id)
    }

    fn insert(&self, product: Product) {
        (**self).insert(product)
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductDirectory {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductDirectory for InMemoryProductDirectory {
    fn get(&self, id: &ProductId) -> Option<Product> {
        let map = self.inner.read().ok()?;
        map.get(id).cloned()
    }

    fn insert(&self, product: Product) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(product.id, product);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product_id() -> ProductId {
        ProductId::new()
    }

    #[test]
    fn new_product_rejects_empty_name() {
        let err = Product::new(test_product_id(), "   ", 100, WarehouseId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn new_product_rejects_zero_price() {
        let err = Product::new(test_product_id(), "Widget", 0, WarehouseId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn directory_roundtrip_and_require() {
        let dir = InMemoryProductDirectory::new();
        let id = test_product_id();
        let product = Product::new(id, "Widget", 250, WarehouseId::new()).unwrap();
        dir.insert(product.clone());

        assert_eq!(dir.get(&id), Some(product));
        assert!(dir.require(&id).is_ok());

        let missing = test_product_id();
        let err = dir.require(&missing).unwrap_err();
        assert_eq!(err, DomainError::not_found("product", missing));
    }
}
