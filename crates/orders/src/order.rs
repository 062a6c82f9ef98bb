use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{CustomerId, DomainError, DomainResult, Entity, OrderId, ProductId};

/// Order status lifecycle.
///
/// The enforced path is `New → Reserved → Paid`; `Shipped`/`Delivered` are
/// administrative bookkeeping past that point, and `Cancelled` is reachable
/// from every non-terminal status. `Processing` exists for intake pipelines
/// that stage orders before reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Processing,
    Reserved,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderStatus::New => "new",
            OrderStatus::Processing => "processing",
            OrderStatus::Reserved => "reserved",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Order line: product, quantity, unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents), captured at order time.
    pub unit_price: u64,
}

impl OrderItem {
    pub fn subtotal(&self) -> u64 {
        u64::from(self.quantity) * self.unit_price
    }
}

/// An order and its lifecycle state.
///
/// Mutated only by the lifecycle controller. Items are frozen once the order
/// leaves `New`; the total is derived from items on read and never stored, so
/// it can never go stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    status: OrderStatus,
    items: Vec<OrderItem>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Create an order in `New` with validated items. No stock is touched.
    pub fn new(
        id: OrderId,
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation(
                "order must contain at least one item",
            ));
        }
        for item in &items {
            validate_item(item)?;
        }

        Ok(Self {
            id,
            customer_id,
            status: OrderStatus::New,
            items,
            notes,
            created_at,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Derived total: Σ quantity × unit price across items.
    pub fn total_amount(&self) -> u64 {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, OrderStatus::New)
    }

    /// Append an item while the order is still `New`.
    pub fn add_item(&mut self, item: OrderItem) -> DomainResult<()> {
        if !self.is_modifiable() {
            return Err(self.invalid_state("items can only change while the order is new"));
        }
        validate_item(&item)?;
        self.items.push(item);
        Ok(())
    }

    /// `New → Reserved`, after every item's stock has been reserved.
    pub fn mark_reserved(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::New {
            return Err(self.invalid_state(format!(
                "cannot reserve items for an order in status {}",
                self.status
            )));
        }
        self.status = OrderStatus::Reserved;
        Ok(())
    }

    /// `Reserved → Paid`, after a successful settlement.
    pub fn mark_paid(&mut self) -> DomainResult<()> {
        if self.status != OrderStatus::Reserved {
            return Err(self.invalid_state(format!(
                "cannot pay for an order in status {}",
                self.status
            )));
        }
        self.status = OrderStatus::Paid;
        Ok(())
    }

    /// Move to `Cancelled` from any non-terminal status.
    pub fn mark_cancelled(&mut self) -> DomainResult<()> {
        if self.status == OrderStatus::Cancelled {
            return Err(self.invalid_state("order is already cancelled"));
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Unconstrained administrative transition (shipping/delivery
    /// bookkeeping). Performs no side effects on stock or reservations.
    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }

    fn invalid_state(&self, reason: impl Into<String>) -> DomainError {
        DomainError::invalid_state("order", self.id, reason)
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_item(item: &OrderItem) -> DomainResult<()> {
    if item.quantity == 0 {
        return Err(DomainError::validation("item quantity must be positive"));
    }
    if item.unit_price == 0 {
        return Err(DomainError::validation("item unit price must be positive"));
    }
    Ok(())
}
