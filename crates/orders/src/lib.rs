//! `orderflow-orders` — the order entity and its state machine.

pub mod order;
pub mod store;

pub use order::{Order, OrderItem, OrderStatus};
pub use store::{InMemoryOrderStore, OrderStore};
