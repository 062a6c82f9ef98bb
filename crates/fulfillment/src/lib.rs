//! `orderflow-fulfillment` — the order lifecycle controller.
//!
//! Orchestrates intake, stock reservation, settlement, cancellation, and
//! expiry on top of the stock ledger, reservation manager, and payment
//! recorder.

pub mod controller;
pub mod events;
pub mod locks;
pub mod sweeper;


pub use controller::{
    OrderLifecycleController, OrderSnapshot, PaymentRequest, PriceMismatchPolicy,
};
pub use events::FulfillmentEvent;
pub use locks::OrderLocks;
pub use sweeper::{ExpirySweeper, ExpirySweeperHandle, SweeperConfig, SweeperStats};
