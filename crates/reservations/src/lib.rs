//! `orderflow-reservations` — reservation rows and their manager.
//!
//! Pairs every stock decrement with an active reservation row, and owns the
//! three ways a row leaves `Active`: completion (payment), cancellation, and
//! expiry.

pub mod manager;
pub mod reservation;
pub mod store;

pub use manager::{DEFAULT_TTL_HOURS, ReservationManager, ReserveOutcome};
pub use reservation::{Reservation, ReservationStatus};
pub use store::{InMemoryReservationStore, ReservationStore};
