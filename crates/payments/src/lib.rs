//! `orderflow-payments` — settlement records and the gateway seam.

pub mod gateway;
pub mod payment;
pub mod recorder;

pub use gateway::{
    ApprovingGateway, ChargeMetadata, ChargeOutcome, DecliningGateway, PaymentGateway,
    ScriptedGateway,
};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use recorder::{InMemoryPaymentStore, PaymentRecorder, PaymentStore};
