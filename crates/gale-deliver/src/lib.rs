//! Delivery to durable storage, plus the best-effort notification sink.

pub mod error;
pub mod gateway;
pub mod notify;

pub use error::{DeliverError, Result};
pub use gateway::DeliveryGateway;
pub use notify::{EventKind, Notifier};
