//! Core contracts and value types for mqx point-to-point exchanges.
//!
//! This crate holds the data exchanged between the exchange runner and the messaging
//! providers: resolved connection properties, queue destinations, text messages, the
//! single `ProviderError` taxonomy, and the outcome-to-exit-status mapping.
pub mod config;
pub mod destination;
pub mod error;
pub mod message;
pub mod outcome;

pub use config::*;
pub use destination::*;
pub use error::*;
pub use message::*;
pub use outcome::*;
