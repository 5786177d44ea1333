//! # Vaultcord Core
//!
//! The domain layer of the Vaultcord backend.
//! This crate holds the Discord domain types, the ports the access layer is
//! built against, and the clock shared by the cache and the rate limiter.
//! It performs no I/O.

pub mod clock;
pub mod domain;
pub mod error;
pub mod ports;

pub use clock::Clock;
pub use error::DiscordError;
