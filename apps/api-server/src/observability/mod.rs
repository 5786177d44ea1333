//! Observability module - alert forwarding for ERROR events.

mod alert;

pub use alert::AlertLayer;
