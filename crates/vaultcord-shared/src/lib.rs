//! # Vaultcord Shared
//!
//! Request/response types exchanged between the dashboard frontend and the API server.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
