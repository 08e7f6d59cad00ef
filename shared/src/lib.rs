//! Shared types and models for the warehouse stock ledger
//!
//! Pure domain types, stock classification and report arithmetic shared by
//! the backend stores, services and HTTP layer.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
