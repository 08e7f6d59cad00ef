//! HTTP request handlers

pub mod health;
pub mod ledger;
pub mod reference;
pub mod reporting;

pub use health::*;
pub use ledger::*;
pub use reference::*;
pub use reporting::*;
