//! Domain models for the stock ledger

mod activity;
mod movement;
mod reference;
mod report;
mod stock;

pub use activity::*;
pub use movement::*;
pub use reference::*;
pub use report::*;
pub use stock::*;
