//! Business logic services for the stock ledger

pub mod activity;
pub mod availability;
pub mod classifier;
pub mod directory;
pub mod ledger;
pub mod reference;
pub mod reporting;
pub mod stock;

pub use activity::ActivityFeed;
pub use availability::AvailabilityValidator;
pub use classifier::{StockHealthSummary, ThresholdClassifier};
pub use directory::ReferenceDirectory;
pub use ledger::{LedgerService, SnapshotView};
pub use reference::{ReferenceRecord, ReferenceService};
pub use reporting::ReportAggregator;
pub use stock::StockAggregator;
