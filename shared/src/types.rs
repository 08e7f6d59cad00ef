//! Common types used across the ledger

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Inflow,
    Outflow,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Inflow => "inflow",
            EventKind::Outflow => "outflow",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is performing a ledger operation.
///
/// Supplied by the caller; the ledger records it but performs no role checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: uuid::Uuid,
    pub name: String,
}

/// Reference entities the ledger groups by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Material,
    Unit,
    Project,
    Category,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Material => "material",
            ReferenceKind::Unit => "unit",
            ReferenceKind::Project => "project",
            ReferenceKind::Category => "category",
        }
    }

    /// Display label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            ReferenceKind::Material => "Material",
            ReferenceKind::Unit => "Unit",
            ReferenceKind::Project => "Project",
            ReferenceKind::Category => "Category",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseKindError {
    pub kind: &'static str,
    pub value: String,
}

/// A derived amount that no longer fits the stored numeric range
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{field} is out of range")]
pub struct AmountOverflow {
    pub field: &'static str,
}

impl FromStr for EventKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inflow" => Ok(EventKind::Inflow),
            "outflow" => Ok(EventKind::Outflow),
            _ => Err(ParseKindError {
                kind: "event kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Time window preset for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
    All,
}

impl ReportPeriod {
    /// Length of the window in days, `None` for the unbounded preset
    pub fn days(&self) -> Option<i64> {
        match self {
            ReportPeriod::Week => Some(7),
            ReportPeriod::Month => Some(30),
            ReportPeriod::Quarter => Some(90),
            ReportPeriod::Year => Some(365),
            ReportPeriod::All => None,
        }
    }

    /// Earliest domain date that still qualifies for the window
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|days| now - Duration::days(days))
    }

    /// Whether a domain date falls inside the window ending at `now`
    pub fn contains(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            Some(cutoff) => date >= cutoff,
            None => true,
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(ReportPeriod::Week),
            "month" => Ok(ReportPeriod::Month),
            "quarter" => Ok(ReportPeriod::Quarter),
            "year" => Ok(ReportPeriod::Year),
            "all" => Ok(ReportPeriod::All),
            _ => Err(ParseKindError {
                kind: "report period",
                value: s.to_string(),
            }),
        }
    }
}

/// Grouping dimension for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportDimension {
    Category,
    Project,
    Material,
    Weekday,
}

impl FromStr for ReportDimension {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(ReportDimension::Category),
            "project" => Ok(ReportDimension::Project),
            "material" => Ok(ReportDimension::Material),
            "weekday" => Ok(ReportDimension::Weekday),
            _ => Err(ParseKindError {
                kind: "report dimension",
                value: s.to_string(),
            }),
        }
    }
}

/// Date range for event queries (both ends inclusive, either end optional)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
