//! Enumeration types for the Gather events service.
//!
//! Wire names use kebab-case to match the query-string values accepted by
//! the public API (`?sort=date-asc`, `?price=free`).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status of an event relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum EventStatus {
    /// The event has not started yet.
    Upcoming,
    /// The event has started and not yet ended ("happening now").
    Ongoing,
    /// The event's end time has passed.
    Ended,
}

/// Ordering applied to an event search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum SortOrder {
    /// Earliest start time first.
    DateAsc,
    /// Latest start time first.
    DateDesc,
    /// Highest popularity score first (explicitly requested).
    Popular,
    /// Highest popularity score first (the default ordering).
    #[default]
    Score,
}

impl SortOrder {
    /// Parse a query-string value. Unknown values fall back to [`SortOrder::Score`].
    pub fn from_param(value: &str) -> Self {
        match value {
            "date-asc" => Self::DateAsc,
            "date-desc" => Self::DateDesc,
            "popular" => Self::Popular,
            _ => Self::Score,
        }
    }
}

/// Cost filter applied to an event search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum PriceFilter {
    /// Only events with a cost of exactly zero.
    Free,
    /// Only events with a cost greater than zero.
    Paid,
}

impl PriceFilter {
    /// Parse a query-string value. Unknown values yield `None` (no filter).
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Desired membership state for an attendance update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum Membership {
    /// The user wants to attend the event.
    Join,
    /// The user no longer wants to attend the event.
    Leave,
}

impl From<bool> for Membership {
    fn from(attending: bool) -> Self {
        if attending { Self::Join } else { Self::Leave }
    }
}
