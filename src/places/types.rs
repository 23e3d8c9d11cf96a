//! Core types for the place-resolution subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Place category. Fixed at creation; matching never crosses categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nature,
    History,
    Food,
}

impl Category {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nature" => Some(Self::Nature),
            "history" => Some(Self::History),
            "food" => Some(Self::Food),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nature => "nature",
            Self::History => "history",
            Self::Food => "food",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cost level of visiting a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostLevel {
    Free,
    Low,
    Medium,
    High,
}

impl CostLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for CostLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved place as returned by the places endpoint.
///
/// `id` is `None` for places synthesized at request time from a content
/// candidate that had no stored row.
#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub id: Option<i64>,
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub average_visit_time: u32,
    pub cost_level: CostLevel,
}

/// Default visit duration in minutes.
pub const DEFAULT_VISIT_MINUTES: u32 = 60;

/// Optional filters for place resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveFilters {
    pub category: Option<Category>,
    pub cost_level: Option<CostLevel>,
}

/// A candidate name extracted from content, tagged with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub category: Category,
}

/// Place-resolution failures that reach the caller. Geocoding failures
/// never appear here; they degrade to centroid fallback or omission.
#[derive(Debug)]
pub enum PlaceError {
    NotFound(String),
    Storage(crate::storage::StorageError),
}

impl fmt::Display for PlaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "{}", msg),
            Self::Storage(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for PlaceError {}
