use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::aoi::AlertType;

/// Severity carries presentation weight only (color coding in the
/// dashboard); it has no retry or escalation semantics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Hex color used by notification payloads.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Low => "#2e7d32",
            Severity::Medium => "#f9a825",
            Severity::High => "#c62828",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    New,
    Reviewed,
    Dismissed,
}

/// A persisted record of one detected change event. Created at most once
/// per successful detection job and never mutated by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub aoi_id: Uuid,
    pub user_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub confidence: f64,
    pub description: String,
    pub detected_change: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_severity_round_trip() {
        assert_eq!(Severity::from_str("high").unwrap(), Severity::High);
        assert_eq!(Severity::Medium.to_string(), "medium");
    }

    #[test]
    fn test_severity_colors_distinct() {
        assert_ne!(Severity::Low.color(), Severity::High.color());
        assert_ne!(Severity::Medium.color(), Severity::High.color());
    }
}
