use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::aoi::{AlertType, Frequency, Geometry};
use crate::models::alert::Severity;

/// Custom analysis window passed through to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomDates {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
}

/// Input document written to `<workspace>/<job_id>/input.json` and handed
/// to the detection engine via `--input`.
///
/// Field naming follows the engine's wire contract, which mixes camelCase
/// and snake_case; do not "fix" it here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInput {
    pub geometry: Geometry,
    #[serde(rename = "alertType")]
    pub alert_type: AlertType,
    pub threshold: f64,
    pub aoi_id: Uuid,
    pub user_id: String,
    pub frequency: Frequency,
    #[serde(rename = "customDates", skip_serializing_if = "Option::is_none")]
    pub custom_dates: Option<CustomDates>,
}

/// Payload of a detected change inside the engine's output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertData {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub confidence: f64,
    pub description: String,
    #[serde(rename = "detectedChange")]
    pub detected_change: String,
}

/// Output document the engine writes to `--output` on success. Presence
/// of this file is the success signal; its absence is definitive failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOutput {
    pub alert_data: AlertData,
}
