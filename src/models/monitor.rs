use chrono::{DateTime, NaiveDate, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::aoi::{AlertType, Aoi, Frequency};
use crate::models::alert::{Alert, AlertStatus, Severity};
use crate::models::detection::CustomDates;
use crate::models::job::JobStatus;

/// Request body for POST /api/v1/aois/{aoi_id}/monitor.
///
/// Every field is optional; unset fields fall back to the AOI's own
/// configuration (see [`resolve_effective_config`]).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct MonitorRequest {
    #[garde(skip)]
    pub alert_type: Option<AlertType>,

    #[garde(range(min = 0.1, max = 1.0))]
    pub threshold: Option<f64>,

    /// Run even if the AOI is paused.
    #[garde(skip)]
    #[serde(default)]
    pub force_scan: bool,

    #[garde(skip)]
    pub start_date: Option<NaiveDate>,

    #[garde(skip)]
    pub end_date: Option<NaiveDate>,
}

impl MonitorRequest {
    /// Cross-field check garde cannot express: a custom range must run
    /// forward in time.
    pub fn date_range_valid(&self) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => end > start,
            _ => true,
        }
    }
}

/// Detection parameters after merging the request with the AOI record.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub alert_type: AlertType,
    pub threshold: f64,
    pub custom_dates: Option<CustomDates>,
}

/// Merge request overrides with the AOI's stored configuration.
///
/// Precedence: request value, then AOI value, then engine default
/// (deforestation at 0.5). The date filter prefers an explicit range in
/// the request, then the AOI's own custom window, else none — the engine
/// falls back to its default lookback.
pub fn resolve_effective_config(aoi: &Aoi, req: &MonitorRequest) -> EffectiveConfig {
    let custom_dates = match (req.start_date, req.end_date) {
        (Some(start), Some(end)) => Some(CustomDates {
            start_date: start.to_string(),
            end_date: end.to_string(),
        }),
        _ => match (aoi.frequency, aoi.end_date) {
            (Frequency::Custom, Some(end)) => Some(CustomDates {
                start_date: aoi.start_date.to_string(),
                end_date: end.to_string(),
            }),
            _ => None,
        },
    };

    EffectiveConfig {
        alert_type: req.alert_type.unwrap_or(aoi.alert_type),
        threshold: req.threshold.unwrap_or(aoi.threshold),
        custom_dates,
    }
}

/// Response after accepting a monitoring request.
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub estimated_completion_time: String,
}

/// Response for GET /api/v1/jobs/{job_id}.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aoi_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatusResponse {
    /// Snapshot for a job id with no durable record yet. Distinct from
    /// "will never exist": callers are expected to keep polling.
    pub fn not_yet_stored(job_id: String) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            progress: 0,
            aoi_id: None,
            result_id: None,
            error: None,
        }
    }
}

/// AOI summary embedded in the activity response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AoiSummary {
    pub id: Uuid,
    pub name: String,
    pub last_monitored: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub confidence: f64,
    pub description: String,
    pub time: DateTime<Utc>,
    pub status: AlertStatus,
}

impl From<Alert> for AlertSummary {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            confidence: alert.confidence,
            description: alert.description,
            time: alert.created_at,
            status: alert.status,
        }
    }
}

/// Response for GET /api/v1/aois/{aoi_id}/activity.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub aoi: AoiSummary,
    pub alerts: Vec<AlertSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::aoi::{AoiStatus, Geometry, NotificationPrefs};

    fn sample_aoi() -> Aoi {
        Aoi {
            id: Uuid::new_v4(),
            user_id: "u-1".to_string(),
            name: "Rondônia tract 7".to_string(),
            geometry: Geometry::Polygon {
                coordinates: vec![[-62.1, -3.4], [-62.0, -3.4], [-62.0, -3.3]],
            },
            alert_type: AlertType::Deforestation,
            threshold: 0.6,
            frequency: Frequency::Continuous,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: None,
            notifications: NotificationPrefs::default(),
            status: AoiStatus::Active,
            last_monitored: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_request_overrides_win() {
        let aoi = sample_aoi();
        let req = MonitorRequest {
            alert_type: Some(AlertType::UrbanDevelopment),
            threshold: Some(0.9),
            ..Default::default()
        };
        let effective = resolve_effective_config(&aoi, &req);
        assert_eq!(effective.alert_type, AlertType::UrbanDevelopment);
        assert_eq!(effective.threshold, 0.9);
    }

    #[test]
    fn test_aoi_values_fill_unset_fields() {
        let aoi = sample_aoi();
        let effective = resolve_effective_config(&aoi, &MonitorRequest::default());
        assert_eq!(effective.alert_type, AlertType::Deforestation);
        assert_eq!(effective.threshold, 0.6);
        assert!(effective.custom_dates.is_none());
    }

    #[test]
    fn test_request_date_range_preferred() {
        let mut aoi = sample_aoi();
        aoi.frequency = Frequency::Custom;
        aoi.end_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        let req = MonitorRequest {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            ..Default::default()
        };
        let effective = resolve_effective_config(&aoi, &req);
        let dates = effective.custom_dates.unwrap();
        assert_eq!(dates.start_date, "2026-03-01");
        assert_eq!(dates.end_date, "2026-04-01");
    }

    #[test]
    fn test_aoi_custom_window_fallback() {
        let mut aoi = sample_aoi();
        aoi.frequency = Frequency::Custom;
        aoi.end_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        let effective = resolve_effective_config(&aoi, &MonitorRequest::default());
        let dates = effective.custom_dates.unwrap();
        assert_eq!(dates.start_date, "2026-01-01");
        assert_eq!(dates.end_date, "2026-06-01");
    }

    #[test]
    fn test_partial_request_range_ignored() {
        // Only one endpoint given: fall through to the AOI window rule.
        let aoi = sample_aoi();
        let req = MonitorRequest {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..Default::default()
        };
        let effective = resolve_effective_config(&aoi, &req);
        assert!(effective.custom_dates.is_none());
    }

    #[test]
    fn test_threshold_validation() {
        let req = MonitorRequest { threshold: Some(0.05), ..Default::default() };
        assert!(req.validate().is_err());
        let req = MonitorRequest { threshold: Some(0.5), ..Default::default() };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_inverted_date_range_rejected() {
        let req = MonitorRequest {
            start_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..Default::default()
        };
        assert!(!req.date_range_valid());

        let req = MonitorRequest {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            ..Default::default()
        };
        assert!(req.date_range_valid());
    }
}
