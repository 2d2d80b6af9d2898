//! Shared fixtures for integration and e2e tests.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use geosentry::models::aoi::{
    AlertType, Aoi, AoiStatus, Frequency, Geometry, NotificationPrefs,
};

/// A well-formed engine output document (high-severity deforestation).
pub const ENGINE_OUTPUT_HIGH: &str = r#"{
  "alert_data": {
    "type": "deforestation",
    "severity": "high",
    "confidence": 0.82,
    "description": "Canopy loss across 14 ha",
    "detectedChange": "Cleared area expanded along the southern boundary"
  }
}"#;

/// Build an active AOI owned by `user_id`, ready for monitoring.
pub fn active_aoi(user_id: &str) -> Aoi {
    Aoi {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        name: format!("Test tract {}", &Uuid::new_v4().simple().to_string()[..6]),
        geometry: Geometry::Polygon {
            coordinates: vec![[-62.1, -3.4], [-62.0, -3.4], [-62.0, -3.3]],
        },
        alert_type: AlertType::Deforestation,
        threshold: 0.5,
        frequency: Frequency::Continuous,
        start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        end_date: None,
        notifications: NotificationPrefs::default(),
        status: AoiStatus::Active,
        last_monitored: None,
        created_at: Utc::now(),
    }
}

/// Same as [`active_aoi`] but paused, for InvalidState coverage.
pub fn paused_aoi(user_id: &str) -> Aoi {
    let mut aoi = active_aoi(user_id);
    aoi.status = AoiStatus::Paused;
    aoi
}
