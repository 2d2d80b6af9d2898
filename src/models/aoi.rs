use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Change categories the detection engine can be asked to look for.
///
/// The first four are the standard detectors; the rest are advanced
/// detector variants that require higher-resolution imagery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Deforestation,
    UrbanDevelopment,
    WaterBodyChange,
    LandUseChange,
    CoastalErosion,
    GlacialRetreat,
    VegetationStress,
}

/// Monitoring cadence for an AOI.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Continuous,
    Custom,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AoiStatus {
    Active,
    Paused,
}

/// AOI geometry in geographic (lon, lat) coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    Polygon { coordinates: Vec<[f64; 2]> },
    Circle { center: [f64; 2], radius_m: f64 },
    Rectangle { south_west: [f64; 2], north_east: [f64; 2] },
}

impl Geometry {
    /// A polygon needs at least three vertices to enclose area; circles
    /// need a positive radius. Monitoring must not start on an empty shape.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Polygon { coordinates } => coordinates.len() < 3,
            Geometry::Circle { radius_m, .. } => *radius_m <= 0.0,
            Geometry::Rectangle { south_west, north_east } => {
                south_west[0] >= north_east[0] || south_west[1] >= north_east[1]
            }
        }
    }
}

/// Per-channel notification preferences stored on the AOI. Channels are
/// on unless explicitly switched off; a missing address degrades to the
/// service default rather than disabling delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPrefs {
    #[serde(default = "enabled")]
    pub webhook_enabled: bool,
    pub webhook_url: Option<String>,
    #[serde(default = "enabled")]
    pub email_enabled: bool,
    pub email_address: Option<String>,
}

fn enabled() -> bool {
    true
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            webhook_enabled: true,
            webhook_url: None,
            email_enabled: true,
            email_address: None,
        }
    }
}

/// A monitored Area of Interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aoi {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub geometry: Geometry,
    pub alert_type: AlertType,
    /// Detection confidence cutoff, constrained to [0.1, 1.0].
    pub threshold: f64,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    /// Required when frequency is custom; must be after start_date.
    pub end_date: Option<NaiveDate>,
    pub notifications: NotificationPrefs,
    pub status: AoiStatus,
    pub last_monitored: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
