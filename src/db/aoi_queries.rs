use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::aoi::{AlertType, Aoi, AoiStatus, Frequency, Geometry, NotificationPrefs};

fn decode<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

fn map_aoi(row: PgRow) -> Result<Aoi, sqlx::Error> {
    let alert_type: String = row.try_get("alert_type")?;
    let frequency: String = row.try_get("frequency")?;
    let status: String = row.try_get("status")?;
    let geometry: serde_json::Value = row.try_get("geometry")?;
    let notifications: serde_json::Value = row.try_get("notifications")?;

    Ok(Aoi {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        geometry: serde_json::from_value::<Geometry>(geometry).map_err(decode)?,
        alert_type: AlertType::from_str(&alert_type).map_err(decode)?,
        threshold: row.try_get("threshold")?,
        frequency: Frequency::from_str(&frequency).map_err(decode)?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        notifications: serde_json::from_value::<NotificationPrefs>(notifications)
            .map_err(decode)?,
        status: AoiStatus::from_str(&status).map_err(decode)?,
        last_monitored: row.try_get("last_monitored")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Fetch an AOI scoped to its owner. A missing row and a row owned by
/// someone else are indistinguishable by construction, so callers cannot
/// leak existence to non-owners.
pub async fn get_aoi_owned(
    pool: &PgPool,
    aoi_id: Uuid,
    user_id: &str,
) -> Result<Option<Aoi>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, name, geometry, alert_type, threshold, frequency,
               start_date, end_date, notifications, status, last_monitored, created_at
        FROM aois
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(aoi_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(map_aoi).transpose()
}

/// Stamp the AOI as monitored now. Overwritten idempotently; concurrent
/// submits for the same AOI race harmlessly here.
pub async fn touch_last_monitored(pool: &PgPool, aoi_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE aois SET last_monitored = NOW() WHERE id = $1")
        .bind(aoi_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a full AOI record. Used by seeding and tests; the user-facing
/// CRUD surface lives outside this service.
pub async fn insert_aoi(pool: &PgPool, aoi: &Aoi) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO aois (id, user_id, name, geometry, alert_type, threshold, frequency,
                          start_date, end_date, notifications, status, last_monitored, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(aoi.id)
    .bind(&aoi.user_id)
    .bind(&aoi.name)
    .bind(serde_json::to_value(&aoi.geometry).map_err(decode)?)
    .bind(aoi.alert_type.to_string())
    .bind(aoi.threshold)
    .bind(aoi.frequency.to_string())
    .bind(aoi.start_date)
    .bind(aoi.end_date)
    .bind(serde_json::to_value(&aoi.notifications).map_err(decode)?)
    .bind(aoi.status.to_string())
    .bind(aoi.last_monitored)
    .bind(aoi.created_at)
    .execute(pool)
    .await?;
    Ok(())
}
