use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::alert::{Alert, AlertStatus, Severity};
use crate::models::aoi::AlertType;
use crate::models::detection::AlertData;

fn decode<E>(e: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(e))
}

fn map_alert(row: PgRow) -> Result<Alert, sqlx::Error> {
    let alert_type: String = row.try_get("alert_type")?;
    let severity: String = row.try_get("severity")?;
    let status: String = row.try_get("status")?;

    Ok(Alert {
        id: row.try_get("id")?,
        aoi_id: row.try_get("aoi_id")?,
        user_id: row.try_get("user_id")?,
        alert_type: AlertType::from_str(&alert_type).map_err(decode)?,
        severity: Severity::from_str(&severity).map_err(decode)?,
        confidence: row.try_get("confidence")?,
        description: row.try_get("description")?,
        detected_change: row.try_get("detected_change")?,
        status: AlertStatus::from_str(&status).map_err(decode)?,
        created_at: row.try_get("created_at")?,
    })
}

/// Persist a new alert built from the engine's alert_data payload.
/// Append-only from the orchestrator's perspective. Takes any executor so
/// the worker can pair it with the job's terminal transition in one
/// transaction.
pub async fn create_alert<'e, E>(
    executor: E,
    aoi_id: Uuid,
    user_id: &str,
    data: &AlertData,
) -> Result<Alert, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO alerts (id, aoi_id, user_id, alert_type, severity, confidence,
                            description, detected_change, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'new')
        RETURNING id, aoi_id, user_id, alert_type, severity, confidence,
                  description, detected_change, status, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(aoi_id)
    .bind(user_id)
    .bind(data.alert_type.to_string())
    .bind(data.severity.to_string())
    .bind(data.confidence)
    .bind(&data.description)
    .bind(&data.detected_change)
    .fetch_one(executor)
    .await?;

    map_alert(row)
}

/// Most recent alerts for an AOI, newest first.
pub async fn recent_alerts(
    pool: &PgPool,
    aoi_id: Uuid,
    limit: i64,
) -> Result<Vec<Alert>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, aoi_id, user_id, alert_type, severity, confidence,
               description, detected_change, status, created_at
        FROM alerts
        WHERE aoi_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(aoi_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(map_alert).collect()
}

/// Count alerts for an AOI (used by tests to assert the
/// one-alert-per-successful-job property).
pub async fn count_alerts(pool: &PgPool, aoi_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM alerts WHERE aoi_id = $1")
        .bind(aoi_id)
        .fetch_one(pool)
        .await?;
    row.try_get("n")
}
