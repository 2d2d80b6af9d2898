use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::job::{DetectionJob, JobStatus};

fn map_job(row: PgRow) -> Result<DetectionJob, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = JobStatus::from_db(&status).ok_or_else(|| {
        sqlx::Error::Decode(format!("unknown job status: {status}").into())
    })?;

    Ok(DetectionJob {
        id: row.try_get("id")?,
        status,
        progress: row.try_get("progress")?,
        aoi_id: row.try_get("aoi_id")?,
        user_id: row.try_get("user_id")?,
        result_id: row.try_get("result_id")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a new detection job. Jobs start in `processing` the moment the
/// request is accepted.
pub async fn create_job(
    pool: &PgPool,
    job_id: &str,
    aoi_id: Uuid,
    user_id: &str,
) -> Result<DetectionJob, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO detection_jobs (id, status, progress, aoi_id, user_id)
        VALUES ($1, 'processing', 10, $2, $3)
        RETURNING id, status, progress, aoi_id, user_id, result_id, error,
                  created_at, updated_at
        "#,
    )
    .bind(job_id)
    .bind(aoi_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    map_job(row)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, job_id: &str) -> Result<Option<DetectionJob>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, status, progress, aoi_id, user_id, result_id, error,
               created_at, updated_at
        FROM detection_jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.map(map_job).transpose()
}

/// Bump coarse progress on a still-running job.
pub async fn update_progress(
    pool: &PgPool,
    job_id: &str,
    progress: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE detection_jobs
        SET progress = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'processing'
        "#,
    )
    .bind(progress)
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Transition a job to `completed`, recording the alert it produced.
///
/// The `status = 'processing'` guard makes the terminal transition
/// at-most-once: a second finalize attempt matches zero rows and returns
/// false instead of overwriting the terminal snapshot.
pub async fn complete_job<'e, E>(
    executor: E,
    job_id: &str,
    result_id: Uuid,
) -> Result<bool, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE detection_jobs
        SET status = 'completed', progress = 100, result_id = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'processing'
        "#,
    )
    .bind(result_id)
    .bind(job_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Transition a job to `failed` with a human-readable error. Same
/// at-most-once guard as [`complete_job`].
pub async fn fail_job(pool: &PgPool, job_id: &str, error: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE detection_jobs
        SET status = 'failed', error = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'processing'
        "#,
    )
    .bind(error)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
