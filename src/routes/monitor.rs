use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{alert_queries, aoi_queries, job_queries};
use crate::models::aoi::AoiStatus;
use crate::models::detection::EngineInput;
use crate::models::job;
use crate::models::monitor::{
    resolve_effective_config, ActivityResponse, AoiSummary, JobStatusResponse, MonitorRequest,
    MonitorResponse,
};
use crate::routes::error::ApiError;
use crate::services::queue::QueuedDetection;

/// Fixed estimate returned to polling clients. Completion is observed
/// through the job status endpoint, never through this value.
const ESTIMATED_COMPLETION: &str = "5 minutes";

/// How many alerts the activity endpoint returns.
const RECENT_ALERTS_LIMIT: i64 = 10;

/// Caller identity. Authentication is handled upstream; the gateway
/// injects the session principal as a header.
fn caller_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Forbidden)
}

/// POST /api/v1/aois/{aoi_id}/monitor — accept a detection run for an AOI.
///
/// Fire-and-forget plus poll: the job is durably recorded, the engine
/// input artifact written and the run enqueued, then this returns
/// immediately with the job id. The caller polls job status for the
/// outcome.
pub async fn submit_monitoring(
    State(state): State<AppState>,
    Path(aoi_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<MonitorRequest>,
) -> Result<(StatusCode, Json<MonitorResponse>), ApiError> {
    let user_id = caller_id(&headers)?;
    req.validate()?;
    if !req.date_range_valid() {
        return Err(ApiError::Validation(
            "end_date must be after start_date".to_string(),
        ));
    }

    let aoi = aoi_queries::get_aoi_owned(&state.db, aoi_id, &user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if aoi.geometry.is_empty() {
        return Err(ApiError::InvalidState(
            "AOI geometry is empty; draw a region before monitoring".to_string(),
        ));
    }

    if aoi.status != AoiStatus::Active && !req.force_scan {
        return Err(ApiError::InvalidState(
            "AOI is paused; set force_scan to run anyway".to_string(),
        ));
    }

    let effective = resolve_effective_config(&aoi, &req);
    let job_id = job::generate_job_id();

    tracing::info!(
        job_id = %job_id,
        aoi_id = %aoi.id,
        alert_type = %effective.alert_type,
        threshold = effective.threshold,
        "Accepting detection run"
    );

    let created = job_queries::create_job(&state.db, &job_id, aoi.id, &user_id).await?;

    let input = EngineInput {
        geometry: aoi.geometry.clone(),
        alert_type: effective.alert_type,
        threshold: effective.threshold,
        aoi_id: aoi.id,
        user_id: user_id.clone(),
        frequency: aoi.frequency,
        custom_dates: effective.custom_dates,
    };

    let staged: Result<(), ApiError> = async {
        let (input_path, output_path) = state.engine.write_input(&job_id, &input).await?;
        state
            .queue
            .enqueue(&QueuedDetection {
                job_id: job_id.clone(),
                aoi_id: aoi.id,
                user_id: user_id.clone(),
                input_path,
                output_path,
            })
            .await?;
        Ok(())
    }
    .await;

    if let Err(e) = staged {
        // The row must not linger in `processing` when the run was never
        // handed to a worker; no worker will ever finalize it.
        if let Err(mark) =
            job_queries::fail_job(&state.db, &job_id, "Failed to stage detection run").await
        {
            tracing::error!(job_id = %job_id, error = %mark, "Could not mark unstaged job failed");
        }
        return Err(e);
    }

    // Stamped regardless of how the run ends.
    aoi_queries::touch_last_monitored(&state.db, aoi.id).await?;

    metrics::counter!("detection_jobs_total").increment(1);

    Ok((
        StatusCode::ACCEPTED,
        Json(MonitorResponse {
            job_id: created.id,
            status: created.status,
            estimated_completion_time: ESTIMATED_COMPLETION.to_string(),
        }),
    ))
}

/// GET /api/v1/jobs/{job_id} — poll a detection job.
///
/// A job id with no durable record yet gets a synthesized pending
/// snapshot rather than a 404: "not stored yet" is not "will never
/// exist". Terminal snapshots are stable reads.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let user_id = caller_id(&headers)?;

    let job = match job_queries::get_job(&state.db, &job_id).await? {
        Some(job) => job,
        None => return Ok(Json(JobStatusResponse::not_yet_stored(job_id))),
    };

    if job.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status,
        progress: job.progress,
        aoi_id: Some(job.aoi_id),
        result_id: job.result_id,
        error: job.error,
    }))
}

/// GET /api/v1/aois/{aoi_id}/activity — AOI summary plus recent alerts.
pub async fn get_recent_activity(
    State(state): State<AppState>,
    Path(aoi_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ActivityResponse>, ApiError> {
    let user_id = caller_id(&headers)?;

    let aoi = aoi_queries::get_aoi_owned(&state.db, aoi_id, &user_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let alerts = alert_queries::recent_alerts(&state.db, aoi.id, RECENT_ALERTS_LIMIT).await?;

    Ok(Json(ActivityResponse {
        aoi: AoiSummary {
            id: aoi.id,
            name: aoi.name,
            last_monitored: aoi.last_monitored,
        },
        alerts: alerts.into_iter().map(Into::into).collect(),
    }))
}
