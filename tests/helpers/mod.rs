//! HTTP helpers for e2e testing against a running server + worker.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /api/v1/aois/{aoi_id}/monitor
#[derive(Debug, Serialize, Deserialize)]
pub struct MonitorResponse {
    pub job_id: String,
    pub status: String,
    pub estimated_completion_time: String,
}

/// Response from GET /api/v1/jobs/{job_id}
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress: i32,
    pub aoi_id: Option<Uuid>,
    pub result_id: Option<Uuid>,
    pub error: Option<String>,
}

/// Response from GET /api/v1/aois/{aoi_id}/activity
#[derive(Debug, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub aoi: AoiSummary,
    pub alerts: Vec<AlertSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AoiSummary {
    pub id: Uuid,
    pub name: String,
    pub last_monitored: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlertSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: String,
    pub confidence: f64,
    pub description: String,
    pub time: String,
    pub status: String,
}

/// Submit a monitoring request for an AOI.
pub async fn submit_monitoring(
    client: &reqwest::Client,
    base_url: &str,
    aoi_id: Uuid,
    user_id: &str,
    body: serde_json::Value,
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/api/v1/aois/{}/monitor", base_url, aoi_id))
        .header("x-user-id", user_id)
        .json(&body)
        .send()
        .await?;
    Ok(response)
}

/// Fetch a single job status snapshot.
pub async fn get_job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
    user_id: &str,
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/api/v1/jobs/{}", base_url, job_id))
        .header("x-user-id", user_id)
        .send()
        .await?;
    Ok(response)
}

/// Poll job status until completed or failed (with timeout)
pub async fn poll_job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
    user_id: &str,
    timeout_secs: u64,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for attempt in 0..max_attempts {
        let response = get_job_status(client, base_url, job_id, user_id).await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Status check failed: {}", error_text).into());
        }

        let snapshot = response.json::<JobStatusResponse>().await?;

        match snapshot.status.as_str() {
            "completed" | "failed" => return Ok(snapshot),
            "pending" | "processing" => {
                if attempt % 10 == 0 && attempt > 0 {
                    println!("  ... still waiting (attempt {}/{})", attempt, max_attempts);
                }
                sleep(Duration::from_millis(500)).await;
            }
            _ => {
                return Err(format!("Unknown job status: {}", snapshot.status).into());
            }
        }
    }

    Err(format!("Job did not complete within {} seconds", timeout_secs).into())
}

/// Fetch recent activity for an AOI.
pub async fn get_activity(
    client: &reqwest::Client,
    base_url: &str,
    aoi_id: Uuid,
    user_id: &str,
) -> Result<ActivityResponse, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/api/v1/aois/{}/activity", base_url, aoi_id))
        .header("x-user-id", user_id)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Activity fetch failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<ActivityResponse>().await?)
}
