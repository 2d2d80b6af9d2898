use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a detection job in the async queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Strict parse of a stored status. Anything unrecognized is data
    /// corruption; defaulting it would turn a terminal row back into a
    /// forever-polling job.
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One asynchronous detection run against an AOI.
///
/// A job is created in `processing` the moment the monitoring request is
/// accepted, and moves to `completed` or `failed` exactly once. Terminal
/// snapshots are stable: repeated status reads return the same result_id
/// and error indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionJob {
    pub id: String,
    pub status: JobStatus,
    /// Coarse-grained progress, 0-100. Not continuously updated.
    pub progress: i32,
    pub aoi_id: Uuid,
    pub user_id: String,
    /// Alert id, set on transition to completed.
    pub result_id: Option<Uuid>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generate a job id: millisecond timestamp plus a short random suffix.
/// Not guaranteed globally unique; collisions are tolerably improbable
/// and the insert would surface one as a constraint error.
pub fn generate_job_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("job_{}_{}", millis, &suffix[..8])
}
