use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::models::detection::{EngineInput, EngineOutput};

/// Handle to the external change-detection process.
///
/// The engine is opaque: it reads an input document, analyzes imagery for
/// the described AOI, and writes an output document on success. The
/// presence of the output file is the authoritative success signal; exit
/// status and stderr are observed for logging only.
pub struct DetectionEngine {
    command: String,
    workspace: PathBuf,
    debug: bool,
}

impl DetectionEngine {
    pub fn new(command: impl Into<String>, workspace: impl Into<PathBuf>, debug: bool) -> Self {
        Self {
            command: command.into(),
            workspace: workspace.into(),
            debug,
        }
    }

    /// Per-job artifact directory. Artifacts are never shared across jobs.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.workspace.join(job_id)
    }

    /// Write the engine input artifact for a job and return the
    /// (input, output) artifact paths.
    pub async fn write_input(
        &self,
        job_id: &str,
        input: &EngineInput,
    ) -> Result<(PathBuf, PathBuf), EngineError> {
        let dir = self.job_dir(job_id);
        tokio::fs::create_dir_all(&dir).await.map_err(EngineError::Io)?;

        let input_path = dir.join("input.json");
        let output_path = dir.join("result.json");

        let doc = serde_json::to_vec_pretty(input).map_err(EngineError::Parse)?;
        tokio::fs::write(&input_path, doc).await.map_err(EngineError::Io)?;

        Ok((input_path, output_path))
    }

    /// Launch the engine and wait for it to exit, then read its verdict.
    ///
    /// Returns the parsed output document, or an error mapping directly to
    /// the job failure taxonomy: a missing output file is definitive (no
    /// retry), a present-but-malformed one surfaces the parse error.
    pub async fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<EngineOutput, EngineError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg("--input")
            .arg(input_path)
            .arg("--output")
            .arg(output_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.debug {
            cmd.arg("--debug");
        }

        tracing::debug!(command = %self.command, input = %input_path.display(), "Launching detection engine");

        // Awaiting process exit is the completion signal.
        let output = cmd.output().await.map_err(EngineError::Spawn)?;

        if !output.status.success() {
            // Logged, not authoritative: the output-file check below decides.
            tracing::warn!(
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Detection engine exited abnormally"
            );
        }

        self.read_output(output_path).await
    }

    /// Read and parse the output artifact left by the engine.
    pub async fn read_output(&self, output_path: &Path) -> Result<EngineOutput, EngineError> {
        let bytes = match tokio::fs::read(output_path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::ResultMissing)
            }
            Err(e) => return Err(EngineError::Io(e)),
        };

        serde_json::from_slice(&bytes).map_err(EngineError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to launch detection engine: {0}")]
    Spawn(std::io::Error),

    #[error("Engine workspace I/O error: {0}")]
    Io(std::io::Error),

    #[error("No results file generated")]
    ResultMissing,

    #[error("Malformed engine output: {0}")]
    Parse(serde_json::Error),
}
