//! Job-related API endpoints

use qiita_core::domain::artifact::ArtifactInfo;
use qiita_core::domain::job::JobInfo;
use qiita_core::dto::job::{CompletionPayload, StepUpdate};
use std::sync::Arc;
use tracing::info;

use crate::QiitaClient;
use crate::error::{ClientError, Result};
use crate::heartbeat::{Heartbeat, HeartbeatPolicy};
use crate::transport::RequestBody;

impl QiitaClient {
    // =============================================================================
    // Job Information
    // =============================================================================

    /// Get the information of a job
    ///
    /// # Arguments
    /// * `job_id` - The job id
    ///
    /// # Returns
    /// The command and parameters the job must run
    pub async fn get_job_info(&self, job_id: &str) -> Result<JobInfo> {
        let body = self
            .get(&format!("/jobs/{}", job_id))
            .await?
            .ok_or_else(|| ClientError::Parse(format!("Empty job information for {}", job_id)))?;

        serde_json::from_value(body)
            .map_err(|e| ClientError::Parse(format!("Invalid job information: {}", e)))
    }

    /// Update the current step of a job
    ///
    /// # Arguments
    /// * `job_id` - The job id
    /// * `step` - Description of the new step
    pub async fn update_job_step(&self, job_id: &str, step: &str) -> Result<()> {
        let body = serde_json::to_value(StepUpdate {
            step: step.to_string(),
        })
        .map_err(|e| ClientError::Parse(e.to_string()))?;

        self.post(&format!("/jobs/{}/step/", job_id), RequestBody::Json(body))
            .await?;
        Ok(())
    }

    // =============================================================================
    // Liveness
    // =============================================================================

    /// Send a single heartbeat for a job
    ///
    /// The first heartbeat of a job moves it to the running state.
    pub async fn heartbeat(&self, job_id: &str) -> Result<()> {
        self.post(&format!("/jobs/{}/heartbeat/", job_id), RequestBody::Empty)
            .await?;
        Ok(())
    }

    /// Start sending heartbeats for a job
    ///
    /// The first heartbeat is sent before returning; the following ones are
    /// sent every 30 seconds from a background task until the job completes.
    pub async fn start_heartbeat(self: &Arc<Self>, job_id: &str) -> Result<Heartbeat> {
        Heartbeat::start(Arc::clone(self), job_id, HeartbeatPolicy::default()).await
    }

    // =============================================================================
    // Completion
    // =============================================================================

    /// Report the final result of a job
    ///
    /// Stop the job's [`Heartbeat`] before calling this.
    ///
    /// # Arguments
    /// * `job_id` - The job id
    /// * `success` - Whether the job completed successfully
    /// * `error_msg` - Failure detail, ignored on success
    /// * `artifacts` - Produced artifacts, ignored on failure
    pub async fn complete_job(
        &self,
        job_id: &str,
        success: bool,
        error_msg: Option<&str>,
        artifacts: Option<&[ArtifactInfo]>,
    ) -> Result<()> {
        let payload = CompletionPayload::new(success, error_msg, artifacts);
        let body = serde_json::to_value(&payload).map_err(|e| ClientError::Parse(e.to_string()))?;

        info!(
            "Completing job {} ({})",
            job_id,
            if success { "success" } else { "failure" }
        );

        self.post(&format!("/jobs/{}/complete/", job_id), RequestBody::Json(body))
            .await?;
        Ok(())
    }
}
