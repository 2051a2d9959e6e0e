//! Job heartbeats
//!
//! Keeps a job marked as alive on the server while its command runs. The
//! background loop is bound to a single job through a [`JobCompletion`] flag;
//! it is never joined, the coordinator only flips the flag and moves on.
//!
//! When the server cannot be reached the loop waits 5 minutes before trying
//! again, so a server restart does not fail long running jobs. After 2
//! consecutive unreachable attempts it gives up.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::QiitaClient;
use crate::error::{ClientError, Result};

/// Something that can signal liveness for a job
#[async_trait]
pub trait Liveness: Send + Sync {
    /// Sends one liveness signal for the job
    async fn beat(&self, job_id: &str) -> Result<()>;
}

#[async_trait]
impl Liveness for QiitaClient {
    async fn beat(&self, job_id: &str) -> Result<()> {
        self.heartbeat(job_id).await
    }
}

/// Per-job "job completed" flag
///
/// Written once by the coordinator, read by the heartbeat loop.
#[derive(Debug, Clone, Default)]
pub struct JobCompletion(Arc<AtomicBool>);

impl JobCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_completed(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_completed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Heartbeat cadence and unreachability budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    /// Time between two heartbeats
    pub interval: Duration,
    /// Wait after a heartbeat could not reach the server
    pub backoff: Duration,
    /// Consecutive unreachable heartbeats tolerated before giving up
    pub retries: u32,
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            backoff: Duration::from_secs(300),
            retries: 2,
        }
    }
}

/// Why the heartbeat loop ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStop {
    /// The job completed
    Completed,
    /// The server stayed unreachable for the whole retry budget
    Unreachable,
}

/// Handle on the heartbeat of a running job
///
/// Dropping the handle abandons the background task; it still stops on its
/// own once the completion flag is set.
#[derive(Debug)]
pub struct Heartbeat {
    job_id: String,
    completion: JobCompletion,
    task: Option<JoinHandle<Result<HeartbeatStop>>>,
}

impl Heartbeat {
    /// Sends the first heartbeat and spawns the background loop
    ///
    /// The first heartbeat moves the job to the running state, so it must
    /// succeed before the job does anything else; its error is returned.
    pub async fn start<L>(liveness: Arc<L>, job_id: &str, policy: HeartbeatPolicy) -> Result<Self>
    where
        L: Liveness + ?Sized + 'static,
    {
        liveness.beat(job_id).await?;
        info!("Job {} is running, heartbeat started", job_id);

        let completion = JobCompletion::new();
        let task = tokio::spawn(heartbeat_loop(
            liveness,
            job_id.to_string(),
            completion.clone(),
            policy,
        ));

        Ok(Self {
            job_id: job_id.to_string(),
            completion,
            task: Some(task),
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The completion flag shared with the background loop
    pub fn completion(&self) -> &JobCompletion {
        &self.completion
    }

    /// Tells the background loop the job is done
    pub fn stop(&self) {
        self.completion.mark_completed();
    }

    /// Whether the background loop has already ended
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Takes the loop's exit value if it has already ended
    ///
    /// Never waits: returns `None` while the loop is still running or once
    /// the outcome has been taken.
    pub async fn take_outcome(&mut self) -> Option<Result<HeartbeatStop>> {
        if !self.task.as_ref()?.is_finished() {
            return None;
        }
        let task = self.task.take()?;
        Some(match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(ClientError::Runtime(format!(
                "Error executing heartbeat: {}",
                e
            ))),
        })
    }
}

async fn heartbeat_loop<L>(
    liveness: Arc<L>,
    job_id: String,
    completion: JobCompletion,
    policy: HeartbeatPolicy,
) -> Result<HeartbeatStop>
where
    L: Liveness + ?Sized,
{
    let mut retries = policy.retries;

    loop {
        tokio::time::sleep(policy.interval).await;

        if completion.is_completed() {
            debug!("Job {} completed, stopping heartbeat", job_id);
            return Ok(HeartbeatStop::Completed);
        }

        match liveness.beat(&job_id).await {
            Ok(()) => {
                debug!("Heartbeat sent for job {}", job_id);
                retries = policy.retries;
            }
            Err(e) if e.is_unreachable() => {
                retries = retries.saturating_sub(1);
                if retries == 0 {
                    error!(
                        "Server unreachable, giving up heartbeat for job {}: {}",
                        job_id, e
                    );
                    return Ok(HeartbeatStop::Unreachable);
                }
                warn!(
                    "Server unreachable for job {} heartbeat, retrying in {:?}: {}",
                    job_id, policy.backoff, e
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) if e.is_client_error() => {
                error!("Heartbeat for job {} rejected: {}", job_id, e);
                return Err(e);
            }
            Err(e) => {
                error!("Heartbeat for job {} failed: {}", job_id, e);
                return Err(ClientError::Runtime(format!(
                    "Error executing heartbeat: {}",
                    e
                )));
            }
        }
    }
}
