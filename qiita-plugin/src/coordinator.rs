//! Job lifecycle coordination
//!
//! Runs one job from start to end:
//! - fetch the job information
//! - start the heartbeat (moves the job to running)
//! - prepare the output directory and run the command
//! - stop the heartbeat and report completion
//!
//! Once the heartbeat started the job is always completed, whatever the
//! command did. Failures before that point propagate to the caller since there
//! is no running job to report against.

use async_trait::async_trait;
use qiita_client::{ClientError, Heartbeat, HeartbeatPolicy, HeartbeatStop, QiitaClient};
use qiita_core::domain::job::JobInfo;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::command::{CommandFunction, CommandOutcome, CommandRegistry, QiitaCommand};

/// Job id that asks the plugin to register itself instead of running a job
pub const REGISTER_JOB_ID: &str = "register";

/// Errors that abort a plugin run
#[derive(Debug, Error)]
pub enum PluginError {
    /// Fetching the job, starting its heartbeat or reporting completion failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Self-registration was requested but the plugin has no installer
    #[error("Plugin '{0}' does not support self-registration")]
    RegistrationUnsupported(String),

    /// The installer failed
    #[error("Failed to register plugin '{name}': {reason:#}")]
    Registration { name: String, reason: anyhow::Error },
}

/// Registers a plugin and its commands with the server
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, client: &QiitaClient, plugin: &QiitaPlugin) -> anyhow::Result<()>;
}

/// State of the heartbeat when the job was reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatStatus {
    /// Still running; it stops on its own after seeing the completion flag
    Running,
    /// Ended before the job completed
    Stopped(HeartbeatStop),
    /// Ended with an error while the job was running
    Failed(String),
}

/// Summary of a completed job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: String,
    pub command: String,
    pub success: bool,
    pub heartbeat: HeartbeatStatus,
}

/// Result of a plugin run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    Registered,
    Job(JobReport),
}

/// A Qiita plugin: its identity and command table
pub struct QiitaPlugin {
    name: String,
    version: String,
    description: String,
    commands: CommandRegistry,
    installer: Option<Arc<dyn Installer>>,
    heartbeat_policy: HeartbeatPolicy,
}

impl QiitaPlugin {
    /// Creates a plugin without commands
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            commands: CommandRegistry::new(),
            installer: None,
            heartbeat_policy: HeartbeatPolicy::default(),
        }
    }

    /// Creates a type plugin
    ///
    /// Type plugins expose exactly two commands: `Validate`, which checks a
    /// new artifact of the plugin's types, and `Generate HTML summary`.
    pub fn type_plugin(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        validate: impl CommandFunction + 'static,
        html_summary: impl CommandFunction + 'static,
    ) -> Self {
        let mut plugin = Self::new(name, version, description);
        plugin.register_command(QiitaCommand::new(
            "Validate",
            "Validates a new artifact",
            validate,
        ));
        plugin.register_command(QiitaCommand::new(
            "Generate HTML summary",
            "Generates the HTML summary of an artifact",
            html_summary,
        ));
        plugin
    }

    /// Registers a command in the plugin
    pub fn register_command(&mut self, command: QiitaCommand) {
        info!("Registering command '{}' in {}", command.name(), self.name);
        self.commands.register(command);
    }

    /// Sets the installer used for the `register` job id
    pub fn with_installer(mut self, installer: Arc<dyn Installer>) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Overrides the heartbeat cadence
    pub fn with_heartbeat_policy(mut self, policy: HeartbeatPolicy) -> Self {
        self.heartbeat_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Runs a job, or registers the plugin if `job_id` is `register`
    ///
    /// # Arguments
    /// * `client` - Authenticated client, shared with the heartbeat and the command
    /// * `job_id` - The job to run
    /// * `output_dir` - Where the command writes its outputs; created if missing
    ///
    /// # Errors
    /// Errors fetching the job or sending its first heartbeat are returned
    /// without completing the job. Errors raised by the command never are:
    /// they are reported to the server as a failed job.
    pub async fn run(
        &self,
        client: Arc<QiitaClient>,
        job_id: &str,
        output_dir: &Path,
    ) -> Result<RunReport, PluginError> {
        if job_id == REGISTER_JOB_ID {
            self.install(&client).await?;
            return Ok(RunReport::Registered);
        }

        let job_info = client.get_job_info(job_id).await?;
        info!("Job {} runs command '{}'", job_id, job_info.command);

        let mut heartbeat =
            Heartbeat::start(Arc::clone(&client), job_id, self.heartbeat_policy).await?;

        let command = job_info.command.clone();
        let outcome = self
            .execute_command(Arc::clone(&client), job_id, job_info, output_dir)
            .await;

        let heartbeat = self
            .complete(&client, &mut heartbeat, job_id, &outcome)
            .await?;

        Ok(RunReport::Job(JobReport {
            job_id: job_id.to_string(),
            command,
            success: outcome.success,
            heartbeat,
        }))
    }

    async fn install(&self, client: &QiitaClient) -> Result<(), PluginError> {
        let installer = self
            .installer
            .as_ref()
            .ok_or_else(|| PluginError::RegistrationUnsupported(self.name.clone()))?;

        info!("Registering plugin {} {}", self.name, self.version);
        installer
            .install(client, self)
            .await
            .map_err(|reason| PluginError::Registration {
                name: self.name.clone(),
                reason,
            })
    }

    /// Runs the job's command, turning every failure into a failed outcome
    async fn execute_command(
        &self,
        client: Arc<QiitaClient>,
        job_id: &str,
        job_info: JobInfo,
        output_dir: &Path,
    ) -> CommandOutcome {
        let JobInfo {
            command: name,
            parameters,
            ..
        } = job_info;

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            error!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            );
            return CommandOutcome::failed(format!(
                "Error creating output directory {}: {}",
                output_dir.display(),
                e
            ));
        }

        let Some(command) = self.commands.get(&name) else {
            error!("Plugin {} has no command '{}'", self.name, name);
            return CommandOutcome::failed(format!(
                "Error executing {}:\nplugin {} {} has no such command",
                name, self.name, self.version
            ));
        };

        info!("Executing '{}' for job {}", name, job_id);

        // Own task so a panic is contained like an error
        let function = command.function();
        let task_job_id = job_id.to_string();
        let task_output_dir: PathBuf = output_dir.to_path_buf();
        let task = tokio::spawn(async move {
            function
                .execute(client, task_job_id, parameters, task_output_dir)
                .await
        });

        match task.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("Command '{}' failed for job {}: {:#}", name, job_id, e);
                CommandOutcome::failed(format!("Error executing {}:\n{:?}", name, e))
            }
            Err(e) => {
                let detail = if e.is_panic() {
                    format!("panicked: {}", panic_message(e.into_panic()))
                } else {
                    e.to_string()
                };
                error!("Command '{}' for job {} {}", name, job_id, detail);
                CommandOutcome::failed(format!("Error executing {}:\n{}", name, detail))
            }
        }
    }

    /// Stops the heartbeat and reports the outcome
    async fn complete(
        &self,
        client: &QiitaClient,
        heartbeat: &mut Heartbeat,
        job_id: &str,
        outcome: &CommandOutcome,
    ) -> Result<HeartbeatStatus, PluginError> {
        heartbeat.stop();

        client
            .complete_job(
                job_id,
                outcome.success,
                outcome.error_message.as_deref(),
                outcome.artifacts.as_deref(),
            )
            .await?;

        info!(
            "Job {} completed with status: {}",
            job_id,
            if outcome.success { "success" } else { "failure" }
        );

        Ok(match heartbeat.take_outcome().await {
            None => HeartbeatStatus::Running,
            Some(Ok(stop)) => HeartbeatStatus::Stopped(stop),
            Some(Err(e)) => {
                warn!("Heartbeat of job {} had failed: {}", job_id, e);
                HeartbeatStatus::Failed(e.to_string())
            }
        })
    }
}

impl std::fmt::Debug for QiitaPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QiitaPlugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("commands", &self.commands.names().collect::<Vec<_>>())
            .field("heartbeat_policy", &self.heartbeat_policy)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
