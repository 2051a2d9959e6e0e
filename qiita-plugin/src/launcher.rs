//! Command-line entry point for plugin binaries
//!
//! Qiita invokes a plugin as `<plugin> <server_url> <job_id> <output_dir>`.
//! The launcher sets up logging, loads the plugin configuration, connects the
//! client and runs the job.

use anyhow::{Context, Result};
use clap::Parser;
use qiita_client::{QiitaClient, build_http_client};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::coordinator::{HeartbeatStatus, QiitaPlugin, RunReport};

/// Arguments Qiita passes to a plugin
#[derive(Debug, Parser)]
#[command(about = "Execute a Qiita job with this plugin", long_about = None)]
pub struct PluginArgs {
    /// URL of the Qiita server
    pub server_url: String,

    /// Job to execute, or "register" to register the plugin
    pub job_id: String,

    /// Directory where the job writes its outputs
    pub output_dir: PathBuf,

    /// Plugin configuration file; credentials are read from the environment
    /// when not given
    #[arg(long, env = "QIITA_PLUGIN_CONFIG")]
    pub config: Option<PathBuf>,
}

impl PluginArgs {
    /// Loads and validates the configuration these arguments point to
    pub fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::from_file(&self.server_url, path)?,
            None => Config::from_env(&self.server_url)?,
        };
        config.validate()?;
        Ok(config)
    }
}

impl QiitaPlugin {
    /// Runs the plugin with the process arguments
    pub async fn launch(self) -> Result<()> {
        self.launch_with_args(PluginArgs::parse()).await
    }

    /// Runs the plugin with explicit arguments
    pub async fn launch_with_args(self, args: PluginArgs) -> Result<()> {
        init_tracing();

        info!("Starting plugin {} {}", self.name(), self.version());

        let config = args.load_config()?;
        info!(
            "Loaded configuration: server_url={}, client_id={}",
            config.server_url, config.client_id
        );

        let http = build_http_client(config.server_cert.as_deref(), config.request_timeout)
            .context("Failed to build HTTP client")?;
        let client = Arc::new(
            QiitaClient::connect_with_client(
                config.server_url.clone(),
                http,
                config.client_id.clone(),
                config.client_secret.clone(),
            )
            .await
            .context("Failed to connect to the Qiita server")?,
        );

        let report = self
            .run(client, &args.job_id, &args.output_dir)
            .await
            .with_context(|| format!("Failed to run job {}", args.job_id))?;

        match report {
            RunReport::Registered => info!("Plugin {} registered", self.name()),
            RunReport::Job(job) => {
                info!(
                    "Job {} ({}) reported as {}",
                    job.job_id,
                    job.command,
                    if job.success { "success" } else { "failure" }
                );
                if let HeartbeatStatus::Failed(e) = &job.heartbeat {
                    info!("Heartbeat of job {} had stopped early: {}", job.job_id, e);
                }
            }
        }

        Ok(())
    }
}

/// Installs the global subscriber; keeps an existing one if already set
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qiita_plugin=info,qiita_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
