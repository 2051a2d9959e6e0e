//! Qiita Plugin Runtime
//!
//! Runs a single Qiita job on behalf of a plugin.
//!
//! Architecture:
//! - Configuration: client credentials from a config file or the environment
//! - Commands: the plugin's command table, keyed by command name
//! - Coordinator: fetches the job, keeps it alive with heartbeats, runs the
//!   command and reports completion
//! - Launcher: command-line entry point used by plugin binaries
//!
//! A plugin binary registers its commands and hands control to the launcher:
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use qiita_client::{JobParameters, QiitaClient};
//! use qiita_plugin::{CommandOutcome, QiitaCommand, QiitaPlugin};
//!
//! async fn pick_otus(
//!     _client: Arc<QiitaClient>,
//!     _job_id: String,
//!     _parameters: JobParameters,
//!     _output_dir: PathBuf,
//! ) -> anyhow::Result<CommandOutcome> {
//!     Ok(CommandOutcome::succeeded(Vec::new()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut plugin = QiitaPlugin::new("Target Gene", "0.1.0", "Target gene processing");
//!     plugin.register_command(QiitaCommand::new(
//!         "Pick closed-reference OTUs",
//!         "OTU picking against a reference database",
//!         pick_otus,
//!     ));
//!     plugin.launch().await
//! }
//! ```

pub mod command;
pub mod config;
pub mod coordinator;
pub mod launcher;

pub use command::{
    CommandFunction, CommandOutcome, CommandRegistry, OptionalParameter, QiitaCommand,
    RequiredParameter,
};
pub use config::Config;
pub use coordinator::{
    HeartbeatStatus, Installer, JobReport, PluginError, QiitaPlugin, REGISTER_JOB_ID, RunReport,
};
pub use launcher::PluginArgs;
