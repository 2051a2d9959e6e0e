//! Plugin commands
//!
//! A command couples a name and its parameter declarations with the function
//! that does the actual work. Command functions receive the client, the job
//! id, the job parameters and the output directory, and report whether they
//! succeeded and which artifacts they produced.

use async_trait::async_trait;
use qiita_client::QiitaClient;
use qiita_core::domain::artifact::ArtifactInfo;
use qiita_core::domain::job::JobParameters;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

/// What a command function reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub artifacts: Option<Vec<ArtifactInfo>>,
    pub error_message: Option<String>,
}

impl CommandOutcome {
    pub fn succeeded(artifacts: Vec<ArtifactInfo>) -> Self {
        Self {
            success: true,
            artifacts: Some(artifacts),
            error_message: None,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            artifacts: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// The function executed by a command
///
/// Returning `Err` (or panicking) is reported to the server as a failed job
/// with the error detail as message.
#[async_trait]
pub trait CommandFunction: Send + Sync {
    async fn execute(
        &self,
        client: Arc<QiitaClient>,
        job_id: String,
        parameters: JobParameters,
        output_dir: PathBuf,
    ) -> anyhow::Result<CommandOutcome>;
}

#[async_trait]
impl<F, Fut> CommandFunction for F
where
    F: Fn(Arc<QiitaClient>, String, JobParameters, PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<CommandOutcome>> + Send + 'static,
{
    async fn execute(
        &self,
        client: Arc<QiitaClient>,
        job_id: String,
        parameters: JobParameters,
        output_dir: PathBuf,
    ) -> anyhow::Result<CommandOutcome> {
        (self)(client, job_id, parameters, output_dir).await
    }
}

/// Declaration of a required command parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredParameter {
    pub parameter_type: String,
    /// Accepted subtypes, e.g. artifact types for an artifact parameter
    pub subtypes: Vec<String>,
}

/// Declaration of an optional command parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalParameter {
    pub parameter_type: String,
    pub default: String,
}

/// A plugin command
#[derive(Clone)]
pub struct QiitaCommand {
    name: String,
    description: String,
    function: Arc<dyn CommandFunction>,
    required_parameters: BTreeMap<String, RequiredParameter>,
    optional_parameters: BTreeMap<String, OptionalParameter>,
    default_parameter_sets: BTreeMap<String, HashMap<String, String>>,
}

impl QiitaCommand {
    /// Creates a command without parameter declarations
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        function: impl CommandFunction + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            function: Arc::new(function),
            required_parameters: BTreeMap::new(),
            optional_parameters: BTreeMap::new(),
            default_parameter_sets: BTreeMap::new(),
        }
    }

    /// Declares a required parameter
    pub fn with_required(
        mut self,
        name: impl Into<String>,
        parameter_type: impl Into<String>,
        subtypes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.required_parameters.insert(
            name.into(),
            RequiredParameter {
                parameter_type: parameter_type.into(),
                subtypes: subtypes.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Declares an optional parameter with its default value
    pub fn with_optional(
        mut self,
        name: impl Into<String>,
        parameter_type: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        self.optional_parameters.insert(
            name.into(),
            OptionalParameter {
                parameter_type: parameter_type.into(),
                default: default.into(),
            },
        );
        self
    }

    /// Adds a named set of parameter values
    pub fn with_default_parameter_set(
        mut self,
        name: impl Into<String>,
        values: HashMap<String, String>,
    ) -> Self {
        self.default_parameter_sets.insert(name.into(), values);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn required_parameters(&self) -> &BTreeMap<String, RequiredParameter> {
        &self.required_parameters
    }

    pub fn optional_parameters(&self) -> &BTreeMap<String, OptionalParameter> {
        &self.optional_parameters
    }

    pub fn default_parameter_sets(&self) -> &BTreeMap<String, HashMap<String, String>> {
        &self.default_parameter_sets
    }

    /// The function to execute, shareable with a spawned task
    pub fn function(&self) -> Arc<dyn CommandFunction> {
        Arc::clone(&self.function)
    }
}

impl std::fmt::Debug for QiitaCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QiitaCommand")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("required_parameters", &self.required_parameters)
            .field("optional_parameters", &self.optional_parameters)
            .field("default_parameter_sets", &self.default_parameter_sets)
            .finish_non_exhaustive()
    }
}

/// Commands of a plugin, keyed by name
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, QiitaCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing any command with the same name
    pub fn register(&mut self, command: QiitaCommand) {
        self.commands.insert(command.name.clone(), command);
    }

    pub fn get(&self, name: &str) -> Option<&QiitaCommand> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QiitaCommand> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
