//! Job domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameters of a job, keyed by parameter name
pub type JobParameters = HashMap<String, serde_json::Value>;

/// Job information as returned by the server
///
/// Fetched on demand before dispatching a job and discarded afterwards; the
/// client never keeps a durable copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Name of the command the job must execute
    pub command: String,
    /// Values for the command parameters
    #[serde(default)]
    pub parameters: JobParameters,
    /// Server-side status (e.g. "queued", "running")
    #[serde(default)]
    pub status: Option<String>,
}
