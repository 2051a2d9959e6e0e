//! Job DTOs for communication with the server

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::artifact::ArtifactInfo;

/// Artifact entry of a completion payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPayload {
    pub artifact_type: String,
    pub filepaths: Vec<(String, String)>,
}

/// Final message reporting the outcome of a job
///
/// `error` is always empty on success and `artifacts` is always `None` on
/// failure, whatever the caller passed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub success: bool,
    pub error: String,
    pub artifacts: Option<BTreeMap<String, ArtifactPayload>>,
}

impl CompletionPayload {
    /// Builds the payload for a finished job
    ///
    /// # Arguments
    /// * `success` - Whether the job completed successfully
    /// * `error_msg` - Failure detail, ignored when `success` is true
    /// * `artifacts` - Produced artifacts, ignored when `success` is false
    pub fn new(success: bool, error_msg: Option<&str>, artifacts: Option<&[ArtifactInfo]>) -> Self {
        let artifacts = match artifacts {
            Some(infos) if success && !infos.is_empty() => Some(
                infos
                    .iter()
                    .map(|info| {
                        (
                            info.output_name.clone(),
                            ArtifactPayload {
                                artifact_type: info.artifact_type.clone(),
                                filepaths: info.files.clone(),
                            },
                        )
                    })
                    .collect(),
            ),
            _ => None,
        };

        let error = if success {
            String::new()
        } else {
            error_msg.unwrap_or_default().to_string()
        };

        Self {
            success,
            error,
            artifacts,
        }
    }
}

/// Request to update the current step of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepUpdate {
    pub step: String,
}
