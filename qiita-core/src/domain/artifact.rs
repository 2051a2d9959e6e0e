//! Artifact domain types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Output artifact produced by a command
///
/// `files` holds `(filepath, filepath type)` pairs. Two artifacts are equal when
/// they share output name and artifact type and contain the same files, in any
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// The command's output name, unique within a job
    pub output_name: String,
    /// Qiita's artifact type (e.g. "BIOM")
    pub artifact_type: String,
    /// Files that form the artifact
    pub files: Vec<(String, String)>,
}

impl ArtifactInfo {
    pub fn new<P, T>(
        output_name: impl Into<String>,
        artifact_type: impl Into<String>,
        files: impl IntoIterator<Item = (P, T)>,
    ) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        Self {
            output_name: output_name.into(),
            artifact_type: artifact_type.into(),
            files: files
                .into_iter()
                .map(|(path, file_type)| (path.into(), file_type.into()))
                .collect(),
        }
    }

    fn file_set(&self) -> HashSet<(&str, &str)> {
        self.files
            .iter()
            .map(|(path, file_type)| (path.as_str(), file_type.as_str()))
            .collect()
    }
}

impl PartialEq for ArtifactInfo {
    fn eq(&self, other: &Self) -> bool {
        self.output_name == other.output_name
            && self.artifact_type == other.artifact_type
            && self.file_set() == other.file_set()
    }
}

impl Eq for ArtifactInfo {}
