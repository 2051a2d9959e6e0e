//! JSON PATCH request bodies (RFC 6902 shaped)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operation of a PATCH request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl PatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
            PatchOp::Replace => "replace",
            PatchOp::Move => "move",
            PatchOp::Copy => "copy",
            PatchOp::Test => "test",
        }
    }

    /// Operations that need a `value`
    pub fn requires_value(&self) -> bool {
        matches!(self, PatchOp::Add | PatchOp::Replace | PatchOp::Test)
    }

    /// Operations that need a `from` path
    pub fn requires_from(&self) -> bool {
        matches!(self, PatchOp::Move | PatchOp::Copy)
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(PatchOp::Add),
            "remove" => Ok(PatchOp::Remove),
            "replace" => Ok(PatchOp::Replace),
            "move" => Ok(PatchOp::Move),
            "copy" => Ok(PatchOp::Copy),
            "test" => Ok(PatchOp::Test),
            other => Err(format!("Unknown patch operation '{}'", other)),
        }
    }
}

/// Body of a PATCH request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub op: PatchOp,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_op_requirements() {
        for op in [PatchOp::Add, PatchOp::Replace, PatchOp::Test] {
            assert!(op.requires_value());
            assert!(!op.requires_from());
        }
        for op in [PatchOp::Move, PatchOp::Copy] {
            assert!(op.requires_from());
            assert!(!op.requires_value());
        }
        assert!(!PatchOp::Remove.requires_value());
        assert!(!PatchOp::Remove.requires_from());
    }

    #[test]
    fn test_op_parse() {
        assert_eq!("copy".parse::<PatchOp>(), Ok(PatchOp::Copy));
        assert!("merge".parse::<PatchOp>().is_err());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let req = PatchRequest {
            op: PatchOp::Remove,
            path: "/x".to_string(),
            value: None,
            from: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"op": "remove", "path": "/x"})
        );
    }

    #[test]
    fn test_from_is_serialized_when_present() {
        let req = PatchRequest {
            op: PatchOp::Move,
            path: "/b".to_string(),
            value: None,
            from: Some("/a".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"op": "move", "path": "/b", "from": "/a"})
        );
    }
}
