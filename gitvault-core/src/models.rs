use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Model,
    Universal,
}

impl EntityKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Model => "model",
            EntityKind::Universal => "universal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "project" => Some(EntityKind::Project),
            "model" => Some(EntityKind::Model),
            "universal" => Some(EntityKind::Universal),
            _ => None,
        }
    }
}

/// The unit that owns exactly one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityId {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate_id(&id)?;
        Ok(Self { kind, id })
    }

    pub fn project(id: impl Into<String>) -> Result<Self> {
        Self::new(EntityKind::Project, id)
    }

    pub fn model(id: impl Into<String>) -> Result<Self> {
        Self::new(EntityKind::Model, id)
    }

    pub fn universal(id: impl Into<String>) -> Result<Self> {
        Self::new(EntityKind::Universal, id)
    }

    /// Directory of this entity's repository relative to the repository root.
    pub fn relative_dir(&self) -> PathBuf {
        PathBuf::from(self.kind.as_str()).join(&self.id)
    }

    fn validate_id(id: &str) -> Result<()> {
        let well_formed = !id.is_empty()
            && id != "."
            && id != ".."
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if well_formed {
            Ok(())
        } else {
            Err(Error::InvalidEntity(id.to_string()))
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidEntity(s.to_string()))?;
        let kind = EntityKind::parse(kind).ok_or_else(|| Error::InvalidEntity(s.to_string()))?;
        Self::new(kind, id)
    }
}

/// Name and email recorded as commit authorship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new("gitvault", "gitvault@localhost")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub hash: String,
    /// False when the content was already committed and nothing new was recorded.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub parent: Option<String>,
    pub author: String,
    pub email: String,
    pub date: DateTime<Utc>,
    pub message: String,
}

/// Coarse classification of a failed remote step. Drives the push ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Non-fast-forward or otherwise rejected by the remote.
    Rejected,
    /// The pushed ref name does not exist locally or remotely.
    BranchMismatch,
    /// Network-level failure, including timeouts.
    Unreachable,
    Other,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureClass::Rejected => "rejected",
            FailureClass::BranchMismatch => "branch mismatch",
            FailureClass::Unreachable => "unreachable",
            FailureClass::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderState {
    PushDefault,
    PullThenRetry,
    ForcePush,
    PushSecondary,
    PushCurrentBranch,
    ReconcileBranch,
    Done,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub ok: bool,
    pub skipped_no_remote: bool,
    /// Every ladder state that ran an action, in order.
    pub attempts: Vec<LadderState>,
    pub error: Option<String>,
}

impl SyncResult {
    pub fn skipped() -> Self {
        Self {
            ok: true,
            skipped_no_remote: true,
            attempts: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInfo {
    /// Remote URL with the token redacted.
    pub url: String,
    pub web_url: String,
    pub default_branch: String,
    pub sync: SyncResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_parsing() {
        let entity: EntityId = "project:doc1".parse().unwrap();
        assert_eq!(entity.kind, EntityKind::Project);
        assert_eq!(entity.id, "doc1");
        assert_eq!(entity.to_string(), "project:doc1");
        assert_eq!(entity.relative_dir(), PathBuf::from("project").join("doc1"));
    }

    #[test]
    fn test_entity_id_rejects_traversal() {
        assert!("project:..".parse::<EntityId>().is_err());
        assert!("model:a/b".parse::<EntityId>().is_err());
        assert!("model:".parse::<EntityId>().is_err());
        assert!("folder:x".parse::<EntityId>().is_err());
        assert!("doc1".parse::<EntityId>().is_err());
    }

    #[test]
    fn test_identity_display() {
        let identity = Identity::new("Ada", "ada@example.com");
        assert_eq!(identity.to_string(), "Ada <ada@example.com>");
    }
}
