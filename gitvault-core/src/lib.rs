//! # gitvault-core
//!
//! Core library for gitvault - every entity's content lives in its own git
//! repository, one commit per logical write, with best-effort mirroring to a
//! hosted remote.
//!
//! Most callers only need [`VersionStore`], which owns the individual
//! components and serializes mutations per repository.

pub mod config;
pub mod diff;
pub mod error;
pub mod git;
pub mod history;
pub mod locks;
pub mod models;
pub mod provision;
pub mod repository;
pub mod store;
pub mod sync;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use config::{EngineConfig, ProviderConfig};
pub use diff::{DiffLine, DiffLineType, FileDiff};
pub use error::{Error, Result};
pub use git::GitCli;
pub use history::HistoryReader;
pub use models::{
    CommitInfo, CommitResult, EntityId, EntityKind, FailureClass, Identity, LadderState,
    RemoteInfo, SyncResult,
};
pub use provision::{GithubProvider, HostingProvider, ProviderRepo, RemoteProvisioner};
pub use repository::{RepositoryHandle, RepositoryManager};
pub use store::VersionStore;
pub use sync::{RemoteOps, RemoteSynchronizer};
pub use writer::VersionWriter;
