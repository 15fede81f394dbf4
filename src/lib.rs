//! # gitvault
//!
//! Git-backed versioned content store. Re-exports the engine and the client SDK.

pub use gitvault_core as core;
pub use gitvault_sdk as sdk;

pub use gitvault_core::{
    CommitInfo, CommitResult, EngineConfig, EntityId, EntityKind, Error, Identity, Result,
    SyncResult, VersionStore,
};
pub use gitvault_sdk::GitvaultClient;
