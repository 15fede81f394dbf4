//! # gitvault-server
//!
//! HTTP service in front of the gitvault engine. It numbers versions, refuses
//! duplicate content within an entity and mirrors to remotes in the background.

pub mod api;
pub mod ledger;
pub mod server;

pub use api::{create_router, AppState};
pub use ledger::{Ledger, VersionRecord};
pub use server::GitvaultServer;
