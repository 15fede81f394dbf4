//! The engine as callers see it.
//!
//! [`VersionStore`] wires the components together over one shared [`GitCli`]
//! and serializes every mutation of a repository behind its [`RepoLocks`]
//! entry, so callers do not have to coordinate writes themselves.

use crate::config::EngineConfig;
use crate::diff::FileDiff;
use crate::error::Result;
use crate::git::GitCli;
use crate::history::HistoryReader;
use crate::locks::RepoLocks;
use crate::models::{CommitInfo, CommitResult, EntityId, Identity, RemoteInfo, SyncResult};
use crate::provision::{GithubProvider, HostingProvider, RemoteProvisioner};
use crate::repository::{RepositoryHandle, RepositoryManager};
use crate::sync::RemoteSynchronizer;
use crate::writer::VersionWriter;
use std::sync::Arc;
use tracing::debug;

pub struct VersionStore {
    config: EngineConfig,
    manager: Arc<RepositoryManager>,
    writer: VersionWriter,
    reader: HistoryReader,
    synchronizer: Arc<RemoteSynchronizer<GitCli>>,
    provisioner: RemoteProvisioner<dyn HostingProvider, GitCli>,
    locks: RepoLocks,
}

impl VersionStore {
    /// Build a store that provisions remotes through the configured GitHub API.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let provider = GithubProvider::new(&config.provider)?;
        Self::with_provider(config, Arc::new(provider))
    }

    pub fn with_provider(config: EngineConfig, provider: Arc<dyn HostingProvider>) -> Result<Self> {
        config.validate()?;

        let git = Arc::new(GitCli::from_config(&config));
        let manager = Arc::new(RepositoryManager::new(&config, Arc::clone(&git)));
        let synchronizer = Arc::new(RemoteSynchronizer::new(Arc::clone(&git), &config));
        let provisioner = RemoteProvisioner::new(
            provider,
            Arc::clone(&git),
            Arc::clone(&synchronizer),
            config.provider.private,
        );

        debug!("version store rooted at {:?}", config.root);
        Ok(Self {
            writer: VersionWriter::new(Arc::clone(&manager), Arc::clone(&git)),
            reader: HistoryReader::new(git),
            manager,
            synchronizer,
            provisioner,
            locks: RepoLocks::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn manager(&self) -> &RepositoryManager {
        &self.manager
    }

    pub async fn ensure(&self, entity: &EntityId) -> Result<RepositoryHandle> {
        let _guard = self.locks.write(entity).await;
        self.manager.ensure(entity).await
    }

    pub async fn commit(
        &self,
        entity: &EntityId,
        path: &str,
        content: &[u8],
        message: &str,
        author: Option<&Identity>,
    ) -> Result<CommitResult> {
        let _guard = self.locks.write(entity).await;
        let handle = self.manager.ensure(entity).await?;
        self.writer
            .commit(&handle, path, content, message, author)
            .await
    }

    pub async fn delete(
        &self,
        entity: &EntityId,
        path: &str,
        message: &str,
        author: Option<&Identity>,
    ) -> Result<CommitResult> {
        let _guard = self.locks.write(entity).await;
        let handle = self.manager.ensure(entity).await?;
        self.writer.delete(&handle, path, message, author).await
    }

    pub async fn sync(&self, entity: &EntityId) -> Result<SyncResult> {
        let _guard = self.locks.write(entity).await;
        let handle = self.manager.ensure(entity).await?;
        self.synchronizer.sync(&handle).await
    }

    pub async fn attach(
        &self,
        entity: &EntityId,
        token: &str,
        desired_name: &str,
        existing_url: Option<&str>,
    ) -> Result<RemoteInfo> {
        let _guard = self.locks.write(entity).await;
        let handle = self.manager.ensure(entity).await?;
        self.provisioner
            .attach(&handle, token, desired_name, existing_url)
            .await
    }

    pub async fn log(&self, entity: &EntityId, path: &str) -> Result<Vec<CommitInfo>> {
        let handle = self.ensure(entity).await?;
        let _guard = self.locks.read(entity).await;
        self.reader.log(&handle, path).await
    }

    pub async fn log_all(&self, entity: &EntityId) -> Result<Vec<CommitInfo>> {
        let handle = self.ensure(entity).await?;
        let _guard = self.locks.read(entity).await;
        self.reader.log_all(&handle).await
    }

    pub async fn head(&self, entity: &EntityId) -> Result<Option<String>> {
        let handle = self.ensure(entity).await?;
        let _guard = self.locks.read(entity).await;
        self.reader.head(&handle).await
    }

    pub async fn read_at(
        &self,
        entity: &EntityId,
        path: &str,
        commit: Option<&str>,
    ) -> Result<Vec<u8>> {
        let handle = self.ensure(entity).await?;
        let _guard = self.locks.read(entity).await;
        self.reader.read_at(&handle, path, commit).await
    }

    pub async fn diff(
        &self,
        entity: &EntityId,
        path: &str,
        from: &str,
        to: &str,
    ) -> Result<String> {
        let handle = self.ensure(entity).await?;
        let _guard = self.locks.read(entity).await;
        self.reader.diff(&handle, path, from, to).await
    }

    pub async fn file_diff(
        &self,
        entity: &EntityId,
        path: &str,
        from: &str,
        to: &str,
    ) -> Result<FileDiff> {
        let handle = self.ensure(entity).await?;
        let _guard = self.locks.read(entity).await;
        self.reader.file_diff(&handle, path, from, to).await
    }
}
