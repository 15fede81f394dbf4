use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::git::GitCli;
use crate::models::{EntityId, Identity};
use quick_cache::sync::Cache;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const INITIAL_COMMIT_MESSAGE: &str = "Initialize repository";

/// A ready-to-use repository for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    entity: EntityId,
    path: PathBuf,
}

impl RepositoryHandle {
    pub(crate) fn new(entity: EntityId, path: PathBuf) -> Self {
        Self { entity, path }
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Validate a tracked path and return it in the slash-separated form git expects.
///
/// Paths must be relative, must not climb out of the working tree and must not
/// point into `.git`.
pub fn normalize_tracked_path(path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => {
                let part = part
                    .to_str()
                    .ok_or_else(|| Error::InvalidPath(path.to_string()))?;
                parts.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::InvalidPath(path.to_string()));
            }
        }
    }

    if parts.is_empty() || parts[0] == ".git" {
        return Err(Error::InvalidPath(path.to_string()));
    }

    Ok(parts.join("/"))
}

pub struct RepositoryManager {
    root: PathBuf,
    git: Arc<GitCli>,
    identity: Identity,
    default_branch: String,
    ignore_file: String,
    handles: Cache<EntityId, RepositoryHandle>,
}

impl RepositoryManager {
    pub fn new(config: &EngineConfig, git: Arc<GitCli>) -> Self {
        Self {
            root: config.root.clone(),
            git,
            identity: config.identity.clone(),
            default_branch: config.default_branch.clone(),
            ignore_file: config.ignore_file_contents(),
            handles: Cache::new(config.handle_cache_capacity),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn repository_path(&self, entity: &EntityId) -> PathBuf {
        self.root.join(entity.relative_dir())
    }

    /// Whether the entity's repository already exists on disk.
    pub fn exists(&self, entity: &EntityId) -> bool {
        self.repository_path(entity).join(".git").exists()
    }

    /// Return a handle to the entity's repository, creating it on first use.
    ///
    /// Creation makes the directory if needed, initializes a repository in
    /// place (existing files are kept), sets the platform identity, writes the
    /// baseline ignore file and records one empty commit so HEAD is always
    /// born. An existing repository is returned without further side effects.
    pub async fn ensure(&self, entity: &EntityId) -> Result<RepositoryHandle> {
        if let Some(handle) = self.handles.get(entity) {
            if handle.path.join(".git").exists() {
                return Ok(handle);
            }
        }

        let path = self.repository_path(entity);
        let handle = RepositoryHandle::new(entity.clone(), path.clone());

        if path.join(".git").exists() {
            debug!("reusing repository for {} at {:?}", entity, path);
        } else {
            self.initialize(&path)
                .await
                .map_err(|e| Error::RepositoryInit {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            info!("initialized repository for {} at {:?}", entity, path);
        }

        self.handles.insert(entity.clone(), handle.clone());
        Ok(handle)
    }

    async fn initialize(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path).await?;

        let head_ref = format!("refs/heads/{}", self.default_branch);
        self.git.run_checked(path, &["init", "--quiet"]).await?;
        self.git
            .run_checked(path, &["symbolic-ref", "HEAD", &head_ref])
            .await?;
        self.git
            .run_checked(path, &["config", "user.name", &self.identity.name])
            .await?;
        self.git
            .run_checked(path, &["config", "user.email", &self.identity.email])
            .await?;

        let ignore_path = path.join(".gitignore");
        if !ignore_path.exists() {
            tokio::fs::write(&ignore_path, &self.ignore_file).await?;
        }

        self.git
            .run_checked(
                path,
                &[
                    "-c",
                    "commit.gpgsign=false",
                    "commit",
                    "--allow-empty",
                    "--quiet",
                    "-m",
                    INITIAL_COMMIT_MESSAGE,
                ],
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{git, git_available, test_config};
    use tempfile::TempDir;

    fn manager(root: &Path) -> RepositoryManager {
        let config = test_config(root);
        RepositoryManager::new(&config, Arc::new(GitCli::from_config(&config)))
    }

    #[test]
    fn test_normalize_tracked_path() {
        assert_eq!(normalize_tracked_path("docs/a.md").unwrap(), "docs/a.md");
        assert_eq!(normalize_tracked_path("./object.json").unwrap(), "object.json");
        assert!(normalize_tracked_path("../escape").is_err());
        assert!(normalize_tracked_path("/etc/passwd").is_err());
        assert!(normalize_tracked_path(".git/config").is_err());
        assert!(normalize_tracked_path("").is_err());
        assert!(normalize_tracked_path(".").is_err());
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let manager = manager(dir.path());
        let entity = EntityId::project("doc1").unwrap();

        let first = manager.ensure(&entity).await.unwrap();
        let second = manager.ensure(&entity).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(git(first.path(), &["rev-list", "--count", "HEAD"]), "1");
        assert_eq!(git(first.path(), &["symbolic-ref", "--short", "HEAD"]), "main");
        assert_eq!(
            git(first.path(), &["log", "-1", "--format=%an <%ae>"]),
            "gitvault <gitvault@localhost>"
        );
    }

    #[tokio::test]
    async fn test_ensure_survives_fresh_manager() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let entity = EntityId::model("invoice").unwrap();

        let handle = manager(dir.path()).ensure(&entity).await.unwrap();
        manager(dir.path()).ensure(&entity).await.unwrap();

        assert_eq!(git(handle.path(), &["rev-list", "--count", "HEAD"]), "1");
        assert!(handle.path().ends_with("model/invoice"));
    }

    #[tokio::test]
    async fn test_ensure_initializes_existing_directory_in_place() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let manager = manager(dir.path());
        let entity = EntityId::universal("acme").unwrap();
        let path = manager.repository_path(&entity);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("content.json"), "{}").unwrap();
        std::fs::write(path.join(".gitignore"), "custom\n").unwrap();

        manager.ensure(&entity).await.unwrap();

        assert!(manager.exists(&entity));
        assert_eq!(std::fs::read_to_string(path.join("content.json")).unwrap(), "{}");
        assert_eq!(
            std::fs::read_to_string(path.join(".gitignore")).unwrap(),
            "custom\n"
        );
    }

    #[tokio::test]
    async fn test_ensure_writes_baseline_ignore_file() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let manager = manager(dir.path());
        let handle = manager
            .ensure(&EntityId::project("p1").unwrap())
            .await
            .unwrap();

        let ignore = std::fs::read_to_string(handle.path().join(".gitignore")).unwrap();
        assert!(ignore.lines().any(|l| l == "*.tmp"));
        assert!(ignore.lines().any(|l| l == "*.log"));
    }

    #[tokio::test]
    async fn test_ensure_surfaces_init_failure() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path()).with_git_binary("/nonexistent/git");
        let manager = RepositoryManager::new(&config, Arc::new(GitCli::from_config(&config)));

        let err = manager
            .ensure(&EntityId::project("doc1").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RepositoryInit { .. }));
    }
}
