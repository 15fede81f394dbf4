use crate::error::{Error, Result};
use crate::git::GitCli;
use crate::models::{CommitResult, Identity};
use crate::repository::{normalize_tracked_path, RepositoryHandle, RepositoryManager};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Writes one logical file per commit.
pub struct VersionWriter {
    manager: Arc<RepositoryManager>,
    git: Arc<GitCli>,
}

impl VersionWriter {
    pub fn new(manager: Arc<RepositoryManager>, git: Arc<GitCli>) -> Self {
        Self { manager, git }
    }

    /// Write `content` to `path` and commit exactly that path.
    ///
    /// Re-saving identical content is not an error: the most recent commit
    /// touching `path` is returned with `created == false`.
    pub async fn commit(
        &self,
        handle: &RepositoryHandle,
        path: &str,
        content: &[u8],
        message: &str,
        author: Option<&Identity>,
    ) -> Result<CommitResult> {
        let handle = self.manager.ensure(handle.entity()).await?;
        let tracked = normalize_tracked_path(path)?;
        let target = handle.path().join(&tracked);

        let write_error = |source| Error::Write {
            path: tracked.clone(),
            source,
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(write_error)?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(write_error)?;

        // Forced so the baseline ignore patterns never block a path the caller names.
        let staged = self
            .git
            .run(handle.path(), &["add", "--force", "--", &tracked])
            .await?;
        if !staged.success {
            return Err(Error::Commit {
                path: tracked,
                reason: staged.message(),
            });
        }

        self.record(&handle, &tracked, message, author).await
    }

    /// Remove `path` from the working tree and commit the removal.
    pub async fn delete(
        &self,
        handle: &RepositoryHandle,
        path: &str,
        message: &str,
        author: Option<&Identity>,
    ) -> Result<CommitResult> {
        let handle = self.manager.ensure(handle.entity()).await?;
        let tracked = normalize_tracked_path(path)?;
        let repo = handle.path();

        let known = self
            .git
            .run(repo, &["ls-files", "--error-unmatch", "--", &tracked])
            .await?;
        if !known.success {
            return Err(Error::ContentNotFound {
                path: tracked,
                commit: "HEAD".to_string(),
            });
        }

        let removed = self
            .git
            .run(repo, &["rm", "--force", "--quiet", "--", &tracked])
            .await?;
        if !removed.success {
            return Err(Error::Commit {
                path: tracked,
                reason: removed.message(),
            });
        }

        self.record(&handle, &tracked, message, author).await
    }

    async fn record(
        &self,
        handle: &RepositoryHandle,
        tracked: &str,
        message: &str,
        author: Option<&Identity>,
    ) -> Result<CommitResult> {
        let repo = handle.path();

        // Exit status 0 means the index already matches HEAD for this path.
        let pending = self
            .git
            .run(repo, &["diff", "--cached", "--quiet", "--", tracked])
            .await?;
        match pending.code {
            Some(0) => return self.unchanged(repo, tracked).await,
            Some(1) => {}
            _ => {
                return Err(Error::Commit {
                    path: tracked.to_string(),
                    reason: pending.message(),
                })
            }
        }

        let platform = self.manager.identity();
        let author = author.unwrap_or(platform);
        let date = self.git.next_commit_date(repo, &["HEAD"]).await?;
        let envs = [
            ("GIT_AUTHOR_NAME", author.name.clone()),
            ("GIT_AUTHOR_EMAIL", author.email.clone()),
            ("GIT_AUTHOR_DATE", date.clone()),
            ("GIT_COMMITTER_NAME", platform.name.clone()),
            ("GIT_COMMITTER_EMAIL", platform.email.clone()),
            ("GIT_COMMITTER_DATE", date),
        ];

        let committed = self
            .git
            .run_with(
                repo,
                &[
                    "-c",
                    "commit.gpgsign=false",
                    "commit",
                    "--quiet",
                    "--no-verify",
                    "-m",
                    message,
                    "--",
                    tracked,
                ],
                &envs,
                self.git.timeout(),
            )
            .await?;

        if !committed.success {
            let reason = committed.message();
            if reason.contains("nothing to commit") || reason.contains("no changes added") {
                return self.unchanged(repo, tracked).await;
            }

            // Leave the new content on disk but drop it from the index.
            if let Err(e) = self.git.run(repo, &["reset", "--quiet", "--", tracked]).await {
                warn!("could not unstage {} after failed commit: {}", tracked, e);
            }
            return Err(Error::Commit {
                path: tracked.to_string(),
                reason,
            });
        }

        let hash = self.git.head(repo).await?.ok_or_else(|| Error::Commit {
            path: tracked.to_string(),
            reason: "HEAD missing after commit".to_string(),
        })?;

        info!(
            "committed {} in {} as {}",
            tracked,
            handle.entity(),
            short(&hash)
        );
        Ok(CommitResult {
            hash,
            created: true,
        })
    }

    async fn unchanged(&self, repo: &Path, tracked: &str) -> Result<CommitResult> {
        let last = self
            .git
            .run_checked(repo, &["log", "-1", "--format=%H", "--", tracked])
            .await?
            .stdout_str();

        let hash = if last.is_empty() {
            self.git.head(repo).await?.unwrap_or_default()
        } else {
            last
        };

        debug!("{} unchanged, keeping {}", tracked, short(&hash));
        Ok(CommitResult {
            hash,
            created: false,
        })
    }
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}
