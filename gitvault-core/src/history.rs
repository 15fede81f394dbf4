use crate::diff::FileDiff;
use crate::error::{Error, Result};
use crate::git::GitCli;
use crate::models::CommitInfo;
use crate::repository::{normalize_tracked_path, RepositoryHandle};
use chrono::DateTime;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';
const LOG_FORMAT: &str = "--format=%H%x1f%P%x1f%an%x1f%ae%x1f%ct%x1f%B%x1e";
const DIFF_CONTEXT_LINES: usize = 3;

/// Read-only access to a repository's history. Nothing here mutates the
/// working tree or the index.
pub struct HistoryReader {
    git: Arc<GitCli>,
}

impl HistoryReader {
    pub fn new(git: Arc<GitCli>) -> Self {
        Self { git }
    }

    /// Commits touching `path`, newest first, following renames.
    ///
    /// A path that was never committed yields an empty list.
    pub async fn log(&self, handle: &RepositoryHandle, path: &str) -> Result<Vec<CommitInfo>> {
        let tracked = normalize_tracked_path(path)?;
        self.read_log(handle.path(), &["log", "--follow", LOG_FORMAT, "--", &tracked])
            .await
    }

    /// Every commit in the repository, newest first.
    pub async fn log_all(&self, handle: &RepositoryHandle) -> Result<Vec<CommitInfo>> {
        self.read_log(handle.path(), &["log", LOG_FORMAT]).await
    }

    pub async fn head(&self, handle: &RepositoryHandle) -> Result<Option<String>> {
        self.git.head(handle.path()).await
    }

    /// Content of `path` at `commit`, or at HEAD when `commit` is `None`.
    pub async fn read_at(
        &self,
        handle: &RepositoryHandle,
        path: &str,
        commit: Option<&str>,
    ) -> Result<Vec<u8>> {
        let tracked = normalize_tracked_path(path)?;
        let rev = commit.unwrap_or("HEAD");
        self.read_optional(handle.path(), &tracked, rev)
            .await?
            .ok_or_else(|| Error::ContentNotFound {
                path: tracked,
                commit: rev.to_string(),
            })
    }

    /// Unified diff of `path` between two commits; empty when the contents match.
    pub async fn diff(
        &self,
        handle: &RepositoryHandle,
        path: &str,
        from: &str,
        to: &str,
    ) -> Result<String> {
        Ok(self
            .file_diff(handle, path, from, to)
            .await?
            .format_unified(DIFF_CONTEXT_LINES))
    }

    /// Structured form of [`HistoryReader::diff`].
    pub async fn file_diff(
        &self,
        handle: &RepositoryHandle,
        path: &str,
        from: &str,
        to: &str,
    ) -> Result<FileDiff> {
        let tracked = normalize_tracked_path(path)?;
        let old = self.read_optional(handle.path(), &tracked, from).await?;
        let new = self.read_optional(handle.path(), &tracked, to).await?;

        if old.is_none() && new.is_none() {
            return Err(Error::ContentNotFound {
                path: tracked,
                commit: format!("{}..{}", from, to),
            });
        }

        Ok(FileDiff::between(&tracked, old.as_deref(), new.as_deref()))
    }

    async fn read_optional(
        &self,
        repo: &Path,
        tracked: &str,
        rev: &str,
    ) -> Result<Option<Vec<u8>>> {
        let commit = self.resolve_commit(repo, rev).await?;
        let object = format!("{}:{}", commit, tracked);
        let output = self.git.run(repo, &["cat-file", "blob", &object]).await?;

        if output.success {
            Ok(Some(output.stdout))
        } else {
            debug!("{} absent at {}: {}", tracked, rev, output.stderr);
            Ok(None)
        }
    }

    async fn resolve_commit(&self, repo: &Path, rev: &str) -> Result<String> {
        if rev.is_empty() || rev.starts_with('-') {
            return Err(Error::CommitNotFound(rev.to_string()));
        }

        let target = format!("{}^{{commit}}", rev);
        let output = self
            .git
            .run(repo, &["rev-parse", "--verify", "--quiet", &target])
            .await?;

        if output.success {
            Ok(output.stdout_str())
        } else {
            Err(Error::CommitNotFound(rev.to_string()))
        }
    }

    async fn read_log(&self, repo: &Path, args: &[&str]) -> Result<Vec<CommitInfo>> {
        let output = self.git.run(repo, args).await?;
        if !output.success {
            debug!("history unavailable in {:?}: {}", repo, output.stderr);
            return Ok(Vec::new());
        }

        Ok(parse_log(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_log(raw: &str) -> Vec<CommitInfo> {
    raw.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            if record.trim().is_empty() {
                return None;
            }

            let mut fields = record.splitn(6, FIELD_SEP);
            let hash = fields.next()?.to_string();
            let parent = fields
                .next()?
                .split_whitespace()
                .next()
                .map(str::to_string);
            let author = fields.next()?.to_string();
            let email = fields.next()?.to_string();
            let date = DateTime::from_timestamp(fields.next()?.parse().ok()?, 0)?;
            let message = fields.next().unwrap_or("").trim_end().to_string();

            Some(CommitInfo {
                hash,
                parent,
                author,
                email,
                date,
                message,
            })
        })
        .collect()
}
