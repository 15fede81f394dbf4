//! Structured invocation of the `git` executable.
//!
//! Every call passes an explicit argument vector (never a shell string), runs
//! inside the repository's working tree and is bounded by a timeout. A timed
//! out child is killed and reported as [`Error::Timeout`].

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::FailureClass;
use crate::sync::{RemoteFailure, RemoteOps, StepResult};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl GitOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Combined stdout and stderr, for matching git's human-readable messages.
    pub fn message(&self) -> String {
        format!("{}\n{}", String::from_utf8_lossy(&self.stdout), self.stderr)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
    timeout: Duration,
    network_timeout: Duration,
}

impl GitCli {
    pub fn new(binary: impl Into<String>, timeout: Duration, network_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            network_timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.git_binary.clone(),
            config.command_timeout(),
            config.network_timeout(),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(&self, repo: &Path, args: &[&str]) -> Result<GitOutput> {
        self.run_with(repo, args, &[], self.timeout).await
    }

    /// Run and turn a non-zero exit into [`Error::Git`].
    pub async fn run_checked(&self, repo: &Path, args: &[&str]) -> Result<GitOutput> {
        let output = self.run(repo, args).await?;
        if output.success {
            Ok(output)
        } else {
            Err(Error::Git {
                command: command_name(args),
                stderr: output.message(),
            })
        }
    }

    pub async fn run_with(
        &self,
        repo: &Path,
        args: &[&str],
        envs: &[(&str, String)],
        limit: Duration,
    ) -> Result<GitOutput> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let command = command_name(args);
        let started = Instant::now();
        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Ok(output) => output?,
            Err(_) => {
                warn!("git {} timed out in {:?}", command, repo);
                return Err(Error::Timeout {
                    command,
                    secs: limit.as_secs(),
                });
            }
        };

        debug!(
            command = %command,
            repo = %repo.display(),
            status = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "git invocation finished"
        );

        Ok(GitOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Hash of HEAD, or `None` while the branch is unborn.
    pub async fn head(&self, repo: &Path) -> Result<Option<String>> {
        let output = self
            .run(repo, &["rev-parse", "--verify", "--quiet", "HEAD"])
            .await?;
        Ok(output.success.then(|| output.stdout_str()))
    }

    /// Committer timestamp of `rev` in seconds since the epoch.
    pub async fn commit_timestamp(&self, repo: &Path, rev: &str) -> Result<Option<i64>> {
        let output = self
            .run(repo, &["log", "-1", "--format=%ct", rev, "--"])
            .await?;
        if !output.success {
            return Ok(None);
        }
        Ok(output.stdout_str().parse().ok())
    }

    /// A commit date no earlier than now and strictly after every rev in `after`.
    pub async fn next_commit_date(&self, repo: &Path, after: &[&str]) -> Result<String> {
        let mut secs = Utc::now().timestamp();
        for rev in after {
            if let Some(parent) = self.commit_timestamp(repo, rev).await? {
                secs = secs.max(parent + 1);
            }
        }
        Ok(format!("{} +0000", secs))
    }

    async fn remote_step(&self, repo: &Path, args: &[&str]) -> StepResult {
        self.step_with(repo, args, &[], self.network_timeout).await
    }

    async fn step_with(
        &self,
        repo: &Path,
        args: &[&str],
        envs: &[(&str, String)],
        limit: Duration,
    ) -> StepResult {
        let output = self
            .run_with(repo, args, envs, limit)
            .await
            .map_err(RemoteFailure::from)?;

        if output.success {
            Ok(())
        } else {
            let detail = output.message();
            Err(RemoteFailure {
                class: classify_failure(&detail),
                detail,
            })
        }
    }
}

#[async_trait]
impl RemoteOps for GitCli {
    async fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>> {
        let output = self.run(repo, &["remote", "get-url", remote]).await?;
        Ok(output.success.then(|| output.stdout_str()))
    }

    async fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()> {
        if self.remote_url(repo, remote).await?.is_some() {
            self.run_checked(repo, &["remote", "set-url", remote, url])
                .await?;
        } else {
            self.run_checked(repo, &["remote", "add", remote, url])
                .await?;
        }
        Ok(())
    }

    async fn push(&self, repo: &Path, remote: &str, branch: &str, force: bool) -> StepResult {
        if force {
            self.remote_step(repo, &["push", "--force", remote, branch])
                .await
        } else {
            self.remote_step(repo, &["push", remote, branch]).await
        }
    }

    /// Fetch `branch` and merge it. The merge commit is dated after both
    /// parents so history stays strictly ordered.
    async fn pull(&self, repo: &Path, remote: &str, branch: &str) -> StepResult {
        self.remote_step(repo, &["fetch", "--quiet", remote, branch])
            .await?;

        let date = self
            .next_commit_date(repo, &["HEAD", "FETCH_HEAD"])
            .await
            .map_err(RemoteFailure::from)?;
        let envs = [
            ("GIT_AUTHOR_DATE", date.clone()),
            ("GIT_COMMITTER_DATE", date),
        ];
        self.step_with(
            repo,
            &[
                "-c",
                "commit.gpgsign=false",
                "merge",
                "--no-edit",
                "--allow-unrelated-histories",
                "FETCH_HEAD",
            ],
            &envs,
            self.timeout,
        )
        .await
    }

    async fn abort_merge(&self, repo: &Path) -> Result<()> {
        let output = self.run(repo, &["merge", "--abort"]).await?;
        if !output.success {
            debug!("no merge to abort in {:?}: {}", repo, output.stderr);
        }
        Ok(())
    }

    async fn current_branch(&self, repo: &Path) -> StepResult<String> {
        let output = self
            .run(repo, &["symbolic-ref", "--quiet", "--short", "HEAD"])
            .await
            .map_err(RemoteFailure::from)?;

        let branch = output.stdout_str();
        if output.success && !branch.is_empty() {
            Ok(branch)
        } else {
            Err(RemoteFailure {
                class: FailureClass::Other,
                detail: "HEAD is detached".to_string(),
            })
        }
    }

    async fn local_branch_exists(&self, repo: &Path, branch: &str) -> StepResult<bool> {
        let reference = format!("refs/heads/{}", branch);
        let output = self
            .run(repo, &["rev-parse", "--verify", "--quiet", &reference])
            .await
            .map_err(RemoteFailure::from)?;
        Ok(output.success)
    }

    async fn checkout(&self, repo: &Path, branch: &str, create: bool) -> StepResult {
        let mut args = vec!["checkout"];
        if create {
            args.push("-b");
        }
        args.push(branch);
        let output = self.run(repo, &args).await.map_err(RemoteFailure::from)?;

        if output.success {
            Ok(())
        } else {
            Err(RemoteFailure {
                class: FailureClass::Other,
                detail: output.message(),
            })
        }
    }
}

/// Map git's push/pull diagnostics onto the ladder's failure classes.
pub fn classify_failure(message: &str) -> FailureClass {
    let message = message.to_lowercase();

    if (message.contains("src refspec") && message.contains("does not match any"))
        || message.contains("couldn't find remote ref")
    {
        return FailureClass::BranchMismatch;
    }

    if message.contains("non-fast-forward")
        || message.contains("[rejected]")
        || message.contains("fetch first")
        || message.contains("updates were rejected")
    {
        return FailureClass::Rejected;
    }

    const UNREACHABLE: [&str; 8] = [
        "could not resolve host",
        "unable to access",
        "connection refused",
        "connection timed out",
        "network is unreachable",
        "could not read from remote repository",
        "does not appear to be a git repository",
        "timed out",
    ];
    if UNREACHABLE.iter().any(|needle| message.contains(needle)) {
        return FailureClass::Unreachable;
    }

    FailureClass::Other
}

fn command_name(args: &[&str]) -> String {
    args.first().copied().unwrap_or("").to_string()
}
