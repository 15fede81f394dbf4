//! Best-effort replication of a repository's default branch to its remote.
//!
//! Pushing walks an explicit state machine. Each state performs one action and
//! picks the next state from the class of the failure it observed:
//!
//! ```text
//! PushDefault       ok -> Done | rejected -> PullThenRetry | mismatch -> PushSecondary | * -> Fail
//! PullThenRetry     ok -> PushDefault (once)               | * -> ForcePush
//! ForcePush         ok -> Done                             | * -> Fail
//! PushSecondary     ok -> Done                             | * -> PushCurrentBranch
//! PushCurrentBranch ok -> Done                             | * -> ReconcileBranch
//! ReconcileBranch   ok -> Done                             | * -> Fail
//! ```
//!
//! A failed ladder is reported in the [`SyncResult`]; it never touches the
//! local commits that were already written.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{FailureClass, LadderState, SyncResult};
use crate::repository::RepositoryHandle;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub class: FailureClass,
    pub detail: String,
}

impl From<Error> for RemoteFailure {
    fn from(err: Error) -> Self {
        let class = match &err {
            Error::Timeout { .. } => FailureClass::Unreachable,
            _ => FailureClass::Other,
        };
        Self {
            class,
            detail: err.to_string(),
        }
    }
}

pub type StepResult<T = ()> = std::result::Result<T, RemoteFailure>;

/// The VCS operations the ladder needs. [`crate::git::GitCli`] is the real
/// implementation; tests script their own.
#[async_trait]
pub trait RemoteOps: Send + Sync {
    async fn remote_url(&self, repo: &Path, remote: &str) -> Result<Option<String>>;

    async fn set_remote_url(&self, repo: &Path, remote: &str, url: &str) -> Result<()>;

    async fn push(&self, repo: &Path, remote: &str, branch: &str, force: bool) -> StepResult;

    async fn pull(&self, repo: &Path, remote: &str, branch: &str) -> StepResult;

    async fn abort_merge(&self, repo: &Path) -> Result<()>;

    async fn current_branch(&self, repo: &Path) -> StepResult<String>;

    async fn local_branch_exists(&self, repo: &Path, branch: &str) -> StepResult<bool>;

    async fn checkout(&self, repo: &Path, branch: &str, create: bool) -> StepResult;
}

#[derive(Debug, Default)]
struct LadderRun {
    attempts: Vec<LadderState>,
    pulled: bool,
    last_failure: Option<RemoteFailure>,
    failures: usize,
}

impl LadderRun {
    fn fail(&mut self, failure: RemoteFailure) {
        self.failures += 1;
        self.last_failure = Some(failure);
    }
}

pub struct RemoteSynchronizer<O> {
    ops: Arc<O>,
    remote: String,
    default_branch: String,
    secondary_branch: String,
}

impl<O: RemoteOps> RemoteSynchronizer<O> {
    pub fn new(ops: Arc<O>, config: &EngineConfig) -> Self {
        Self {
            ops,
            remote: config.remote_name.clone(),
            default_branch: config.default_branch.clone(),
            secondary_branch: config.secondary_branch.clone(),
        }
    }

    pub fn remote_name(&self) -> &str {
        &self.remote
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// Mirror the repository to its remote, if it has one.
    pub async fn sync(&self, handle: &RepositoryHandle) -> Result<SyncResult> {
        if self
            .ops
            .remote_url(handle.path(), &self.remote)
            .await?
            .is_none()
        {
            info!("no remote configured for {}, skipping sync", handle.entity());
            return Ok(SyncResult::skipped());
        }

        let result = self.run_ladder(handle.path()).await;
        if result.ok {
            info!("{} mirrored to {}", handle.entity(), self.remote);
        } else {
            warn!(
                "{} not mirrored: {}",
                handle.entity(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(result)
    }

    pub async fn run_ladder(&self, repo: &Path) -> SyncResult {
        let mut run = LadderRun::default();
        let mut state = LadderState::PushDefault;

        loop {
            match state {
                LadderState::Done => {
                    return SyncResult {
                        ok: true,
                        skipped_no_remote: false,
                        attempts: run.attempts,
                        error: None,
                    };
                }
                LadderState::Fail => {
                    let error = run
                        .last_failure
                        .map(|f| format!("{}: {}", f.class, f.detail))
                        .unwrap_or_else(|| "push ladder exhausted".to_string());
                    return SyncResult {
                        ok: false,
                        skipped_no_remote: false,
                        attempts: run.attempts,
                        error: Some(error),
                    };
                }
                _ => {}
            }

            run.attempts.push(state);
            let failures_before = run.failures;
            let next = self.step(state, repo, &mut run).await;
            let failure = match &run.last_failure {
                Some(f) if run.failures > failures_before => f.class.to_string(),
                _ => "none".to_string(),
            };
            info!(from = ?state, %failure, to = ?next, "push ladder transition");
            state = next;
        }
    }

    async fn step(&self, state: LadderState, repo: &Path, run: &mut LadderRun) -> LadderState {
        match state {
            LadderState::PushDefault => self.push_default(repo, run).await,
            LadderState::PullThenRetry => self.pull_then_retry(repo, run).await,
            LadderState::ForcePush => self.force_push(repo, run).await,
            LadderState::PushSecondary => self.push_secondary(repo, run).await,
            LadderState::PushCurrentBranch => self.push_current_branch(repo, run).await,
            LadderState::ReconcileBranch => self.reconcile_branch(repo, run).await,
            LadderState::Done | LadderState::Fail => state,
        }
    }

    async fn push_default(&self, repo: &Path, run: &mut LadderRun) -> LadderState {
        match self
            .ops
            .push(repo, &self.remote, &self.default_branch, false)
            .await
        {
            Ok(()) => LadderState::Done,
            Err(failure) => {
                let class = failure.class;
                run.fail(failure);
                match class {
                    // The merge already ran once; a second rejection means the
                    // remote keeps moving, so give up instead of overwriting it.
                    FailureClass::Rejected if run.pulled => LadderState::Fail,
                    FailureClass::Rejected => LadderState::PullThenRetry,
                    FailureClass::BranchMismatch => LadderState::PushSecondary,
                    FailureClass::Unreachable | FailureClass::Other => LadderState::Fail,
                }
            }
        }
    }

    async fn pull_then_retry(&self, repo: &Path, run: &mut LadderRun) -> LadderState {
        run.pulled = true;
        match self.ops.pull(repo, &self.remote, &self.default_branch).await {
            Ok(()) => LadderState::PushDefault,
            Err(failure) => {
                warn!(
                    "merge of {}/{} failed ({}), falling back to force push",
                    self.remote, self.default_branch, failure.class
                );
                if let Err(e) = self.ops.abort_merge(repo).await {
                    warn!("could not abort merge in {:?}: {}", repo, e);
                }
                run.fail(failure);
                LadderState::ForcePush
            }
        }
    }

    async fn force_push(&self, repo: &Path, run: &mut LadderRun) -> LadderState {
        warn!(
            "force pushing {} to {} in {:?}",
            self.default_branch, self.remote, repo
        );
        match self
            .ops
            .push(repo, &self.remote, &self.default_branch, true)
            .await
        {
            Ok(()) => LadderState::Done,
            Err(failure) => {
                run.fail(failure);
                LadderState::Fail
            }
        }
    }

    async fn push_secondary(&self, repo: &Path, run: &mut LadderRun) -> LadderState {
        match self
            .ops
            .push(repo, &self.remote, &self.secondary_branch, false)
            .await
        {
            Ok(()) => LadderState::Done,
            Err(failure) => {
                run.fail(failure);
                LadderState::PushCurrentBranch
            }
        }
    }

    async fn push_current_branch(&self, repo: &Path, run: &mut LadderRun) -> LadderState {
        let pushed = match self.ops.current_branch(repo).await {
            Ok(branch) => self.ops.push(repo, &self.remote, &branch, false).await,
            Err(failure) => Err(failure),
        };

        match pushed {
            Ok(()) => LadderState::Done,
            Err(failure) => {
                run.fail(failure);
                LadderState::ReconcileBranch
            }
        }
    }

    async fn reconcile_branch(&self, repo: &Path, run: &mut LadderRun) -> LadderState {
        let branch = &self.default_branch;
        let reconciled = match self.ops.local_branch_exists(repo, branch).await {
            Ok(exists) => self.ops.checkout(repo, branch, !exists).await,
            Err(failure) => Err(failure),
        };
        let pushed = match reconciled {
            Ok(()) => self.ops.push(repo, &self.remote, branch, false).await,
            Err(failure) => Err(failure),
        };

        match pushed {
            Ok(()) => LadderState::Done,
            Err(failure) => {
                run.fail(failure);
                LadderState::Fail
            }
        }
    }
}
