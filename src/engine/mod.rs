//! engine
//!
//! The "C6 Engine": the only component that mutates both Git and the
//! commit graph. Every public method validates preconditions against the
//! [`RepoState`](crate::core::model::RepoState), drives the Git Driver,
//! mutates the graph, and persists through the State Store before
//! returning. If the Git Driver reports a conflict, the engine records a
//! `MergeConflictState` and returns rather than unwinding with an error —
//! the next `rebase_continue` call resumes from that point.
//!
//! # Layering
//!
//! `engine` is the only module that is allowed to know about `git`,
//! `forge`, and `core` all at once. Everything above it (the CLI) talks
//! to Engine methods, never to the Git Driver or the hosted-repo provider
//! directly.

pub mod ops;
pub mod queue;

use std::path::Path;

use thiserror::Error;

use crate::core::model::{Commit, ModelError, RepoState};
use crate::core::paths::GitGudPaths;
use crate::core::state::{self, StateStoreError};
use crate::core::types::TypeError;
use crate::core::verify::BadGitGudState;
use crate::forge::{ForgeError, HostedRepoProvider};
use crate::git::{Git, GitError};

/// Errors surfaced by Engine operations (`spec.md` §7).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    StateStore(#[from] StateStoreError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    BadGitGudState(#[from] BadGitGudState),

    #[error("attempted to amend/drop/locally rebase a remote commit")]
    InvalidOperationForRemote,

    #[error("commit's pull request is already merged")]
    CommitAlreadyMerged,

    #[error("working tree must be clean for this operation")]
    DirtyWorkingTree,

    #[error("a merge conflict is already in progress; resolve it with rebase_continue")]
    ConflictInProgress,

    #[error("invalid operation: {0}")]
    ValueError(String),

    #[error("git produced output that matches no known pattern: {0}")]
    InternalError(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Coordinates the Git Driver, the hosted-repo provider, and the commit
/// graph for one tracked working directory.
pub struct Engine {
    pub(crate) git: Git,
    pub(crate) provider: Box<dyn HostedRepoProvider>,
    pub(crate) paths: GitGudPaths,
    pub(crate) state: RepoState,
}

impl Engine {
    /// Load an existing tracked repository's state and wire up a live
    /// engine around it.
    pub fn load(
        repo_dir: &Path,
        paths: GitGudPaths,
        provider: Box<dyn HostedRepoProvider>,
    ) -> Result<Self, EngineError> {
        let git = Git::open(repo_dir)?;
        let state = state::load(&paths.configs_root, repo_dir)?;
        Ok(Self {
            git,
            provider,
            paths,
            state,
        })
    }

    /// Construct an engine around a freshly-created `RepoState` (used by
    /// `init`/`clone`), persisting it immediately.
    pub fn init(
        repo_dir: &Path,
        paths: GitGudPaths,
        provider: Box<dyn HostedRepoProvider>,
        state: RepoState,
    ) -> Result<Self, EngineError> {
        let git = Git::open(repo_dir)?;
        let mut engine = Self {
            git,
            provider,
            paths,
            state,
        };
        engine.save()?;
        Ok(engine)
    }

    /// Build the initial `RepoState` for a repository `gg` has never
    /// tracked before, rooted at its current `HEAD`, and persist it. Used
    /// by the CLI's `init` verb. `config` seeds the repo's config, e.g.
    /// from the process-wide defaults file.
    pub fn bootstrap(
        repo_dir: &Path,
        paths: GitGudPaths,
        provider: Box<dyn HostedRepoProvider>,
        config: crate::core::model::Config,
    ) -> Result<Self, EngineError> {
        let git = Git::open(repo_dir)?;
        let master_branch = git.current_branch()?;
        let head_hash = crate::core::types::Oid::new(git.head_hash()?)?;

        let root_id = "root".to_string();
        let history_branch = format!("history_{root_id}");
        git.create_branch(&root_id, None)?;
        git.create_branch(&history_branch, None)?;

        let root = Commit {
            id: root_id.clone(),
            hash: head_hash,
            old_hash: None,
            description: "root".to_string(),
            parent_id: None,
            parent_hash: None,
            children: Vec::new(),
            history_branch,
            upstream_branch: None,
            // The root stands for whatever already exists upstream at the
            // moment `gg` starts tracking this repository, so its first
            // children must be free to upload against it immediately.
            uploaded: true,
            needs_evolve: false,
            remote: false,
            pull_request: None,
            snapshots: Vec::new(),
            date: crate::core::types::UtcTimestamp::now(),
        };
        let mut state = RepoState::new(repo_dir.to_path_buf(), master_branch, root);
        state.config = config;
        Self::init(repo_dir, paths, provider, state)
    }

    /// Clone `url` into `dest` with the real Git Driver, then bootstrap a
    /// fresh state around it. Used by the CLI's `clone` verb.
    pub fn clone_remote(
        url: &str,
        dest: &Path,
        paths: GitGudPaths,
        provider: Box<dyn HostedRepoProvider>,
        config: crate::core::model::Config,
    ) -> Result<Self, EngineError> {
        Git::clone_repo(url, dest)?;
        Self::bootstrap(dest, paths, provider, config)
    }

    pub fn state(&self) -> &RepoState {
        &self.state
    }

    pub(crate) fn save(&mut self) -> Result<(), EngineError> {
        state::save(&self.paths.configs_root, &self.state)?;
        Ok(())
    }

    pub(crate) fn require_no_conflict(&self) -> Result<(), EngineError> {
        if self.state.merge_conflict_state.is_some() {
            return Err(EngineError::ConflictInProgress);
        }
        Ok(())
    }

    pub(crate) fn require_clean_tree(&self) -> Result<(), EngineError> {
        if !self.git.is_clean()? {
            return Err(EngineError::DirtyWorkingTree);
        }
        Ok(())
    }
}
