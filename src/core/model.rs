//! core::model
//!
//! Pure data types for the commit graph: the nodes, the pull-request and
//! conflict records attached to them, and the `RepoState` document that
//! ties a whole tree together. This module has no knowledge of Git or the
//! filesystem — it is the "C4 Commit Graph Model" component: data with
//! invariants, not behavior that reaches outside the process.
//!
//! I/O-shaped queries from the original design (`comes_before`, which needs
//! `git rev-list`) live on [`crate::engine::Engine`] instead, since they
//! require the Git Driver; everything that can be answered from the graph
//! alone lives here.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Oid;

/// The current on-disk schema version for [`RepoState`].
///
/// Bumped whenever a field is added or a meaning changes in a way that an
/// older binary couldn't tolerate. Older files without a `schema_version`
/// field deserialize as version 1 (see `RepoState::default_schema_version`).
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// A commit node's stable identifier. Doubles as its branch name, so any
/// value produced by [`crate::core::naming::derive_branch_name`] or by the
/// remote-commit id format (`master@<short-hash>`) is a valid `CommitId`.
pub type CommitId = String;

/// Errors raised by pure graph-model queries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("commit not found: {0}")]
    CommitNotFound(CommitId),

    #[error("commit {0} is a remote node and has no non-remote ancestor")]
    NoNonRemoteAncestor(CommitId),
}

/// One historical state of a node, pointing into its `history_branch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub hash: Oid,
    pub description: String,
}

/// Normalized state of a pull request against a hosted-repo provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrState {
    Draft,
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrState::Draft => "DRAFT",
            PrState::Open => "OPEN",
            PrState::Closed => "CLOSED",
            PrState::Merged => "MERGED",
        };
        write!(f, "{s}")
    }
}

/// A pull request tracked against one commit node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub remote_branch: String,
    pub remote_base_branch: String,
    pub state: PrState,
    pub merged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_commit_sha: Option<Oid>,
}

/// A suspended merge conflict, recorded so a later `rebase_continue` can
/// pick up where the previous invocation left off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConflictState {
    pub current_id: CommitId,
    pub incoming_id: CommitId,
    pub files: Vec<String>,
}

/// A unit of deferred work in the operation queue. Currently only `Evolve`
/// exists, but the type stays an enum (tagged the way the rest of this
/// schema tags variants) so a future operation kind doesn't need a schema
/// migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingOperation {
    Evolve {
        base_id: CommitId,
        target_id: CommitId,
    },
}

/// Per-repository configuration, persisted as part of [`RepoState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote_branch_prefix: String,
    pub randomize_branches: bool,
    pub verbose: bool,
    pub check_commits_on_status: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_branch_prefix: "gg/".to_string(),
            randomize_branches: false,
            verbose: false,
            check_commits_on_status: true,
        }
    }
}

impl Config {
    /// Look up a config value by key, for `get_config`. Returns `None` for
    /// unknown keys.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "remote_branch_prefix" => Some(self.remote_branch_prefix.clone()),
            "randomize_branches" => Some(self.randomize_branches.to_string()),
            "verbose" => Some(self.verbose.to_string()),
            "check_commits_on_status" => Some(self.check_commits_on_status.to_string()),
            _ => None,
        }
    }

    /// Set a config value by key, for `set_config`. Returns `false` for
    /// unknown keys or unparsable values, leaving the config unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match key {
            "remote_branch_prefix" => {
                self.remote_branch_prefix = value.to_string();
                true
            }
            "randomize_branches" => match value.parse() {
                Ok(b) => {
                    self.randomize_branches = b;
                    true
                }
                Err(_) => false,
            },
            "verbose" => match value.parse() {
                Ok(b) => {
                    self.verbose = b;
                    true
                }
                Err(_) => false,
            },
            "check_commits_on_status" => match value.parse() {
                Ok(b) => {
                    self.check_commits_on_status = b;
                    true
                }
                Err(_) => false,
            },
            _ => false,
        }
    }
}

/// Metadata about the hosted repository this tree is tracked against,
/// carried alongside the graph so a `GitHub`-backed provider can be
/// reconstructed on a later invocation without re-deriving it from `git
/// remote -v` every time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoMetadata {
    pub remote_url: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
}

/// One node in the commit tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitId,
    pub hash: Oid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_hash: Option<Oid>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<Oid>,
    #[serde(default)]
    pub children: Vec<CommitId>,
    pub history_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_branch: Option<String>,
    #[serde(default)]
    pub uploaded: bool,
    #[serde(default)]
    pub needs_evolve: bool,
    #[serde(default)]
    pub remote: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequest>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    pub date: crate::core::types::UtcTimestamp,
}

impl Commit {
    /// Append a snapshot recording the node's current hash/description.
    pub fn push_snapshot(&mut self) {
        self.snapshots.push(Snapshot {
            hash: self.hash.clone(),
            description: self.description.clone(),
        });
    }
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

/// The full persisted state of a tracked working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub repo_dir: PathBuf,
    pub head_id: CommitId,
    pub root_id: CommitId,
    pub commits: BTreeMap<CommitId, Commit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_conflict_state: Option<MergeConflictState>,
    #[serde(default)]
    pub pending_operations: VecDeque<PendingOperation>,
    pub master_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_metadata: Option<RepoMetadata>,
    #[serde(default)]
    pub config: Config,
}

impl RepoState {
    /// Create a brand-new state around a single root commit.
    pub fn new(repo_dir: PathBuf, master_branch: String, root: Commit) -> Self {
        let root_id = root.id.clone();
        let mut commits = BTreeMap::new();
        commits.insert(root_id.clone(), root);
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            repo_dir,
            head_id: root_id.clone(),
            root_id,
            commits,
            merge_conflict_state: None,
            pending_operations: VecDeque::new(),
            master_branch,
            repo_metadata: None,
            config: Config::default(),
        }
    }

    pub fn get_commit(&self, id: &str) -> Result<&Commit, ModelError> {
        self.commits
            .get(id)
            .ok_or_else(|| ModelError::CommitNotFound(id.to_string()))
    }

    pub fn get_commit_mut(&mut self, id: &str) -> Result<&mut Commit, ModelError> {
        self.commits
            .get_mut(id)
            .ok_or_else(|| ModelError::CommitNotFound(id.to_string()))
    }

    pub fn root(&self) -> &Commit {
        self.get_commit(&self.root_id)
            .expect("root_id always names an existing commit")
    }

    pub fn head(&self) -> &Commit {
        self.get_commit(&self.head_id)
            .expect("head_id always names an existing commit")
    }

    /// For every node, walk its `parent_id` chain to the end and collect the
    /// distinct terminal ids reached. In a well-formed graph this is always
    /// `{root_id}`; used only for diagnostics (`get_bad_states`).
    pub fn get_roots(&self) -> Vec<CommitId> {
        let mut roots = HashSet::new();
        for id in self.commits.keys() {
            let mut current = id.as_str();
            let mut guard = 0usize;
            loop {
                guard += 1;
                if guard > self.commits.len() + 1 {
                    // A cycle; stop rather than loop forever. check_state
                    // reports cycles separately.
                    break;
                }
                match self.commits.get(current).and_then(|c| c.parent_id.as_deref()) {
                    Some(parent) => current = parent,
                    None => {
                        roots.insert(current.to_string());
                        break;
                    }
                }
            }
        }
        roots.into_iter().collect()
    }

    /// Pre-order traversal of `id`'s descendants (children lists are
    /// ordered, so this order is deterministic). `skip_self` omits `id`
    /// itself from the result.
    pub fn traverse(&self, id: &str, skip_self: bool) -> Result<Vec<CommitId>, ModelError> {
        self.get_commit(id)?;
        let mut out = Vec::new();
        let mut stack = vec![id.to_string()];
        let mut first = true;
        while let Some(current) = stack.pop() {
            let node = self.get_commit(&current)?;
            if !(first && skip_self) {
                out.push(current.clone());
            }
            first = false;
            // Push children in reverse so pre-order pops them in original order.
            for child in node.children.iter().rev() {
                stack.push(child.clone());
            }
        }
        Ok(out)
    }

    /// Climb `id`'s parent chain until the parent is remote (or absent),
    /// returning the first non-remote ancestor reached (`id` itself if it
    /// is already non-remote and has no further non-remote ancestor work to
    /// do). Fails if `id` itself is remote.
    pub fn get_oldest_non_remote(&self, id: &str) -> Result<CommitId, ModelError> {
        let start = self.get_commit(id)?;
        if start.remote {
            return Err(ModelError::NoNonRemoteAncestor(id.to_string()));
        }
        let mut current = start;
        loop {
            match current.parent_id.as_deref() {
                Some(parent_id) => {
                    let parent = self.get_commit(parent_id)?;
                    if parent.remote {
                        return Ok(current.id.clone());
                    }
                    current = parent;
                }
                None => return Ok(current.id.clone()),
            }
        }
    }

    /// All distinct oldest-non-remote ancestors across every commit in the
    /// graph, used by `sync(all=true)`.
    pub fn all_oldest_non_remote_ancestors(&self) -> Vec<CommitId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in self.commits.keys() {
            if self.get_commit(id).map(|c| c.remote).unwrap_or(false) {
                continue;
            }
            if let Ok(oldest) = self.get_oldest_non_remote(id) {
                if seen.insert(oldest.clone()) {
                    out.push(oldest);
                }
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) fn test_commit(id: &str, parent_id: Option<&str>, hash: &str) -> Commit {
    Commit {
        id: id.to_string(),
        hash: Oid::new(hash).unwrap(),
        old_hash: None,
        description: format!("commit {id}"),
        parent_id: parent_id.map(|s| s.to_string()),
        parent_hash: None,
        children: Vec::new(),
        history_branch: format!("history_{id}"),
        upstream_branch: None,
        uploaded: false,
        needs_evolve: false,
        remote: false,
        pull_request: None,
        snapshots: Vec::new(),
        date: crate::core::types::UtcTimestamp::now(),
    }
}
