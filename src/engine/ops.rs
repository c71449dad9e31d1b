//! engine::ops
//!
//! The Engine's operation surface (`spec.md` §4.6): commit, amend, evolve,
//! rebase, squash, sync, upload, patch, snapshot/restore, drop, and the
//! diagnostics that back `get_bad_states`/`check_state`.

use crate::core::model::{
    Commit, CommitId, MergeConflictState, PendingOperation, PrState, PullRequest, RepoMetadata,
};
use crate::core::types::{Oid, UtcTimestamp};
use crate::core::verify::{self, BadGitGudState, BadState};
use crate::engine::{Engine, EngineError};
use crate::git::{GitError, GitFailureKind};

fn history_branch_name(id: &str) -> String {
    format!("history_{id}")
}

impl Engine {
    // -----------------------------------------------------------------
    // 4.6.1 Commit
    // -----------------------------------------------------------------

    pub fn commit(&mut self, message: &str, all: bool) -> Result<CommitId, EngineError> {
        self.require_no_conflict()?;

        let branch_name = crate::core::naming::derive_branch_name(
            message,
            self.state.config.randomize_branches,
        );
        let head = self.state.head().clone();

        self.git.create_branch(&branch_name, None)?;
        self.git.checkout(&branch_name, true)?;
        if all {
            self.git.add_all()?;
        }
        self.git.commit(message, false, false)?;
        let hash = Oid::new(self.git.head_hash()?)?;

        let history_branch = history_branch_name(&branch_name);
        self.git.create_branch(&history_branch, None)?;

        let mut node = Commit {
            id: branch_name.clone(),
            hash,
            old_hash: None,
            description: message.to_string(),
            parent_id: Some(head.id.clone()),
            parent_hash: Some(head.hash.clone()),
            children: Vec::new(),
            history_branch,
            upstream_branch: None,
            uploaded: false,
            needs_evolve: false,
            remote: false,
            pull_request: None,
            snapshots: Vec::new(),
            date: UtcTimestamp::now(),
        };
        node.push_snapshot();

        self.state
            .get_commit_mut(&head.id)?
            .children
            .push(branch_name.clone());
        self.state.commits.insert(branch_name.clone(), node);
        self.state.head_id = branch_name.clone();

        self.save()?;
        Ok(branch_name)
    }

    // -----------------------------------------------------------------
    // 4.6.2 Amend
    // -----------------------------------------------------------------

    pub fn amend(&mut self, message: Option<&str>, all: bool) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let head = self.state.head().clone();

        if head.remote {
            return Err(EngineError::InvalidOperationForRemote);
        }
        if matches!(&head.pull_request, Some(pr) if pr.state == PrState::Merged) {
            return Err(EngineError::CommitAlreadyMerged);
        }

        self.git.checkout(&head.id, true)?;
        if all {
            self.git.add_all()?;
        }
        let message = message.unwrap_or(&head.description).to_string();
        self.git.commit(&message, true, true)?;
        let new_hash = Oid::new(self.git.head_hash()?)?;

        for id in self.state.traverse(&head.id, true)? {
            let node = self.state.get_commit_mut(&id)?;
            if !node.remote {
                node.needs_evolve = true;
            }
        }

        let node = self.state.get_commit_mut(&head.id)?;
        node.old_hash = Some(node.hash.clone());
        node.hash = new_hash;
        node.description = message;
        node.uploaded = false;
        node.push_snapshot();

        self.save()
    }

    // -----------------------------------------------------------------
    // 4.6.3 Evolve
    // -----------------------------------------------------------------

    /// Targeted evolve: rebase `child_id` onto the current head.
    pub fn evolve_child(&mut self, child_id: &str) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let head_id = self.state.head_id.clone();
        self.run_evolve_step(&head_id, child_id)
    }

    /// Recursive evolve: propagate the current head's new content through
    /// every descendant flagged `needs_evolve`.
    pub fn evolve(&mut self) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let head_id = self.state.head_id.clone();

        for id in self.state.traverse(&head_id, false)? {
            let node = self.state.get_commit(&id)?.clone();
            for child_id in &node.children {
                let child = self.state.get_commit(child_id)?;
                if !child.remote && child.needs_evolve {
                    self.enqueue(PendingOperation::Evolve {
                        base_id: id.clone(),
                        target_id: child_id.clone(),
                    });
                }
            }
        }

        self.save()?;
        self.drain_queue()?;
        self.save()
    }

    pub(crate) fn run_evolve_step(
        &mut self,
        base_id: &str,
        target_id: &str,
    ) -> Result<(), EngineError> {
        let base = self.state.get_commit(base_id)?.clone();
        let target = self.state.get_commit(target_id)?.clone();
        let old_base = target
            .parent_hash
            .clone()
            .unwrap_or_else(|| base.hash.clone());

        match self
            .git
            .rebase_onto(base.hash.as_str(), old_base.as_str(), &target.id)
        {
            Ok(_) => {
                let msg = format!("evolve {target_id}");
                self.continue_evolve(base_id, target_id, &msg)
            }
            Err(GitError::Command(cmd)) => match cmd.kind {
                GitFailureKind::Conflict(files) => {
                    self.state.merge_conflict_state = Some(MergeConflictState {
                        current_id: base_id.to_string(),
                        incoming_id: target_id.to_string(),
                        files,
                    });
                    self.save()
                }
                GitFailureKind::Unknown => Err(EngineError::InternalError(cmd.to_string())),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// 4.6.11 Continue-evolve: after a successful (or just-resolved) rebase
    /// step, fix up links, refresh the child's hash, fold the parent's
    /// history branch into the child's, snapshot, and drain the queue.
    pub(crate) fn continue_evolve(
        &mut self,
        parent_id: &str,
        child_id: &str,
        msg: &str,
    ) -> Result<(), EngineError> {
        self.relink(child_id, parent_id)?;

        self.git.checkout(child_id, true)?;
        let new_hash = Oid::new(self.git.head_hash()?)?;
        {
            let child = self.state.get_commit_mut(child_id)?;
            child.hash = new_hash;
            child.needs_evolve = false;
            child.uploaded = false;
        }

        let parent_history = self.state.get_commit(parent_id)?.history_branch.clone();
        let child_history = self.state.get_commit(child_id)?.history_branch.clone();

        self.git.checkout(&child_history, true)?;
        match self.git.merge_no_commit(&parent_history) {
            Ok(_) => {
                if self.git.has_staged_changes()? {
                    self.git.commit(msg, false, false)?;
                }
            }
            Err(GitError::Command(cmd)) if matches!(cmd.kind, GitFailureKind::Conflict(_)) => {
                // Force-take the child's own tree rather than try to
                // reconcile the two histories, then re-copy its actual
                // current state so the history branch matches exactly.
                self.git.checkout_tree(child_id)?;
                self.git.add_all()?;
                self.git.commit(msg, false, false)?;
                self.copy_branch_state(child_id, &child_history)?;
                self.git.commit(msg, true, true)?;
            }
            Err(e) => return Err(e.into()),
        }

        self.git.checkout(child_id, true)?;
        self.state.get_commit_mut(child_id)?.push_snapshot();
        self.save()?;
        self.drain_queue()
    }

    /// Resume after the user has resolved a rebase conflict on disk.
    pub fn rebase_continue(&mut self) -> Result<(), EngineError> {
        let conflict = self
            .state
            .merge_conflict_state
            .clone()
            .ok_or_else(|| EngineError::ValueError("no merge conflict is in progress".into()))?;

        self.git.add_all()?;
        match self.git.rebase_continue() {
            Ok(_) => {
                self.state.merge_conflict_state = None;
                let msg = format!("evolve {}", conflict.incoming_id);
                self.continue_evolve(&conflict.current_id, &conflict.incoming_id, &msg)
            }
            Err(GitError::Command(cmd)) => match cmd.kind {
                GitFailureKind::Conflict(files) => {
                    self.state.merge_conflict_state = Some(MergeConflictState { files, ..conflict });
                    self.save()
                }
                GitFailureKind::Unknown => Err(EngineError::InternalError(cmd.to_string())),
            },
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------
    // Graph link maintenance shared by rebase/squash/evolve/prune
    // -----------------------------------------------------------------

    pub(crate) fn relink(&mut self, child_id: &str, new_parent_id: &str) -> Result<(), EngineError> {
        let old_parent_id = self.state.get_commit(child_id)?.parent_id.clone();
        if let Some(old_parent_id) = &old_parent_id {
            if old_parent_id != new_parent_id {
                if let Some(old_parent) = self.state.commits.get_mut(old_parent_id) {
                    old_parent.children.retain(|c| c != child_id);
                }
            }
        }
        let new_parent_hash = self.state.get_commit(new_parent_id)?.hash.clone();
        let new_parent = self.state.get_commit_mut(new_parent_id)?;
        if !new_parent.children.iter().any(|c| c == child_id) {
            new_parent.children.push(child_id.to_string());
        }
        let child = self.state.get_commit_mut(child_id)?;
        child.parent_id = Some(new_parent_id.to_string());
        child.parent_hash = Some(new_parent_hash);
        Ok(())
    }

    /// `_copy_branch_state`: overwrite `dest`'s tree with `source`'s tree
    /// while keeping `dest`'s commit identity — create a temp branch at
    /// `source`, soft-reset it onto `dest`, then rename it to `dest`. The
    /// caller is left on `dest` with the new tree staged, uncommitted.
    pub(crate) fn copy_branch_state(&self, source: &str, dest: &str) -> Result<(), EngineError> {
        let temp = format!("__gg_copy_{dest}");
        self.git.switch_force(&temp, source)?;
        self.git.soft_reset(dest)?;
        self.git.rename_branch(&temp, dest)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // update
    // -----------------------------------------------------------------

    pub fn update(&mut self, id: &str) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        self.state.get_commit(id)?;
        self.git.checkout(id, true)?;
        self.state.head_id = id.to_string();
        self.save()
    }

    // -----------------------------------------------------------------
    // 4.6.4 Rebase
    // -----------------------------------------------------------------

    pub fn rebase(&mut self, source_id: &str, dest_id: &str) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let source = self.state.get_commit(source_id)?.clone();
        let dest = self.state.get_commit(dest_id)?.clone();

        if source.remote {
            if !dest.remote {
                return Err(EngineError::InvalidOperationForRemote);
            }
            if !self.comes_before(dest_id, source_id)? {
                return Err(EngineError::ValueError(format!(
                    "{dest_id} does not come before {source_id}; a remote rebase must move forward in time"
                )));
            }
            self.relink(source_id, dest_id)?;
            return self.save();
        }

        for id in self.state.traverse(source_id, true)? {
            let node = self.state.get_commit_mut(&id)?;
            if !node.remote {
                node.needs_evolve = true;
            }
        }

        let old_base = source.parent_hash.clone().ok_or_else(|| {
            EngineError::ValueError(format!("{source_id} has no parent and cannot be rebased"))
        })?;

        match self
            .git
            .rebase_onto(dest.hash.as_str(), old_base.as_str(), &source.id)
        {
            Ok(_) => {
                let msg = format!("rebase {source_id} onto {dest_id}");
                self.continue_evolve(dest_id, source_id, &msg)?;
                self.update(source_id)
            }
            Err(GitError::Command(cmd)) => match cmd.kind {
                GitFailureKind::Conflict(files) => {
                    self.state.merge_conflict_state = Some(MergeConflictState {
                        current_id: dest_id.to_string(),
                        incoming_id: source_id.to_string(),
                        files,
                    });
                    self.save()
                }
                GitFailureKind::Unknown => Err(EngineError::InternalError(cmd.to_string())),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// `comes_before(a, b)`: is there at least one commit reachable from
    /// `b` but not from `a`? Used to order remote nodes and to gate
    /// remote-to-remote rebases. Unlike the original tool, this never
    /// touches HEAD — `rev_list_count` takes the two commit-ish values
    /// directly (see `DESIGN.md`).
    pub fn comes_before(&self, a_id: &str, b_id: &str) -> Result<bool, EngineError> {
        let a = self.state.get_commit(a_id)?;
        let b = self.state.get_commit(b_id)?;
        Ok(self.git.rev_list_count(a.hash.as_str(), b.hash.as_str())? > 0)
    }

    // -----------------------------------------------------------------
    // 4.6.5 Squash
    // -----------------------------------------------------------------

    pub fn squash(&mut self, source_id: &str, dest_id: &str) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let source = self.state.get_commit(source_id)?.clone();
        let dest = self.state.get_commit(dest_id)?.clone();

        if source.remote || dest.remote {
            return Err(EngineError::InvalidOperationForRemote);
        }
        if source.parent_id.as_deref() != Some(dest_id) {
            return Err(EngineError::ValueError(
                "squash only supports a commit being folded into its direct parent".into(),
            ));
        }

        self.copy_branch_state(source_id, dest_id)?;
        let combined = format!("{}\n\n{}", dest.description, source.description);
        self.git.checkout(dest_id, true)?;
        self.git.commit(&combined, true, true)?;
        let new_hash = Oid::new(self.git.head_hash()?)?;

        let source_children = source.children.clone();
        for child_id in &source_children {
            self.relink(child_id, dest_id)?;
            self.state.get_commit_mut(child_id)?.needs_evolve = true;
        }

        {
            let dest_mut = self.state.get_commit_mut(dest_id)?;
            dest_mut.old_hash = Some(dest_mut.hash.clone());
            dest_mut.hash = new_hash;
            dest_mut.description = combined;
            dest_mut.uploaded = false;
            dest_mut.push_snapshot();
        }

        self.drop_commit(source_id)?;
        self.update(dest_id)
    }

    // -----------------------------------------------------------------
    // Drop / prune
    // -----------------------------------------------------------------

    pub fn drop_commit(&mut self, id: &str) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let node = self.state.get_commit(id)?.clone();

        if !node.children.is_empty() {
            return Err(EngineError::ValueError(format!(
                "commit {id} has children and cannot be dropped"
            )));
        }
        let parent_id = node
            .parent_id
            .clone()
            .ok_or_else(|| EngineError::ValueError("cannot drop the only commit".into()))?;

        if self.state.head_id == id {
            self.git.checkout(&parent_id, true)?;
            self.state.head_id = parent_id.clone();
        }

        self.state.get_commit_mut(&parent_id)?.children.retain(|c| c != id);
        self.state.commits.remove(id);

        self.git.branch_delete(id).ok();
        self.git.branch_delete(&node.history_branch).ok();

        self.save()
    }

    /// 4.6.12 Prune: collapse a remote node that has children but none of
    /// them non-remote — it is redundant once a newer remote node exists.
    pub fn prune_commits(&mut self) -> Result<(), EngineError> {
        loop {
            let candidate = self.state.commits.iter().find_map(|(id, c)| {
                if c.remote && !c.children.is_empty() {
                    let all_children_remote = c.children.iter().all(|child_id| {
                        self.state
                            .commits
                            .get(child_id)
                            .map(|child| child.remote)
                            .unwrap_or(false)
                    });
                    if all_children_remote {
                        return Some(id.clone());
                    }
                }
                None
            });

            let Some(id) = candidate else { break };
            let node = self.state.commits.remove(&id).expect("candidate exists");
            let was_root = self.state.root_id == id;

            if let Some(parent_id) = &node.parent_id {
                if let Some(parent) = self.state.commits.get_mut(parent_id) {
                    parent.children.retain(|c| c != &id);
                    parent.children.extend(node.children.iter().cloned());
                }
            }
            for child_id in &node.children {
                if let Some(child) = self.state.commits.get_mut(child_id) {
                    child.parent_id = node.parent_id.clone();
                    child.parent_hash = node.parent_hash.clone();
                }
            }
            if was_root {
                if let Some(first_child) = node.children.first() {
                    self.state.root_id = first_child.clone();
                }
            }

            self.git.branch_delete(&id).ok();
            self.git.branch_delete(&node.history_branch).ok();
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // 4.6.7 / 4.6.8 Pull remote, insert-remote-commit
    // -----------------------------------------------------------------

    fn find_newest_remote(&self) -> Option<CommitId> {
        let mut newest: Option<CommitId> = None;
        for (id, commit) in &self.state.commits {
            if !commit.remote {
                continue;
            }
            newest = match newest {
                None => Some(id.clone()),
                Some(current) => {
                    if self.comes_before(&current, id).unwrap_or(false) {
                        Some(id.clone())
                    } else {
                        Some(current)
                    }
                }
            };
        }
        newest
    }

    pub fn pull_remote(&mut self) -> Result<CommitId, EngineError> {
        self.require_no_conflict()?;
        let newest = self.find_newest_remote();
        let master = self.state.master_branch.clone();

        self.git.checkout(&master, true)?;
        self.git.pull_rebase("origin", &master)?;
        self.git.submodule_update_init_recursive()?;

        let hash = Oid::new(self.git.head_hash()?)?;
        let new_id = format!("master@{}", hash.short(8));

        if self.state.commits.contains_key(&new_id) {
            self.update(&new_id)?;
            return Ok(new_id);
        }

        self.git.create_branch(&new_id, None)?;
        let history_branch = history_branch_name(&new_id);
        self.git.create_branch(&history_branch, None)?;
        let node = Commit {
            id: new_id.clone(),
            hash,
            old_hash: None,
            description: format!("remote commit {new_id}"),
            parent_id: None,
            parent_hash: None,
            children: Vec::new(),
            history_branch,
            upstream_branch: None,
            uploaded: true,
            needs_evolve: false,
            remote: true,
            pull_request: None,
            snapshots: Vec::new(),
            date: UtcTimestamp::now(),
        };
        self.state.commits.insert(new_id.clone(), node);

        match &newest {
            Some(_) => self.insert_remote_commit(&new_id)?,
            None => {
                // The very first remote node this tree has ever seen
                // becomes a child of the existing root, same as every
                // later remote node `insert_remote_commit` places. Root
                // itself stays root; `sync_one` is the only place that
                // ever rebases it onto a remote node.
                let root_id = self.state.root_id.clone();
                self.relink(&new_id, &root_id)?;
            }
        }

        self.prune_commits()?;
        self.update(&new_id)?;
        Ok(new_id)
    }

    /// 4.6.8: walk remote children from root looking for where the new
    /// commit fits in merge order; relink any remote child that now comes
    /// *after* it underneath it.
    fn insert_remote_commit(&mut self, new_id: &str) -> Result<(), EngineError> {
        let mut parent_id = self.state.root_id.clone();
        let mut bumped_child: Option<CommitId> = None;

        loop {
            let children = self.state.get_commit(&parent_id)?.children.clone();
            let mut advanced = false;
            for child_id in &children {
                let is_remote = self.state.get_commit(child_id)?.remote;
                if !is_remote {
                    continue;
                }
                if self.comes_before(child_id, new_id)? {
                    parent_id = child_id.clone();
                    advanced = true;
                    break;
                } else {
                    bumped_child = Some(child_id.clone());
                }
            }
            if !advanced {
                break;
            }
        }

        self.relink(new_id, &parent_id)?;

        if let Some(bumped) = bumped_child {
            self.rebase(&bumped, new_id)?;
        }

        Ok(())
    }

    // -----------------------------------------------------------------
    // 4.6.9 Rebase-merged-commit
    // -----------------------------------------------------------------

    fn rebase_merged_commit(&mut self, local_id: &str, merge_sha: &str) -> Result<(), EngineError> {
        self.git.checkout(merge_sha, true)?;
        let hash = Oid::new(self.git.rev_parse(merge_sha)?)?;
        let remote_id = format!("master@{}", hash.short(8));

        if !self.state.commits.contains_key(&remote_id) {
            self.git.create_branch(&remote_id, None)?;
            let history_branch = history_branch_name(&remote_id);
            self.git.create_branch(&history_branch, None)?;
            let node = Commit {
                id: remote_id.clone(),
                hash,
                old_hash: None,
                description: format!("remote commit {remote_id}"),
                parent_id: None,
                parent_hash: None,
                children: Vec::new(),
                history_branch,
                upstream_branch: None,
                uploaded: true,
                needs_evolve: false,
                remote: true,
                pull_request: None,
                snapshots: Vec::new(),
                date: UtcTimestamp::now(),
            };
            self.state.commits.insert(remote_id.clone(), node);
            self.insert_remote_commit(&remote_id)?;
        }

        let local = self.state.get_commit(local_id)?.clone();
        let diff = self.git.diff(local_id, &remote_id)?;
        if !diff.trim().is_empty() {
            return Err(EngineError::NotImplemented(format!(
                "{local_id} was changed after its pull request merged; rebasing onto the merge commit is unsupported"
            )));
        }

        for child_id in local.children.clone() {
            self.rebase(&child_id, &remote_id)?;
            if self.state.merge_conflict_state.is_some() {
                return Ok(());
            }
        }

        self.drop_commit(local_id)
    }

    // -----------------------------------------------------------------
    // 4.6.6 Sync
    // -----------------------------------------------------------------

    pub async fn sync(&mut self, all: bool) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        self.require_clean_tree()?;

        if all {
            for id in self.state.all_oldest_non_remote_ancestors() {
                if !self.state.commits.contains_key(&id) {
                    continue;
                }
                self.sync_one(&id).await?;
                if self.state.merge_conflict_state.is_some() {
                    return Ok(());
                }
            }
            return Ok(());
        }

        let head_id = self.state.head_id.clone();
        if self.state.head().remote {
            self.pull_remote()?;
            return Ok(());
        }
        let root = self.state.get_oldest_non_remote(&head_id)?;
        self.sync_one(&root).await
    }

    async fn sync_one(&mut self, root_id: &str) -> Result<(), EngineError> {
        let root = self.state.get_commit(root_id)?.clone();

        if let Some(pr) = &root.pull_request {
            let refreshed = self.provider.get_pull_request(&pr.id).await?;
            let merged = refreshed.state == PrState::Merged;
            let merge_commit_sha = refreshed.merge_commit_sha.clone();
            {
                let node = self.state.get_commit_mut(root_id)?;
                node.pull_request = Some(PullRequest {
                    id: refreshed.id,
                    title: refreshed.title,
                    remote_branch: refreshed.remote_branch,
                    remote_base_branch: refreshed.remote_base_branch,
                    state: refreshed.state,
                    merged: refreshed.merged,
                    merge_commit_sha: merge_commit_sha
                        .clone()
                        .map(Oid::new)
                        .transpose()?,
                });
            }
            if merged {
                if let Some(sha) = merge_commit_sha {
                    return self.rebase_merged_commit(root_id, &sha);
                }
            }
        }

        let new_remote = self.pull_remote()?;
        if root.parent_id.is_some() {
            self.rebase(root_id, &new_remote)?;
            if self.state.merge_conflict_state.is_some() {
                return Ok(());
            }
        }
        self.prune_commits()
    }

    // -----------------------------------------------------------------
    // 4.6.13 Upload
    // -----------------------------------------------------------------

    pub async fn upload(&mut self, id: &str) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let node = self.state.get_commit(id)?.clone();
        if node.remote || node.uploaded {
            return Ok(());
        }

        let parent_id = node
            .parent_id
            .clone()
            .ok_or_else(|| EngineError::ValueError(format!("{id} has no parent to upload against")))?;
        let parent = self.state.get_commit(&parent_id)?.clone();
        if !parent.remote && !parent.uploaded {
            return Err(EngineError::ValueError(format!(
                "parent {parent_id} must be uploaded before {id} can be"
            )));
        }

        let is_first_push = node.upstream_branch.is_none();
        let remote_branch = node
            .upstream_branch
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.state.config.remote_branch_prefix, id));

        self.git.checkout(&node.history_branch, true)?;
        self.git
            .push(&format!("{}:{}", node.history_branch, remote_branch), is_first_push)?;

        let pull_request = if is_first_push {
            let base_branch = parent
                .upstream_branch
                .clone()
                .unwrap_or_else(|| self.state.master_branch.clone());
            Some(
                self.provider
                    .create_pull_request(&node.description, &remote_branch, &base_branch)
                    .await?,
            )
        } else {
            None
        };

        let node_mut = self.state.get_commit_mut(id)?;
        node_mut.uploaded = true;
        node_mut.upstream_branch = Some(remote_branch);
        if let Some(pr) = pull_request {
            node_mut.pull_request = Some(PullRequest {
                id: pr.id,
                title: pr.title,
                remote_branch: pr.remote_branch,
                remote_base_branch: pr.remote_base_branch,
                state: pr.state,
                merged: pr.merged,
                merge_commit_sha: pr.merge_commit_sha.map(Oid::new).transpose()?,
            });
        }

        self.save()
    }

    pub async fn upload_all(&mut self) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let root_id = self.state.root_id.clone();
        for id in self.state.traverse(&root_id, false)? {
            if !self.state.get_commit(&id)?.remote {
                self.upload(&id).await?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // 4.6.14 Patch
    // -----------------------------------------------------------------

    pub fn patch(&mut self, remote_branch: &str) -> Result<CommitId, EngineError> {
        self.require_no_conflict()?;
        self.git.fetch("origin")?;
        let fork_point = self.git.merge_base_fork_point(remote_branch)?;
        let hash = Oid::new(self.git.rev_parse(&fork_point)?)?;
        let remote_id = format!("master@{}", hash.short(8));

        if !self.state.commits.contains_key(&remote_id) {
            self.git.create_branch(&remote_id, Some(&fork_point))?;
            let history_branch = history_branch_name(&remote_id);
            self.git.create_branch(&history_branch, Some(&fork_point))?;
            let node = Commit {
                id: remote_id.clone(),
                hash,
                old_hash: None,
                description: format!("remote commit {remote_id}"),
                parent_id: None,
                parent_hash: None,
                children: Vec::new(),
                history_branch,
                upstream_branch: None,
                uploaded: true,
                needs_evolve: false,
                remote: true,
                pull_request: None,
                snapshots: Vec::new(),
                date: UtcTimestamp::now(),
            };
            self.state.commits.insert(remote_id.clone(), node);
            self.insert_remote_commit(&remote_id)?;
        }
        self.update(&remote_id)?;

        let local_id = remote_branch.replace('/', "_");
        let remote_hash = self.state.get_commit(&remote_id)?.hash.clone();

        self.git.create_branch(&local_id, Some(&remote_id))?;
        self.git.checkout(&local_id, true)?;
        self.copy_branch_state(&format!("origin/{remote_branch}"), &local_id)?;
        let message = format!("patch {remote_branch}");
        // Plain (non-amend) commit: local_id's branch still sits at
        // remote_id's commit at this point, so this adds a new commit on
        // top of it rather than rewriting remote_id's own history.
        self.git.commit(&message, false, true)?;
        let local_hash = Oid::new(self.git.head_hash()?)?;

        let history_branch = history_branch_name(&local_id);
        self.git.create_branch(&history_branch, Some(&local_id))?;

        let mut node = Commit {
            id: local_id.clone(),
            hash: local_hash,
            old_hash: None,
            description: message,
            parent_id: Some(remote_id.clone()),
            parent_hash: Some(remote_hash),
            children: Vec::new(),
            history_branch,
            upstream_branch: Some(remote_branch.to_string()),
            uploaded: false,
            needs_evolve: false,
            remote: false,
            pull_request: None,
            snapshots: Vec::new(),
            date: UtcTimestamp::now(),
        };
        node.push_snapshot();

        self.state.get_commit_mut(&remote_id)?.children.push(local_id.clone());
        self.state.commits.insert(local_id.clone(), node);
        self.update(&local_id)?;
        Ok(local_id)
    }

    // -----------------------------------------------------------------
    // 4.6.10 Snapshot / Restore
    // -----------------------------------------------------------------

    pub fn snapshot(&mut self, message: Option<&str>) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let head_id = self.state.head_id.clone();
        let head = self.state.get_commit(&head_id)?.clone();
        let description = message.unwrap_or(&head.description).to_string();

        self.git.checkout(&head.history_branch, true)?;
        self.copy_branch_state(&head_id, &head.history_branch)?;
        if self.git.has_staged_changes()? {
            self.git.commit(&description, false, false)?;
        }
        let hash = Oid::new(self.git.head_hash()?)?;

        self.state
            .get_commit_mut(&head_id)?
            .snapshots
            .push(crate::core::model::Snapshot { hash, description });

        self.git.checkout(&head_id, true)?;
        self.save()
    }

    pub fn restore_snapshot(&mut self, hash: &str) -> Result<(), EngineError> {
        self.require_no_conflict()?;
        let head_id = self.state.head_id.clone();
        let head = self.state.get_commit(&head_id)?.clone();

        if !head.snapshots.iter().any(|s| s.hash.as_str() == hash) {
            return Err(EngineError::ValueError(format!(
                "no snapshot {hash} recorded for {head_id}"
            )));
        }

        self.git.checkout(&head_id, true)?;
        self.copy_branch_state(hash, &head_id)?;
        self.git.commit(&head.description, true, true)?;
        let new_hash = Oid::new(self.git.head_hash()?)?;

        {
            let node = self.state.get_commit_mut(&head_id)?;
            node.old_hash = Some(node.hash.clone());
            node.hash = new_hash;
            node.uploaded = false;
            node.push_snapshot();
        }

        for id in self.state.traverse(&head_id, true)? {
            let node = self.state.get_commit_mut(&id)?;
            if !node.remote {
                node.needs_evolve = true;
            }
        }

        self.save()
    }

    // -----------------------------------------------------------------
    // Config, summary, diagnostics
    // -----------------------------------------------------------------

    pub fn get_config(&self, key: &str) -> Option<String> {
        self.state.config.get(key)
    }

    pub fn set_config(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        if !self.state.config.set(key, value) {
            return Err(EngineError::ConfigurationError(format!(
                "unknown config key or invalid value: {key}={value}"
            )));
        }
        self.save()
    }

    pub fn get_summary(&self, id: &str) -> Result<Commit, EngineError> {
        Ok(self.state.get_commit(id)?.clone())
    }

    pub fn repo_metadata(&self) -> Option<&RepoMetadata> {
        self.state.repo_metadata.as_ref()
    }

    /// Record where this repository's remote lives, e.g. after `init`
    /// detects an `origin` remote or `clone` is given a URL.
    pub fn set_repo_metadata(&mut self, metadata: RepoMetadata) -> Result<(), EngineError> {
        self.state.repo_metadata = Some(metadata);
        self.save()
    }

    /// Extends `core::verify::get_bad_states` with the one invariant that
    /// needs Git: a node's history branch is in sync with its own branch
    /// whenever the working tree is clean (invariant 4).
    pub fn get_bad_states(&self) -> Vec<BadState> {
        let mut bad = verify::get_bad_states(&self.state);

        if self.state.merge_conflict_state.is_none() && self.git.is_clean().unwrap_or(false) {
            for (id, commit) in &self.state.commits {
                if let Ok(diff) = self.git.diff(id, &commit.history_branch) {
                    if !diff.trim().is_empty() {
                        bad.push(BadState {
                            commit_id: Some(id.clone()),
                            message: format!(
                                "{id} and its history branch {} have diverged",
                                commit.history_branch
                            ),
                        });
                    }
                }
            }
        }

        bad
    }

    pub fn check_state(&self) -> Result<(), EngineError> {
        match self.get_bad_states().into_iter().next() {
            Some(bad) => Err(BadGitGudState(bad.message).into()),
            None => Ok(()),
        }
    }
}
