//! End-to-end engine tests against real temporary Git repositories.
//!
//! Each test builds a throwaway repo with the real `git` binary (no
//! mocking of Git itself — the whole point of the Git Driver is its
//! fidelity to real Git output) and drives the engine exactly as a CLI
//! invocation would.

use std::fs;
use std::path::Path;
use std::process::Command;

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use gitgud::core::paths::GitGudPaths;
use gitgud::engine::Engine;
use gitgud::forge::fake::FakeProvider;
use gitgud::forge::{ForgeError, HostedRepoProvider, PullRequest};

/// Lets a test keep a handle to the same [`FakeProvider`] instance the
/// engine is driving, so it can simulate an external PR merge mid-test.
struct SharedFake(Arc<FakeProvider>);

#[async_trait]
impl HostedRepoProvider for SharedFake {
    async fn create_pull_request(
        &self,
        title: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<PullRequest, ForgeError> {
        self.0.create_pull_request(title, head_branch, base_branch).await
    }

    async fn close_pull_request(&self, id: &str) -> Result<(), ForgeError> {
        self.0.close_pull_request(id).await
    }

    async fn get_pull_request(&self, id: &str) -> Result<PullRequest, ForgeError> {
        self.0.get_pull_request(id).await
    }
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git must be on PATH for these tests");
    assert!(status.success(), "git {args:?} failed");
}

/// A repo with one commit, ready for `Engine::bootstrap`.
struct Harness {
    _repo_tmp: TempDir,
    _config_tmp: TempDir,
    repo_dir: std::path::PathBuf,
    paths: GitGudPaths,
}

impl Harness {
    fn new() -> Self {
        let repo_tmp = TempDir::new().unwrap();
        let config_tmp = TempDir::new().unwrap();
        let repo_dir = repo_tmp.path().to_path_buf();

        git(&repo_dir, &["init", "-q", "-b", "master"]);
        git(&repo_dir, &["config", "user.name", "Test"]);
        git(&repo_dir, &["config", "user.email", "test@example.com"]);
        fs::write(repo_dir.join("README"), "root\n").unwrap();
        git(&repo_dir, &["add", "-A"]);
        git(&repo_dir, &["commit", "-q", "-m", "root"]);

        let paths = GitGudPaths::rooted_at(config_tmp.path());

        Self {
            _repo_tmp: repo_tmp,
            _config_tmp: config_tmp,
            repo_dir,
            paths,
        }
    }

    fn engine(&self) -> Engine {
        Engine::bootstrap(
            &self.repo_dir,
            self.paths.clone(),
            Box::new(FakeProvider::new()),
            gitgud::core::model::Config::default(),
        )
        .unwrap()
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.repo_dir.join(name), contents).unwrap();
    }

    fn append(&self, name: &str, contents: &str) {
        let path = self.repo_dir.join(name);
        let mut existing = fs::read_to_string(&path).unwrap_or_default();
        existing.push_str(contents);
        fs::write(path, existing).unwrap();
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.repo_dir.join(name)).unwrap()
    }
}

/// Scenario 1: linear amend that conflicts, then resolves.
#[test]
fn linear_amend_with_conflict() {
    let h = Harness::new();
    let mut engine = h.engine();
    let root_id = engine.state().root_id.clone();

    h.write("f", "testing1\n");
    let c1 = engine.commit("My first commit", true).unwrap();
    assert_eq!(engine.state().get_commit(&c1).unwrap().parent_id.as_deref(), Some(root_id.as_str()));

    h.append("f", "testing2");
    let c2 = engine.commit("My second commit", true).unwrap();

    engine.update(&c1).unwrap();
    h.append("f", "testing3");
    engine.amend(None, true).unwrap();
    assert!(engine.state().get_commit(&c2).unwrap().needs_evolve);

    engine.evolve().unwrap();
    assert!(engine.state().merge_conflict_state.is_some(), "diverging appends must conflict");
    let contents = h.read("f");
    assert!(contents.contains("<<<<<<<"));
    assert!(contents.contains("testing3"));
    assert!(contents.contains("testing2"));

    h.write("f", "testing1\ntesting2\ntesting3\n");
    engine.rebase_continue().unwrap();

    assert!(engine.state().merge_conflict_state.is_none());
    assert_eq!(engine.state().head_id, c2);
    assert!(!engine.state().get_commit(&c2).unwrap().needs_evolve);
}

/// Scenario 2: syncing against upstream drift pulls the new remote commit
/// in as a child of root, leaving root itself untouched; rebasing the local
/// commit onto it is then a separate, explicit step.
#[test]
fn sync_with_upstream_drift() {
    let h = Harness::new();

    let remote_tmp = TempDir::new().unwrap();
    git(remote_tmp.path(), &["init", "-q", "--bare", "-b", "master"]);
    git(
        &h.repo_dir,
        &["remote", "add", "origin", remote_tmp.path().to_str().unwrap()],
    );
    git(&h.repo_dir, &["push", "-q", "origin", "master"]);

    let mut engine = h.engine();
    let root_id = engine.state().root_id.clone();

    h.write("l", "local-content\n");
    let c_local = engine.commit("Added local content", true).unwrap();
    assert_eq!(
        engine.state().get_commit(&c_local).unwrap().parent_id.as_deref(),
        Some(root_id.as_str())
    );

    // On the remote, someone else adds a file and pushes straight to
    // master, simulating upstream drift the local commit never saw.
    let ext_tmp = TempDir::new().unwrap();
    let status = Command::new("git")
        .args([
            "clone",
            "-q",
            remote_tmp.path().to_str().unwrap(),
            ext_tmp.path().to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    git(ext_tmp.path(), &["config", "user.name", "Test"]);
    git(ext_tmp.path(), &["config", "user.email", "test@example.com"]);
    fs::write(ext_tmp.path().join("r"), "more-contents-from-remote\n").unwrap();
    git(ext_tmp.path(), &["add", "-A"]);
    git(ext_tmp.path(), &["commit", "-q", "-m", "remote addition"]);
    git(ext_tmp.path(), &["push", "-q", "origin", "master"]);

    engine.update(&root_id).unwrap();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(engine.sync(false)).unwrap();
    assert!(engine.state().merge_conflict_state.is_none());

    let new_remote = engine.state().head_id.clone();
    assert_ne!(new_remote, root_id, "root must stay root");
    assert_eq!(engine.state().root_id, root_id);
    let remote_node = engine.state().get_commit(&new_remote).unwrap();
    assert!(remote_node.remote);
    assert_eq!(remote_node.parent_id.as_deref(), Some(root_id.as_str()));
    assert_eq!(h.read("r"), "more-contents-from-remote\n");

    engine.rebase(&c_local, &new_remote).unwrap();
    assert!(engine.state().merge_conflict_state.is_none());
    assert_eq!(
        engine.state().get_commit(&c_local).unwrap().parent_id.as_deref(),
        Some(new_remote.as_str())
    );

    engine.update(&c_local).unwrap();
    assert_eq!(h.read("r"), "more-contents-from-remote\n");
    assert_eq!(h.read("l"), "local-content\n");
}

/// Scenario 4: a chain of snapshots, restored to an earlier point and then
/// to a later one.
#[test]
fn snapshot_chain_restore_to_middle() {
    let h = Harness::new();
    let mut engine = h.engine();

    h.write("f", "v0\n");
    let c1 = engine.commit("base", true).unwrap();
    engine.update(&c1).unwrap();

    let mut snapshot_hashes = Vec::new();
    for v in 1..=3 {
        h.write("f", &format!("v{v}\n"));
        engine.amend(None, true).unwrap();
        let commit = engine.state().get_commit(&c1).unwrap().clone();
        snapshot_hashes.push(commit.snapshots.last().unwrap().hash.clone());
    }
    assert_eq!(engine.state().get_commit(&c1).unwrap().snapshots.len(), 4);

    engine
        .restore_snapshot(snapshot_hashes[0].as_str())
        .unwrap();
    assert_eq!(h.read("f"), "v0\n");
    assert_eq!(engine.state().get_commit(&c1).unwrap().snapshots.len(), 5);

    engine
        .restore_snapshot(snapshot_hashes[2].as_str())
        .unwrap();
    assert_eq!(h.read("f"), "v3\n");
    assert_eq!(engine.state().get_commit(&c1).unwrap().snapshots.len(), 6);
}

/// Scenario 5: rebasing a commit under a sibling.
#[test]
fn rebase_under_sibling() {
    let h = Harness::new();
    let mut engine = h.engine();
    let root_id = engine.state().root_id.clone();

    h.write("c1.txt", "commit1\n");
    let c1 = engine.commit("c1", true).unwrap();

    h.write("c2.txt", "commit2\n");
    let c2 = engine.commit("c2", true).unwrap();

    engine.update(&root_id).unwrap();
    h.write("c3.txt", "commit3\n");
    let c3 = engine.commit("c3", true).unwrap();

    engine.rebase(&c2, &c3).unwrap();
    assert!(engine.state().merge_conflict_state.is_none());

    assert_eq!(engine.state().get_commit(&c2).unwrap().parent_id.as_deref(), Some(c3.as_str()));
    assert!(!engine.state().get_commit(&c1).unwrap().children.contains(&c2));

    engine.update(&c2).unwrap();
    assert_eq!(h.read("c2.txt"), "commit2\n");
    assert!(!h.repo_dir.join("c1.txt").exists());
    assert!(h.repo_dir.join("c3.txt").exists());
}

/// Scenario 6: amending a commit with multiple descendants across two
/// branches evolves every one of them.
#[test]
fn multi_child_evolve() {
    let h = Harness::new();
    let mut engine = h.engine();

    h.write("base.txt", "base\n");
    let c1 = engine.commit("c1", true).unwrap();

    h.write("c2.txt", "c2\n");
    let c2 = engine.commit("c2", true).unwrap();

    engine.update(&c1).unwrap();
    h.write("c3.txt", "c3\n");
    let c3 = engine.commit("c3", true).unwrap();

    h.write("c4.txt", "c4\n");
    let c4 = engine.commit("c4", true).unwrap();

    engine.update(&c1).unwrap();
    h.append("base.txt", "amended\n");
    engine.amend(None, true).unwrap();

    for id in [&c2, &c3, &c4] {
        assert!(engine.state().get_commit(id).unwrap().needs_evolve);
    }

    engine.evolve().unwrap();
    assert!(
        engine.state().merge_conflict_state.is_none(),
        "independent branches touching disjoint files must not conflict"
    );

    for id in [&c2, &c3, &c4] {
        assert!(!engine.state().get_commit(id).unwrap().needs_evolve);
    }

    engine.update(&c2).unwrap();
    assert_eq!(h.read("base.txt"), "base\namended\n");
    assert_eq!(h.read("c2.txt"), "c2\n");

    engine.update(&c4).unwrap();
    assert_eq!(h.read("base.txt"), "base\namended\n");
    assert_eq!(h.read("c3.txt"), "c3\n");
    assert_eq!(h.read("c4.txt"), "c4\n");
}

/// Scenario 3: once a pull request is reported merged, `sync` drops the
/// local commit and the merge lands as a new remote leaf.
#[test]
fn merged_pr_disappears_on_sync() {
    let h = Harness::new();

    // A bare remote so `upload`'s `git push` and the merge simulation
    // below (pushing straight to `master`, as a reviewer's merge button
    // would) have somewhere real to land.
    let remote_tmp = TempDir::new().unwrap();
    git(remote_tmp.path(), &["init", "-q", "--bare", "-b", "master"]);
    git(
        &h.repo_dir,
        &["remote", "add", "origin", remote_tmp.path().to_str().unwrap()],
    );
    git(&h.repo_dir, &["push", "-q", "origin", "master"]);

    let fake = Arc::new(FakeProvider::new());
    let mut engine =
        Engine::bootstrap(
            &h.repo_dir,
            h.paths.clone(),
            Box::new(SharedFake(fake.clone())),
            gitgud::core::model::Config::default(),
        )
        .unwrap();

    // Pull once so the bare remote's current tip becomes a remote node
    // hanging off root; the new commit built on top of it is then its own
    // oldest non-remote ancestor, which is what makes `sync` consult its
    // pull request directly instead of walking further up the tree.
    let remote_id = engine.pull_remote().unwrap();
    assert!(engine.state().head().remote);
    assert_ne!(remote_id, engine.state().root_id, "root must stay root");

    h.write("content.txt", "content1\n");
    let c1 = engine.commit("content1", true).unwrap();
    assert_eq!(
        engine.state().get_commit(&c1).unwrap().parent_id.as_deref(),
        Some(remote_id.as_str())
    );

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(engine.upload(&c1)).unwrap();
    assert!(engine.state().get_commit(&c1).unwrap().uploaded);

    let pr_id = engine
        .state()
        .get_commit(&c1)
        .unwrap()
        .pull_request
        .as_ref()
        .unwrap()
        .id
        .clone();

    // Simulate a reviewer merging the PR: the remote-branch tip lands on
    // `master` directly (a fast-forward merge, since there's nothing else
    // on `master` to conflict with), and the provider reports it merged.
    git(&h.repo_dir, &["fetch", "-q", "origin"]);
    let remote_branch = engine
        .state()
        .get_commit(&c1)
        .unwrap()
        .upstream_branch
        .clone()
        .unwrap();
    let merge_sha_output = Command::new("git")
        .args(["rev-parse", &format!("origin/{remote_branch}")])
        .current_dir(&h.repo_dir)
        .output()
        .unwrap();
    let merge_sha = String::from_utf8(merge_sha_output.stdout).unwrap().trim().to_string();
    git(
        &h.repo_dir,
        &[
            "push",
            "-q",
            "origin",
            &format!("origin/{remote_branch}:refs/heads/master"),
        ],
    );
    fake.mark_merged(&pr_id, &merge_sha);

    let rt2 = tokio::runtime::Runtime::new().unwrap();
    rt2.block_on(engine.sync(false)).unwrap();

    assert!(engine.state().merge_conflict_state.is_none());
    assert!(engine.state().get_commit(&c1).is_err(), "merged local commit must be dropped");
    assert!(
        engine.state().commits.values().any(|c| c.remote),
        "a new remote node must replace the merged commit"
    );
}
