//! git::driver
//!
//! Subprocess-based implementation of the Git Driver (`spec.md` §4.1).

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Number of attempts for a command whose failure looks transient.
const MAX_RETRIES: u32 = 10;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Substrings in stderr that mark a failure as worth retrying.
const RETRYABLE_PATTERNS: &[&str] = &["index.lock", "Connection reset", "Temporary failure"];

/// stdout/stderr from a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

/// How a failed command was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitFailureKind {
    /// stdout contained one or more `CONFLICT` lines; these are the
    /// conflicted paths (last whitespace-separated token of each line,
    /// quotes stripped).
    Conflict(Vec<String>),
    /// The failure matched no recognized pattern.
    Unknown,
}

/// A non-retryable Git command failure, carrying the raw output for
/// callers (and the CLI's `--debug` output) to inspect.
#[derive(Debug, Clone)]
pub struct GitCommandError {
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub kind: GitFailureKind,
}

impl std::fmt::Display for GitCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "git {} failed: {}",
            self.command.join(" "),
            self.stderr.trim()
        )
    }
}

impl std::error::Error for GitCommandError {}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("{0}")]
    Command(#[from] GitCommandError),

    #[error("failed to launch git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{0} is not a Git working directory")]
    NotARepo(PathBuf),
}

/// Optional hook invoked with the argv before each command runs, wired up
/// to `--debug` by the CLI layer. The driver itself never prints.
pub type DebugHook = Arc<dyn Fn(&[&str]) + Send + Sync>;

/// A handle to one Git working directory.
#[derive(Clone)]
pub struct Git {
    repo_dir: PathBuf,
    on_command: Option<DebugHook>,
}

impl Git {
    /// Open a handle to `repo_dir`, which must already contain a `.git`.
    pub fn open(repo_dir: impl Into<PathBuf>) -> Result<Self, GitError> {
        let repo_dir = repo_dir.into();
        if !repo_dir.join(".git").exists() {
            return Err(GitError::NotARepo(repo_dir));
        }
        Ok(Self {
            repo_dir,
            on_command: None,
        })
    }

    /// Attach a debug hook, called with the argv immediately before each
    /// invocation.
    pub fn with_debug_hook(mut self, hook: DebugHook) -> Self {
        self.on_command = Some(hook);
        self
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    // ---------------------------------------------------------------
    // Low-level execution with retry + conflict classification
    // ---------------------------------------------------------------

    fn run(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        self.run_with_env(args, &[])
    }

    fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Result<GitOutput, GitError> {
        if let Some(hook) = &self.on_command {
            hook(args);
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut cmd = Command::new("git");
            cmd.args(args).current_dir(&self.repo_dir);
            for (k, v) in env {
                cmd.env(k, v);
            }

            let output = cmd.output().map_err(GitError::Spawn)?;
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

            if output.status.success() {
                return Ok(GitOutput { stdout, stderr });
            }

            if attempt < MAX_RETRIES && is_retryable(&stderr) {
                thread::sleep(RETRY_BACKOFF);
                continue;
            }

            let kind = classify_failure(&stdout);
            return Err(GitError::Command(GitCommandError {
                command: args.iter().map(|s| s.to_string()).collect(),
                stdout,
                stderr,
                kind,
            }));
        }
    }

    // ---------------------------------------------------------------
    // Porcelain operations (spec.md §4.1)
    // ---------------------------------------------------------------

    pub fn checkout(&self, reference: &str, recurse_submodules: bool) -> Result<(), GitError> {
        let mut args = vec!["checkout", reference];
        if recurse_submodules {
            args.push("--recurse-submodules");
        }
        self.run(&args)?;
        Ok(())
    }

    pub fn submodule_update_init_recursive(&self) -> Result<(), GitError> {
        self.run(&["submodule", "update", "--init", "--recursive"])?;
        Ok(())
    }

    pub fn reset_hard(&self, reference: &str) -> Result<(), GitError> {
        self.run(&["reset", "--hard", reference])?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "-A"])?;
        Ok(())
    }

    pub fn commit(&self, message: &str, amend: bool, allow_empty: bool) -> Result<(), GitError> {
        let mut args = vec!["commit", "-m", message];
        if amend {
            args.push("--amend");
            args.push("--no-edit");
        }
        if allow_empty {
            args.push("--allow-empty");
        }
        self.run(&args)?;
        Ok(())
    }

    /// `git merge --no-ff --no-commit <other_ref>`. Returns the conflicted
    /// file list on conflict.
    pub fn merge_no_commit(&self, other_ref: &str) -> Result<GitOutput, GitError> {
        self.run(&["merge", "--no-ff", "--no-commit", other_ref])
    }

    /// `git rebase --onto <new_base> <old_base> <branch>`.
    pub fn rebase_onto(
        &self,
        new_base: &str,
        old_base: &str,
        branch: &str,
    ) -> Result<GitOutput, GitError> {
        self.run(&["rebase", "--onto", new_base, old_base, branch])
    }

    /// `git rebase --continue`, with `GIT_EDITOR` scoped to this one
    /// invocation (see `spec.md` §5, "Scoped acquisition"). `Command::env`
    /// only affects the child process, so there is no global state to
    /// restore afterwards.
    pub fn rebase_continue(&self) -> Result<GitOutput, GitError> {
        self.run_with_env(&["rebase", "--continue"], &[("GIT_EDITOR", "true")])
    }

    pub fn rebase_abort(&self) -> Result<(), GitError> {
        self.run(&["rebase", "--abort"])?;
        Ok(())
    }

    pub fn merge_abort(&self) -> Result<(), GitError> {
        self.run(&["merge", "--abort"])?;
        Ok(())
    }

    /// `git checkout <reference> -- .` — overwrite every tracked path in the
    /// working tree/index with `reference`'s version, without moving HEAD.
    pub fn checkout_tree(&self, reference: &str) -> Result<(), GitError> {
        self.run(&["checkout", reference, "--", "."])?;
        Ok(())
    }

    pub fn push(&self, refspec: &str, set_upstream: bool) -> Result<(), GitError> {
        let mut args = vec!["push"];
        if set_upstream {
            args.push("-u");
        }
        args.push("origin");
        args.push(refspec);
        self.run(&args)?;
        Ok(())
    }

    pub fn pull_rebase(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        self.run(&["pull", "--rebase", remote, branch])?;
        Ok(())
    }

    pub fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run(&["fetch", remote])?;
        Ok(())
    }

    pub fn remote_url(&self, remote: &str) -> Result<String, GitError> {
        Ok(self.run(&["remote", "get-url", remote])?.stdout.trim().to_string())
    }

    pub fn diff(&self, a: &str, b: &str) -> Result<String, GitError> {
        Ok(self.run(&["diff", a, b])?.stdout)
    }

    /// Whether the index currently holds staged changes relative to HEAD.
    pub fn has_staged_changes(&self) -> Result<bool, GitError> {
        Ok(!self
            .run(&["diff", "--cached", "--name-only"])?
            .stdout
            .trim()
            .is_empty())
    }

    /// `git rev-list --count a..b`. Does not touch HEAD or the working
    /// tree (a deliberate departure from the original, whose equivalent
    /// checked out master first; see `DESIGN.md`).
    pub fn rev_list_count(&self, a: &str, b: &str) -> Result<u64, GitError> {
        let range = format!("{a}..{b}");
        let out = self.run(&["rev-list", "--count", &range])?;
        Ok(out.stdout.trim().parse().unwrap_or(0))
    }

    pub fn merge_base_fork_point(&self, branch: &str) -> Result<String, GitError> {
        let out = self.run(&["merge-base", "--fork-point", branch])?;
        Ok(out.stdout.trim().to_string())
    }

    pub fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        let out = self.run(&["merge-base", a, b])?;
        Ok(out.stdout.trim().to_string())
    }

    pub fn branch_delete(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["branch", "-D", branch])?;
        Ok(())
    }

    pub fn create_branch(&self, branch: &str, at: Option<&str>) -> Result<(), GitError> {
        let mut args = vec!["branch", branch];
        if let Some(at) = at {
            args.push(at);
        }
        self.run(&args)?;
        Ok(())
    }

    pub fn rename_branch(&self, old: &str, new: &str) -> Result<(), GitError> {
        self.run(&["branch", "-M", old, new])?;
        Ok(())
    }

    /// `git switch -C <branch> <source>` — force-create/move `branch` to
    /// point at `source` and check it out.
    pub fn switch_force(&self, branch: &str, source: &str) -> Result<(), GitError> {
        self.run(&["switch", "-C", branch, source])?;
        Ok(())
    }

    pub fn head_hash(&self) -> Result<String, GitError> {
        Ok(self.run(&["rev-parse", "HEAD"])?.stdout.trim().to_string())
    }

    pub fn rev_parse(&self, reference: &str) -> Result<String, GitError> {
        Ok(self.run(&["rev-parse", reference])?.stdout.trim().to_string())
    }

    pub fn current_branch(&self) -> Result<String, GitError> {
        Ok(self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .stdout
            .trim()
            .to_string())
    }

    pub fn is_clean(&self) -> Result<bool, GitError> {
        let out = self.run(&["status", "--porcelain"])?;
        Ok(out.stdout.trim().is_empty())
    }

    pub fn soft_reset(&self, reference: &str) -> Result<(), GitError> {
        self.run(&["reset", "--soft", reference])?;
        Ok(())
    }

    pub fn clone_repo(url: &str, dest: &Path) -> Result<(), GitError> {
        let output = Command::new("git")
            .args(["clone", url, &dest.to_string_lossy()])
            .output()
            .map_err(GitError::Spawn)?;
        if !output.status.success() {
            return Err(GitError::Command(GitCommandError {
                command: vec!["clone".into(), url.into()],
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                kind: GitFailureKind::Unknown,
            }));
        }
        Ok(())
    }
}

fn is_retryable(stderr: &str) -> bool {
    RETRYABLE_PATTERNS.iter().any(|p| stderr.contains(p))
}

/// Classify a failed rebase/merge by scanning stdout for `CONFLICT` lines.
/// Takes the last whitespace-separated token of each such line, with
/// surrounding quotes stripped.
fn classify_failure(stdout: &str) -> GitFailureKind {
    let files: Vec<String> = stdout
        .lines()
        .filter(|l| l.starts_with("CONFLICT"))
        .filter_map(|l| l.split_whitespace().last())
        .map(|tok| tok.trim_matches('"').to_string())
        .collect();

    if files.is_empty() {
        GitFailureKind::Unknown
    } else {
        GitFailureKind::Conflict(files)
    }
}
