//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging (echoes every Git Driver invocation)
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// gg - a Git overlay managing stacked commits via an in-memory commit graph
#[derive(Parser, Debug)]
#[command(name = "gg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gg was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands, one per operation in the engine's contract.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start tracking the repository in the current directory
    Init,

    /// Clone a remote repository and start tracking it
    Clone {
        /// URL to clone
        url: String,

        /// Destination directory (defaults to the repo name from `url`)
        local_path: Option<PathBuf>,
    },

    /// Record the working tree as a new child commit of HEAD
    Commit {
        /// Commit message
        message: String,
    },

    /// Rewrite the current commit's content, leaving its message unless given a new one
    Amend {
        /// New commit message
        message: Option<String>,
    },

    /// Replay pending rebases/merges recorded against the current commit's descendants
    Evolve,

    /// Check out a tracked commit by id
    Update {
        /// Commit id to check out
        id: String,
    },

    /// Move `src` (and its descendants) onto `dst`
    Rebase {
        /// Commit id to move
        src: String,

        /// Commit id to move onto
        dst: String,
    },

    /// Resume a rebase left mid-conflict by `evolve`/`rebase`
    RebaseContinue,

    /// Fold `src` into its parent `dst`
    Squash {
        /// Commit id being folded in
        src: String,

        /// Commit id absorbing it
        dst: String,
    },

    /// Pull upstream changes and reconcile the local commit tree against them
    Sync {
        /// Sync every remote-tracking subtree, not just the one under HEAD
        #[arg(long)]
        all: bool,
    },

    /// Push a commit's history branch and open/refresh its pull request
    Upload {
        /// Commit id to upload (defaults to HEAD)
        id: Option<String>,

        /// Upload every eligible commit in the tree
        #[arg(long)]
        all: bool,
    },

    /// Remove a childless commit from the tree
    Drop {
        /// Commit id to drop
        id: String,
    },

    /// Adopt a remote branch not already known to gg as a tracked commit
    Patch {
        /// Remote branch name, e.g. `origin/feature-x`
        remote_branch: String,
    },

    /// Reset a commit's content back to a prior snapshot
    RestoreSnapshot {
        /// Snapshot hash to restore
        hash: String,
    },

    /// Record a snapshot of the current commit without changing anything
    Snapshot {
        /// Optional description for the snapshot
        message: Option<String>,
    },

    /// Print a one-line summary of the tracked tree
    GetSummary,

    /// Print the tracked commit tree
    PrintStatus {
        /// Include descriptions and snapshot counts
        #[arg(long)]
        full: bool,
    },

    /// Print the repository's per-repo configuration
    GetConfig,

    /// Set a per-repo configuration value
    SetConfig {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },

    /// List every invariant violation found in the tracked state
    GetBadStates,

    /// Exit non-zero if the tracked state violates any invariant
    CheckState,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
