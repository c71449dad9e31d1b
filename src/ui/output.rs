//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.

use std::fmt::Display;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Format a branch name for display.
pub fn format_branch(name: &str) -> String {
    name.to_string()
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the tracked commit tree as indented ASCII-art, depth-first from
/// `root_id`, in the order `RepoState::traverse` would visit it.
///
/// Each line carries the id, a short hash, a `*` for the checked-out
/// commit, `^` for uploaded, `!` for `needs_evolve`, and the PR state in
/// brackets when one exists. With `full`, a second indented line adds the
/// description and snapshot count.
pub fn format_status_tree(state: &crate::core::model::RepoState, full: bool) -> String {
    let mut out = String::new();
    write_node(state, &state.root_id, 0, full, &mut out);
    out
}

fn write_node(
    state: &crate::core::model::RepoState,
    id: &str,
    depth: usize,
    full: bool,
    out: &mut String,
) {
    let Some(commit) = state.commits.get(id) else {
        return;
    };

    let indent = "  ".repeat(depth);
    let current = if id == state.head_id { "*" } else { " " };
    let uploaded = if commit.uploaded { "^" } else { " " };
    let needs_evolve = if commit.needs_evolve { "!" } else { " " };
    let pr = commit
        .pull_request
        .as_ref()
        .map(|pr| format!(" [{}]", pr.state))
        .unwrap_or_default();

    out.push_str(&format!(
        "{indent}{current}{uploaded}{needs_evolve} {id} {}{pr}\n",
        commit.hash.short(7),
    ));
    if full {
        out.push_str(&format!(
            "{indent}    {} ({} snapshot(s))\n",
            commit.description,
            commit.snapshots.len()
        ));
    }

    for child_id in &commit.children {
        write_node(state, child_id, depth + 1, full, out);
    }
}
