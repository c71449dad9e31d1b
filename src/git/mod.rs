//! git
//!
//! The "C1 Git Driver": a narrow, strongly-typed façade over the `git`
//! executable. All repository mutation flows through this interface; no
//! other module shells out to `git` or links against a Git library
//! directly.
//!
//! # Why shell out instead of a Git library
//!
//! The engine needs literal `git rebase --onto`/`git rebase --continue`
//! semantics, including real conflict markers written into tracked files
//! and a real index left mid-rebase for the user to resolve by hand. A
//! library binding models the object database well but doesn't reproduce
//! that working-tree choreography, so this driver is a thin wrapper over
//! subprocess invocations of the real binary instead.
//!
//! # Responsibilities
//!
//! - Checkout, reset, add, commit, merge, rebase, push, pull, fetch
//! - Bounded retries for transient errors (`index.lock`, network blips)
//! - Recognizing a failed rebase/merge as a conflict vs. an unknown failure

mod driver;

pub use driver::{Git, GitCommandError, GitError, GitFailureKind};
