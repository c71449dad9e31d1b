//! gg - a Git overlay managing stacked commits via an in-memory commit
//! graph engine with rebase automation.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - The commit graph engine: drives Git and the hosted-repo
//!   provider, mutates the graph, persists through the state store
//! - [`core`] - Domain types (`RepoState`, `Commit`, `Config`), invariant
//!   checks, naming, paths, and the state store
//! - [`git`] - Subprocess-based facade over the `git` binary
//! - [`forge`] - Hosted-repo provider abstraction (GitHub)
//! - [`ui`] - Output formatting
//!
//! # Correctness invariants
//!
//! 1. Every node reaches a single root via its `parent_id` chain.
//! 2. A conflict suspends an operation rather than unwinding it; the
//!    engine persists a `MergeConflictState` and resumes from
//!    `rebase_continue`.
//! 3. Repository state is saved after every externally-visible mutation.

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod ui;
