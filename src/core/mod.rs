//! core
//!
//! Core domain types and pure operations: the Commit Graph Model (C4), the
//! State Store (C3), and the naming/config/verification rules they share.
//!
//! # Modules
//!
//! - [`types`] - Strong types: `BranchName`, `Oid`, `UtcTimestamp`
//! - [`model`] - `RepoState`, `Commit`, `PullRequest`, the graph queries
//! - [`naming`] - Branch-name derivation from a commit message
//! - [`state`] - Load/save the per-directory JSON state file
//! - [`paths`] - Centralized path routing (`configs_root`, global config)
//! - [`config`] - Process-wide configuration defaults
//! - [`verify`] - Pure graph invariant checks
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - This module owns no Git or network I/O; see [`crate::git`] and
//!   [`crate::forge`] for that

pub mod config;
pub mod model;
pub mod naming;
pub mod paths;
pub mod state;
pub mod types;
pub mod verify;
