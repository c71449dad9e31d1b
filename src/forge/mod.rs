//! forge
//!
//! The "C2 Hosted-Repo Provider": a narrow abstraction over a review host,
//! with exactly three verbs (`spec.md` §4.2). One implementation talks to
//! a GitHub-compatible REST API ([`github::GitHubProvider`]); another is a
//! deterministic in-memory fake used by the engine's own test suite
//! ([`fake::FakeProvider`]).
//!
//! Per the design notes, this stays a two-method-class contract rather
//! than pulling in a full REST client stack — there is no generic
//! "forge" feature surface beyond create/close/get.

pub mod fake;
pub mod github;
mod traits;

pub use traits::*;
