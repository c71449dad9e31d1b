//! forge::traits
//!
//! The `HostedRepoProvider` trait: create/close/get a pull request against
//! a review host, and nothing else. `async` because every implementation
//! but the test fake does network I/O.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::model::PrState;

/// Errors from hosted-repo provider operations.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    #[error("provider credentials are not configured")]
    AuthRequired,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("pull request not found: {0}")]
    NotFound(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("network error talking to provider: {0}")]
    NetworkError(String),
}

/// A pull request as the engine understands it, after normalizing the
/// provider's native representation onto [`PrState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub remote_branch: String,
    pub remote_base_branch: String,
    pub state: PrState,
    pub merged: bool,
    pub merge_commit_sha: Option<String>,
}

/// The "C2 Hosted-Repo Provider" contract: three verbs, nothing more.
///
/// Missing provider credentials must surface as a fatal precondition
/// failure when the provider is *constructed* (see each implementation's
/// constructor), not lazily on the first call.
#[async_trait]
pub trait HostedRepoProvider: Send + Sync {
    /// Create a new pull request. Pull requests are always created as
    /// drafts (`spec.md` §4.2).
    async fn create_pull_request(
        &self,
        title: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<PullRequest, ForgeError>;

    async fn close_pull_request(&self, id: &str) -> Result<(), ForgeError>;

    async fn get_pull_request(&self, id: &str) -> Result<PullRequest, ForgeError>;
}
