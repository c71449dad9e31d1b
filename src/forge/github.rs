//! forge::github
//!
//! GitHub REST API implementation of [`HostedRepoProvider`].
//!
//! # Authentication
//!
//! Requires a personal access token in the `GITHUB_GG_TOKEN` environment
//! variable. Its absence is a fatal precondition failure raised at
//! construction time, not on the first API call.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::core::model::PrState;
use crate::forge::{ForgeError, HostedRepoProvider, PullRequest};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT_VALUE: &str = "gg-cli";

/// Name of the environment variable holding the GitHub token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_GG_TOKEN";

/// Extract `(owner, repo)` from a GitHub remote URL, accepting both the
/// `https://github.com/owner/repo(.git)` and `git@github.com:owner/repo(.git)`
/// forms. Returns `None` for anything else, including other hosts.
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let trimmed = url.trim().trim_end_matches(".git");
    let path = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .or_else(|| trimmed.strip_prefix("git@github.com:"))
        .or_else(|| trimmed.strip_prefix("ssh://git@github.com/"))?;
    let mut parts = path.splitn(2, '/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct CreatePrBody<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    draft: bool,
}

#[derive(Debug, Serialize)]
struct UpdatePrStateBody<'a> {
    state: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitHubPr {
    number: u64,
    title: String,
    head: GitHubRef,
    base: GitHubRef,
    state: String,
    draft: bool,
    merged: bool,
    merge_commit_sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl GitHubPr {
    fn into_pull_request(self) -> PullRequest {
        let state = match (self.state.as_str(), self.merged, self.draft) {
            (_, true, _) => PrState::Merged,
            ("closed", false, _) => PrState::Closed,
            (_, false, true) => PrState::Draft,
            _ => PrState::Open,
        };
        PullRequest {
            id: self.number.to_string(),
            title: self.title,
            remote_branch: self.head.ref_name,
            remote_base_branch: self.base.ref_name,
            state,
            merged: self.merged,
            merge_commit_sha: self.merge_commit_sha,
        }
    }
}

/// GitHub-compatible hosted-repo provider, talking to the REST `pulls` API.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    api_base: String,
}

impl GitHubProvider {
    /// Build a provider for `owner/repo`, reading the token from
    /// [`TOKEN_ENV_VAR`]. Returns `ForgeError::AuthRequired` if unset.
    pub fn from_env(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, ForgeError> {
        let token = std::env::var(TOKEN_ENV_VAR).map_err(|_| ForgeError::AuthRequired)?;
        Ok(Self::new(token, owner, repo))
    }

    pub fn new(token: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token)).expect("token is ASCII"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers
    }

    fn pulls_url(&self) -> String {
        format!("{}/repos/{}/{}/pulls", self.api_base, self.owner, self.repo)
    }

    fn pull_url(&self, id: &str) -> String {
        format!("{}/{}", self.pulls_url(), id)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("failed to parse response: {e}"),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("invalid or expired token".into()),
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("permission denied: {message}")),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("github server error: {message}"),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl HostedRepoProvider for GitHubProvider {
    async fn create_pull_request(
        &self,
        title: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<PullRequest, ForgeError> {
        let body = CreatePrBody {
            title,
            head: head_branch,
            base: base_branch,
            draft: true,
        };
        let response = self
            .client
            .post(self.pulls_url())
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        let pr: GitHubPr = self.handle_response(response).await?;
        Ok(pr.into_pull_request())
    }

    async fn close_pull_request(&self, id: &str) -> Result<(), ForgeError> {
        let body = UpdatePrStateBody { state: "closed" };
        let response = self
            .client
            .patch(self.pull_url(id))
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        let _: GitHubPr = self.handle_response(response).await?;
        Ok(())
    }

    async fn get_pull_request(&self, id: &str) -> Result<PullRequest, ForgeError> {
        let response = self
            .client
            .get(self.pull_url(id))
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        let pr: GitHubPr = self.handle_response(response).await?;
        Ok(pr.into_pull_request())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_fails_fast_without_token() {
        std::env::remove_var(TOKEN_ENV_VAR);
        assert!(matches!(
            GitHubProvider::from_env("octocat", "hello-world"),
            Err(ForgeError::AuthRequired)
        ));
    }

    #[test]
    fn pr_state_normalizes_merged_over_closed() {
        let raw = GitHubPr {
            number: 7,
            title: "t".into(),
            head: GitHubRef { ref_name: "gg/abc".into() },
            base: GitHubRef { ref_name: "main".into() },
            state: "closed".into(),
            draft: false,
            merged: true,
            merge_commit_sha: Some("deadbeef".into()),
        };
        let pr = raw.into_pull_request();
        assert_eq!(pr.state, PrState::Merged);
        assert_eq!(pr.merge_commit_sha.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn pr_state_open_draft_is_draft() {
        let raw = GitHubPr {
            number: 1,
            title: "t".into(),
            head: GitHubRef { ref_name: "gg/abc".into() },
            base: GitHubRef { ref_name: "main".into() },
            state: "open".into(),
            draft: true,
            merged: false,
            merge_commit_sha: None,
        };
        assert_eq!(raw.into_pull_request().state, PrState::Draft);
    }

    #[test]
    fn parses_https_and_ssh_remote_urls() {
        assert_eq!(
            parse_github_url("https://github.com/octocat/hello-world.git"),
            Some(("octocat".to_string(), "hello-world".to_string()))
        );
        assert_eq!(
            parse_github_url("git@github.com:octocat/hello-world.git"),
            Some(("octocat".to_string(), "hello-world".to_string()))
        );
    }

    #[test]
    fn rejects_non_github_urls() {
        assert_eq!(parse_github_url("https://gitlab.com/octocat/hello-world"), None);
    }

    #[test]
    fn urls_are_scoped_to_owner_repo() {
        let provider = GitHubProvider::new("tok", "octocat", "hello-world");
        assert_eq!(
            provider.pulls_url(),
            "https://api.github.com/repos/octocat/hello-world/pulls"
        );
        assert_eq!(
            provider.pull_url("42"),
            "https://api.github.com/repos/octocat/hello-world/pulls/42"
        );
    }
}
