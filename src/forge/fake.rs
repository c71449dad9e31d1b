//! forge::fake
//!
//! A deterministic in-memory [`HostedRepoProvider`], used by the engine's
//! own test suite to exercise `upload`/`sync` without a real network call.
//! Modeled on the mock-forge pattern used elsewhere in this codebase:
//! shared state behind a mutex, sequential ids, and a way for the test to
//! reach in and flip a PR's state (simulating an external merge).

use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::model::PrState;
use crate::forge::{ForgeError, HostedRepoProvider, PullRequest};

struct FakeProviderInner {
    next_id: u64,
    pull_requests: Vec<PullRequest>,
}

/// A fake hosted-repo provider backed by an in-process list.
pub struct FakeProvider {
    inner: Mutex<FakeProviderInner>,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FakeProviderInner {
                next_id: 0,
                pull_requests: Vec::new(),
            }),
        }
    }

    /// Test hook: mark a PR as merged with a given merge commit sha, as if
    /// a reviewer had merged it on the host.
    pub fn mark_merged(&self, id: &str, merge_commit_sha: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(pr) = inner.pull_requests.iter_mut().find(|p| p.id == id) {
            pr.state = PrState::Merged;
            pr.merged = true;
            pr.merge_commit_sha = Some(merge_commit_sha.to_string());
        }
    }

    /// Test hook: list every PR ever created, in creation order.
    pub fn all(&self) -> Vec<PullRequest> {
        self.inner.lock().unwrap().pull_requests.clone()
    }
}

#[async_trait]
impl HostedRepoProvider for FakeProvider {
    async fn create_pull_request(
        &self,
        title: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<PullRequest, ForgeError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id.to_string();
        inner.next_id += 1;
        let pr = PullRequest {
            id,
            title: title.to_string(),
            remote_branch: head_branch.to_string(),
            remote_base_branch: base_branch.to_string(),
            state: PrState::Draft,
            merged: false,
            merge_commit_sha: None,
        };
        inner.pull_requests.push(pr.clone());
        Ok(pr)
    }

    async fn close_pull_request(&self, id: &str) -> Result<(), ForgeError> {
        let mut inner = self.inner.lock().unwrap();
        let pr = inner
            .pull_requests
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ForgeError::NotFound(id.to_string()))?;
        pr.state = PrState::Closed;
        Ok(())
    }

    async fn get_pull_request(&self, id: &str) -> Result<PullRequest, ForgeError> {
        let inner = self.inner.lock().unwrap();
        inner
            .pull_requests
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let provider = FakeProvider::new();
        let created = provider
            .create_pull_request("title", "head", "base")
            .await
            .unwrap();
        assert_eq!(created.state, PrState::Draft);

        let fetched = provider.get_pull_request(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn close_marks_closed() {
        let provider = FakeProvider::new();
        let pr = provider.create_pull_request("t", "h", "b").await.unwrap();
        provider.close_pull_request(&pr.id).await.unwrap();
        assert_eq!(provider.get_pull_request(&pr.id).await.unwrap().state, PrState::Closed);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let provider = FakeProvider::new();
        assert!(matches!(
            provider.get_pull_request("999").await,
            Err(ForgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn mark_merged_sets_state_and_sha() {
        let provider = FakeProvider::new();
        let pr = provider.create_pull_request("t", "h", "b").await.unwrap();
        provider.mark_merged(&pr.id, "deadbeef");
        let merged = provider.get_pull_request(&pr.id).await.unwrap();
        assert_eq!(merged.state, PrState::Merged);
        assert!(merged.merged);
        assert_eq!(merged.merge_commit_sha.as_deref(), Some("deadbeef"));
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let provider = FakeProvider::new();
        let a = provider.create_pull_request("a", "h", "b").await.unwrap();
        let b = provider.create_pull_request("b", "h", "b").await.unwrap();
        assert_eq!(a.id, "0");
        assert_eq!(b.id, "1");
    }
}
