//! Client for the external source-control host.
//!
//! The host owns pull-request storage; this system only reads PR metadata and
//! issues the one privileged write it is allowed: the merge itself.

use std::time::Duration;

use api_types::{MergeRequest, MergeResponse, Project};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHostError {
    #[error("pull request not found on the source-control host")]
    PullRequestNotFound,
    /// Upstream failure, surfaced verbatim with its origin status code.
    /// Merge is not idempotent-safe, so callers must never blindly retry.
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("request to source-control host failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Pull-request metadata as fetched from the host; used to validate that a
/// number refers to a real item and to title activity records.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    pub number: i64,
    pub title: String,
    pub state: String,
    pub merged: bool,
}

#[async_trait]
pub trait GitHost: Send + Sync {
    async fn fetch_pull_request(
        &self,
        project: &Project,
        pr_number: i64,
    ) -> Result<PullRequestInfo, GitHostError>;

    async fn merge_pull_request(
        &self,
        project: &Project,
        pr_number: i64,
        request: &MergeRequest,
    ) -> Result<MergeResponse, GitHostError>;
}

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubMergeResponse {
    merged: bool,
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
}

impl GitHubClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("review-gate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn upstream_error(response: reqwest::Response) -> GitHostError {
        let status = response.status().as_u16();
        let message = match response.json::<GitHubErrorBody>().await {
            Ok(body) => body.message.unwrap_or_else(|| "unknown upstream error".to_string()),
            Err(_) => "unknown upstream error".to_string(),
        };
        GitHostError::Upstream { status, message }
    }
}

#[async_trait]
impl GitHost for GitHubClient {
    async fn fetch_pull_request(
        &self,
        project: &Project,
        pr_number: i64,
    ) -> Result<PullRequestInfo, GitHostError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_url, project.repo_owner, project.repo_name, pr_number
        );
        let response = self.request(self.client.get(&url)).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GitHostError::PullRequestNotFound);
        }
        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        Ok(response.json::<PullRequestInfo>().await?)
    }

    async fn merge_pull_request(
        &self,
        project: &Project,
        pr_number: i64,
        request: &MergeRequest,
    ) -> Result<MergeResponse, GitHostError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}/merge",
            self.base_url, project.repo_owner, project.repo_name, pr_number
        );
        let body = serde_json::json!({
            "merge_method": request.strategy.as_str(),
            "commit_title": request.commit_title,
            "commit_message": request.commit_message,
        });
        let response = self.request(self.client.put(&url)).json(&body).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GitHostError::PullRequestNotFound);
        }
        if !response.status().is_success() {
            // 405 (not mergeable), 409 (head changed), auth failures: all pass
            // through with the origin status.
            return Err(Self::upstream_error(response).await);
        }

        let merged = response.json::<GitHubMergeResponse>().await?;
        Ok(MergeResponse {
            merged: merged.merged,
            sha: merged.sha,
        })
    }
}
