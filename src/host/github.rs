// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! GitHub REST implementation of [`HostedRepoClient`].
//!
//! All requests carry the configured bearer token and the GitHub v3
//! Accept header. Non-success responses are turned into `RemoteApi`
//! errors carrying the status plus the `message` and
//! `documentation_url` fields GitHub puts in error bodies — callers
//! (and the wire error envelope) rely on those being preserved.
//!
//! Endpoints used:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | `get_repository` | `GET /repos/{owner}/{repo}` |
//! | `list_branches` | `GET /repos/{owner}/{repo}/branches` |
//! | `list_commits` | `GET /repos/{owner}/{repo}/commits?per_page=N` |
//! | `get_branch` | `GET /repos/{owner}/{repo}/branches/{branch}` |
//! | `create_ref` | `POST /repos/{owner}/{repo}/git/refs` |
//! | `update_ref` | `PATCH /repos/{owner}/{repo}/git/refs/heads/{branch}` |
//! | `merge` | `POST /repos/{owner}/{repo}/merges` |
//! | `get_commit` | `GET /repos/{owner}/{repo}/commits/{sha}` |

use super::{BranchInfo, CommitInfo, HostedRepoClient, RepositoryInfo};
use crate::config::HostConfig;
use crate::error::{ReplicationError, Result};
use crate::metrics;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Instant;
use tracing::{debug, warn};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// GitHub REST API client.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GitHubClient {
    /// Build a client from config. Fails with `Config` when the token
    /// is empty or the timeout/header material is unusable.
    pub fn new(config: &HostConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(ReplicationError::Config(
                "hosted-repo API token is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| ReplicationError::Config(format!("invalid token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout_duration())
            .build()
            .map_err(|e| ReplicationError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Turn a non-success response into a `RemoteApi` error, preserving
    /// the host's `message` and `documentation_url` body fields.
    async fn check(resp: Response, operation: &str) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            metrics::record_remote_call(operation, true);
            return Ok(resp);
        }
        metrics::record_remote_call(operation, false);

        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        let (message, documentation_url) = extract_error_fields(&body, status);
        warn!(operation, status = %status, message = %message, "hosted-repo API call failed");

        Err(ReplicationError::remote(
            operation,
            status.as_u16(),
            message,
            documentation_url,
        ))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
    ) -> Result<T> {
        let started = Instant::now();
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| remote_transport(operation, e))?;
        metrics::record_remote_call_latency(operation, started.elapsed());

        let resp = Self::check(resp, operation).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ReplicationError::remote_msg(operation, format!("malformed response: {e}")))
    }
}

fn remote_transport(operation: &str, e: reqwest::Error) -> ReplicationError {
    ReplicationError::remote_msg(operation, e.to_string())
}

/// Pull `message` / `documentation_url` out of a GitHub error body,
/// falling back to the status line when the body is not JSON.
fn extract_error_fields(body: &serde_json::Value, status: StatusCode) -> (String, Option<String>) {
    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    let documentation_url = body
        .get("documentation_url")
        .and_then(|d| d.as_str())
        .map(|s| s.to_string());
    (message, documentation_url)
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireRepository {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct WireBranch {
    name: String,
    #[serde(default)]
    protected: bool,
    commit: WireBranchTip,
}

#[derive(Debug, Deserialize)]
struct WireBranchTip {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WireCommit {
    sha: String,
    commit: WireCommitBody,
}

#[derive(Debug, Deserialize)]
struct WireCommitBody {
    message: String,
    author: Option<WireCommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct WireCommitAuthor {
    name: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMergeResult {
    sha: String,
}

impl From<WireBranch> for BranchInfo {
    fn from(w: WireBranch) -> Self {
        BranchInfo {
            name: w.name,
            protected: w.protected,
            sha: w.commit.sha,
        }
    }
}

impl From<WireCommit> for CommitInfo {
    fn from(w: WireCommit) -> Self {
        let (author, date) = match w.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        CommitInfo {
            sha: w.sha,
            message: w.commit.message,
            date,
            author,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl HostedRepoClient for GitHubClient {
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryInfo> {
        let repo: WireRepository = self
            .get_json(&format!("/repos/{owner}/{name}"), "get_repository")
            .await?;
        Ok(RepositoryInfo {
            default_branch: repo.default_branch,
        })
    }

    async fn list_branches(&self, owner: &str, name: &str) -> Result<Vec<BranchInfo>> {
        let branches: Vec<WireBranch> = self
            .get_json(&format!("/repos/{owner}/{name}/branches"), "list_branches")
            .await?;
        Ok(branches.into_iter().map(BranchInfo::from).collect())
    }

    async fn list_commits(
        &self,
        owner: &str,
        name: &str,
        per_page: usize,
    ) -> Result<Vec<CommitInfo>> {
        let commits: Vec<WireCommit> = self
            .get_json(
                &format!("/repos/{owner}/{name}/commits?per_page={per_page}"),
                "list_commits",
            )
            .await?;
        Ok(commits.into_iter().map(CommitInfo::from).collect())
    }

    async fn get_branch(&self, owner: &str, name: &str, branch: &str) -> Result<BranchInfo> {
        let branch: WireBranch = self
            .get_json(&format!("/repos/{owner}/{name}/branches/{branch}"), "get_branch")
            .await?;
        Ok(branch.into())
    }

    async fn create_ref(&self, owner: &str, name: &str, ref_name: &str, sha: &str) -> Result<()> {
        let operation = "create_ref";
        debug!(owner, name, ref_name, sha, "creating ref");
        let resp = self
            .http
            .post(self.url(&format!("/repos/{owner}/{name}/git/refs")))
            .json(&json!({ "ref": ref_name, "sha": sha }))
            .send()
            .await
            .map_err(|e| remote_transport(operation, e))?;
        Self::check(resp, operation).await?;
        Ok(())
    }

    async fn update_ref(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<()> {
        let operation = "update_ref";
        debug!(owner, name, branch, sha, force, "updating ref");
        let resp = self
            .http
            .patch(self.url(&format!("/repos/{owner}/{name}/git/refs/heads/{branch}")))
            .json(&json!({ "sha": sha, "force": force }))
            .send()
            .await
            .map_err(|e| remote_transport(operation, e))?;
        Self::check(resp, operation).await?;
        Ok(())
    }

    async fn merge(
        &self,
        owner: &str,
        name: &str,
        base: &str,
        head_sha: &str,
        message: &str,
    ) -> Result<Option<String>> {
        let operation = "merge";
        debug!(owner, name, base, head = head_sha, "merging via host API");
        let resp = self
            .http
            .post(self.url(&format!("/repos/{owner}/{name}/merges")))
            .json(&json!({
                "base": base,
                "head": head_sha,
                "commit_message": message,
            }))
            .send()
            .await
            .map_err(|e| remote_transport(operation, e))?;

        // 204: base already contains head, nothing to merge.
        if resp.status() == StatusCode::NO_CONTENT {
            metrics::record_remote_call(operation, true);
            return Ok(None);
        }

        let resp = Self::check(resp, operation).await?;
        let merged: WireMergeResult = resp
            .json()
            .await
            .map_err(|e| ReplicationError::remote_msg(operation, format!("malformed response: {e}")))?;
        Ok(Some(merged.sha))
    }

    async fn get_commit(&self, owner: &str, name: &str, sha: &str) -> Result<CommitInfo> {
        let commit: WireCommit = self
            .get_json(&format!("/repos/{owner}/{name}/commits/{sha}"), "get_commit")
            .await?;
        Ok(commit.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> HostConfig {
        HostConfig {
            token: "t".to_string(),
            ..Default::default()
        }
    }

    // ── Construction ────────────────────────────────────────────────────

    #[test]
    fn new_rejects_empty_token() {
        let config = HostConfig::default();
        assert!(GitHubClient::new(&config).is_err());
    }

    #[test]
    fn new_trims_trailing_slash() {
        let config = HostConfig {
            api_url: "https://ghe.example.com/api/v3/".to_string(),
            ..test_config()
        };
        let client = GitHubClient::new(&config).unwrap();
        assert_eq!(
            client.url("/repos/acme/widgets"),
            "https://ghe.example.com/api/v3/repos/acme/widgets"
        );
    }

    // ── Error body extraction ───────────────────────────────────────────

    #[test]
    fn extract_error_fields_full_body() {
        let body = json!({
            "message": "Merge conflict",
            "documentation_url": "https://docs.github.com/rest/branches/branches"
        });
        let (msg, doc) = extract_error_fields(&body, StatusCode::CONFLICT);
        assert_eq!(msg, "Merge conflict");
        assert_eq!(
            doc.as_deref(),
            Some("https://docs.github.com/rest/branches/branches")
        );
    }

    #[test]
    fn extract_error_fields_non_json_body() {
        let (msg, doc) = extract_error_fields(&serde_json::Value::Null, StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "Bad Gateway");
        assert!(doc.is_none());
    }

    // ── Wire mapping ────────────────────────────────────────────────────

    #[test]
    fn wire_branch_maps_to_branch_info() {
        let wire: WireBranch = serde_json::from_value(json!({
            "name": "main",
            "protected": true,
            "commit": {"sha": "abc123", "url": "ignored"}
        }))
        .unwrap();
        let branch: BranchInfo = wire.into();
        assert_eq!(branch.name, "main");
        assert!(branch.protected);
        assert_eq!(branch.sha, "abc123");
    }

    #[test]
    fn wire_branch_protected_defaults_false() {
        let wire: WireBranch = serde_json::from_value(json!({
            "name": "dev",
            "commit": {"sha": "def456"}
        }))
        .unwrap();
        assert!(!BranchInfo::from(wire).protected);
    }

    #[test]
    fn wire_commit_maps_author_fields() {
        let wire: WireCommit = serde_json::from_value(json!({
            "sha": "abc123",
            "commit": {
                "message": "fix: thing",
                "author": {"name": "alice", "date": "2026-02-01T12:00:00Z"}
            }
        }))
        .unwrap();
        let commit: CommitInfo = wire.into();
        assert_eq!(commit.sha, "abc123");
        assert_eq!(commit.message, "fix: thing");
        assert_eq!(commit.author.as_deref(), Some("alice"));
        assert_eq!(commit.date.as_deref(), Some("2026-02-01T12:00:00Z"));
    }

    #[test]
    fn wire_commit_tolerates_missing_author() {
        let wire: WireCommit = serde_json::from_value(json!({
            "sha": "abc123",
            "commit": {"message": "import"}
        }))
        .unwrap();
        let commit: CommitInfo = wire.into();
        assert!(commit.author.is_none());
        assert!(commit.date.is_none());
    }

    #[test]
    fn wire_merge_result_parses() {
        let merged: WireMergeResult =
            serde_json::from_value(json!({"sha": "mergesha", "node_id": "x"})).unwrap();
        assert_eq!(merged.sha, "mergesha");
    }
}
