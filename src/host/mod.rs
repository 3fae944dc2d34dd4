// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hosted-repo API abstraction.
//!
//! The engine never touches git plumbing: every "push" is expressed
//! through the host's REST surface (ref reads/writes, merges, commit
//! lookups). This module defines the narrow seam — the
//! [`HostedRepoClient`] trait — so the orchestrator stays host-agnostic
//! and the whole pipeline is testable with an in-process fake.
//!
//! The production implementation lives in [`github`].

pub mod github;

pub use github::GitHubClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Repository-level metadata from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// The branch the host designates as primary.
    pub default_branch: String,
}

/// A branch ref as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
    /// Commit the branch ref currently points at.
    pub sha: String,
}

/// A commit as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    /// Author date, RFC3339. Absent for some odd host responses.
    pub date: Option<String>,
    pub author: Option<String>,
}

/// Live metadata for one repository, produced by the resolver.
///
/// Field names follow the wire contract the UI consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoDetails {
    pub default_branch: String,
    pub branches: Vec<BranchInfo>,
    /// Newest first, bounded to the configured page size (5).
    pub last_commits: Vec<CommitInfo>,
}

impl RepoDetails {
    /// The repository's tip commit, if the host returned any commits.
    pub fn last_commit(&self) -> Option<&CommitInfo> {
        self.last_commits.first()
    }
}

/// Narrow interface to a hosted-repo API.
///
/// One method per REST operation the engine needs; nothing more. All
/// failures surface as `RemoteApi` errors carrying the host's status
/// and message — a 404 from [`get_branch`](Self::get_branch) is the only
/// status callers branch on (see `RefSynchronizer`).
#[async_trait]
pub trait HostedRepoClient: Send + Sync + 'static {
    /// Fetch repository metadata (default branch).
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryInfo>;

    /// List all branches with protection flags and tip shas.
    async fn list_branches(&self, owner: &str, name: &str) -> Result<Vec<BranchInfo>>;

    /// List the most recent commits on any branch, newest first.
    async fn list_commits(
        &self,
        owner: &str,
        name: &str,
        per_page: usize,
    ) -> Result<Vec<CommitInfo>>;

    /// Read a single branch ref. Missing branch surfaces as a 404
    /// `RemoteApi` error.
    async fn get_branch(&self, owner: &str, name: &str, branch: &str) -> Result<BranchInfo>;

    /// Create a ref (e.g. `refs/heads/main`) pointing at `sha`.
    async fn create_ref(&self, owner: &str, name: &str, ref_name: &str, sha: &str) -> Result<()>;

    /// Move a branch ref to `sha`. With `force`, the host overwrites
    /// regardless of ancestry (non-fast-forward allowed).
    async fn update_ref(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<()>;

    /// Merge `head_sha` into `base`, returning the merge commit sha.
    /// `Ok(None)` means the host reported base already contains head
    /// (204). Conflicts and permission failures are `RemoteApi` errors.
    async fn merge(
        &self,
        owner: &str,
        name: &str,
        base: &str,
        head_sha: &str,
        message: &str,
    ) -> Result<Option<String>>;

    /// Look up a single commit.
    async fn get_commit(&self, owner: &str, name: &str, sha: &str) -> Result<CommitInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_details_last_commit() {
        let details = RepoDetails {
            default_branch: "main".to_string(),
            branches: vec![],
            last_commits: vec![
                CommitInfo {
                    sha: "newest".to_string(),
                    message: "feat: x".to_string(),
                    date: Some("2026-01-01T00:00:00Z".to_string()),
                    author: Some("alice".to_string()),
                },
                CommitInfo {
                    sha: "older".to_string(),
                    message: "init".to_string(),
                    date: None,
                    author: None,
                },
            ],
        };
        assert_eq!(details.last_commit().unwrap().sha, "newest");
    }

    #[test]
    fn test_repo_details_last_commit_empty() {
        let details = RepoDetails {
            default_branch: "main".to_string(),
            branches: vec![],
            last_commits: vec![],
        };
        assert!(details.last_commit().is_none());
    }

    #[test]
    fn test_repo_details_wire_shape_is_camel_case() {
        let details = RepoDetails {
            default_branch: "main".to_string(),
            branches: vec![BranchInfo {
                name: "main".to_string(),
                protected: true,
                sha: "abc".to_string(),
            }],
            last_commits: vec![],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["defaultBranch"], "main");
        assert!(json["lastCommits"].as_array().unwrap().is_empty());
        assert_eq!(json["branches"][0]["protected"], true);
    }

    #[test]
    fn test_branch_info_protected_defaults_false() {
        let branch: BranchInfo =
            serde_json::from_str(r#"{"name": "dev", "sha": "123"}"#).unwrap();
        assert!(!branch.protected);
    }
}
