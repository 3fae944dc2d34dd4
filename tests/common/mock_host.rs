//! Mock HostedRepoClient for testing.
//!
//! Holds an in-memory fleet of repositories (branches, tips, commit
//! history) and records every API call for assertions. Failures are
//! injected per operation, optionally scoped to one repository, so
//! mixed-outcome replication runs can be exercised without a network.

use repo_replicator::error::{ReplicationError, Result};
use repo_replicator::host::{BranchInfo, CommitInfo, HostedRepoClient, RepositoryInfo};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A recorded API call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: String,
    /// `owner/name` the call addressed.
    pub repo: String,
    /// Operation-specific detail (branch, ref, sha).
    pub detail: String,
}

/// One repository's mock state.
#[derive(Debug, Clone, Default)]
struct MockRepo {
    default_branch: String,
    /// branch name -> tip sha
    branches: HashMap<String, String>,
    /// newest first
    commits: Vec<CommitInfo>,
}

/// A configured failure: next matching call errors instead.
struct FailRule {
    operation: String,
    /// When set, only calls against this `owner/name` fail.
    repo: Option<String>,
    status: u16,
    message: String,
}

/// Mock implementation of HostedRepoClient that records all calls.
///
/// # Example
/// ```rust,ignore
/// let host = MockHost::new();
/// host.add_repo("acme", "source", "main", "tip1").await;
///
/// // Configure a failure
/// host.fail_on("merge", Some("acme/mirror"), 409, "Merge conflict").await;
///
/// // Use in tests...
///
/// // Assert what was called
/// assert_eq!(host.calls_for("update_ref").await, 1);
/// ```
pub struct MockHost {
    repos: RwLock<HashMap<String, MockRepo>>,
    calls: RwLock<Vec<RecordedCall>>,
    fail_rules: RwLock<Vec<FailRule>>,
    merge_counter: AtomicUsize,
    total_calls: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            repos: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            fail_rules: RwLock::new(Vec::new()),
            merge_counter: AtomicUsize::new(0),
            total_calls: AtomicUsize::new(0),
        }
    }

    /// Seed a repository with one branch at `tip_sha` and a single
    /// commit of the same sha.
    pub async fn add_repo(&self, owner: &str, name: &str, default_branch: &str, tip_sha: &str) {
        let mut branches = HashMap::new();
        branches.insert(default_branch.to_string(), tip_sha.to_string());
        let repo = MockRepo {
            default_branch: default_branch.to_string(),
            branches,
            commits: vec![CommitInfo {
                sha: tip_sha.to_string(),
                message: format!("commit {tip_sha}"),
                date: Some("2026-03-01T09:00:00Z".to_string()),
                author: Some("alice".to_string()),
            }],
        };
        self.repos
            .write()
            .await
            .insert(format!("{owner}/{name}"), repo);
    }

    /// Seed a repository that exists but has no branches or commits.
    pub async fn add_empty_repo(&self, owner: &str, name: &str, default_branch: &str) {
        let repo = MockRepo {
            default_branch: default_branch.to_string(),
            ..Default::default()
        };
        self.repos
            .write()
            .await
            .insert(format!("{owner}/{name}"), repo);
    }

    /// Fail the named operation (optionally only against `owner/name`)
    /// with the given status on every matching call.
    pub async fn fail_on(&self, operation: &str, repo: Option<&str>, status: u16, message: &str) {
        self.fail_rules.write().await.push(FailRule {
            operation: operation.to_string(),
            repo: repo.map(|r| r.to_string()),
            status,
            message: message.to_string(),
        });
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls for one operation.
    pub async fn calls_for(&self, operation: &str) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Total number of API calls made, across all operations.
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Current tip sha of a branch, if the branch exists.
    pub async fn branch_tip(&self, owner: &str, name: &str, branch: &str) -> Option<String> {
        self.repos
            .read()
            .await
            .get(&format!("{owner}/{name}"))
            .and_then(|r| r.branches.get(branch).cloned())
    }

    async fn record(&self, operation: &str, repo: &str, detail: &str) -> Result<()> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.write().await.push(RecordedCall {
            operation: operation.to_string(),
            repo: repo.to_string(),
            detail: detail.to_string(),
        });

        let rules = self.fail_rules.read().await;
        for rule in rules.iter() {
            if rule.operation == operation
                && rule.repo.as_deref().map_or(true, |r| r == repo)
            {
                return Err(ReplicationError::remote(
                    operation,
                    rule.status,
                    rule.message.clone(),
                    None,
                ));
            }
        }
        Ok(())
    }

    async fn repo(&self, owner: &str, name: &str, operation: &str) -> Result<MockRepo> {
        self.repos
            .read()
            .await
            .get(&format!("{owner}/{name}"))
            .cloned()
            .ok_or_else(|| ReplicationError::remote(operation, 404, "Not Found", None))
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostedRepoClient for MockHost {
    async fn get_repository(&self, owner: &str, name: &str) -> Result<RepositoryInfo> {
        self.record("get_repository", &format!("{owner}/{name}"), "").await?;
        let repo = self.repo(owner, name, "get_repository").await?;
        Ok(RepositoryInfo {
            default_branch: repo.default_branch,
        })
    }

    async fn list_branches(&self, owner: &str, name: &str) -> Result<Vec<BranchInfo>> {
        self.record("list_branches", &format!("{owner}/{name}"), "").await?;
        let repo = self.repo(owner, name, "list_branches").await?;
        let mut branches: Vec<BranchInfo> = repo
            .branches
            .iter()
            .map(|(branch, sha)| BranchInfo {
                name: branch.clone(),
                protected: false,
                sha: sha.clone(),
            })
            .collect();
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    async fn list_commits(
        &self,
        owner: &str,
        name: &str,
        per_page: usize,
    ) -> Result<Vec<CommitInfo>> {
        self.record("list_commits", &format!("{owner}/{name}"), "").await?;
        let repo = self.repo(owner, name, "list_commits").await?;
        Ok(repo.commits.into_iter().take(per_page).collect())
    }

    async fn get_branch(&self, owner: &str, name: &str, branch: &str) -> Result<BranchInfo> {
        self.record("get_branch", &format!("{owner}/{name}"), branch).await?;
        let repo = self.repo(owner, name, "get_branch").await?;
        let sha = repo
            .branches
            .get(branch)
            .ok_or_else(|| ReplicationError::remote("get_branch", 404, "Branch not found", None))?;
        Ok(BranchInfo {
            name: branch.to_string(),
            protected: false,
            sha: sha.clone(),
        })
    }

    async fn create_ref(&self, owner: &str, name: &str, ref_name: &str, sha: &str) -> Result<()> {
        self.record("create_ref", &format!("{owner}/{name}"), ref_name).await?;
        let key = format!("{owner}/{name}");
        let mut repos = self.repos.write().await;
        let repo = repos
            .get_mut(&key)
            .ok_or_else(|| ReplicationError::remote("create_ref", 404, "Not Found", None))?;
        let branch = ref_name.strip_prefix("refs/heads/").unwrap_or(ref_name);
        if repo.branches.contains_key(branch) {
            return Err(ReplicationError::remote(
                "create_ref",
                422,
                "Reference already exists",
                None,
            ));
        }
        repo.branches.insert(branch.to_string(), sha.to_string());
        repo.commits.insert(
            0,
            CommitInfo {
                sha: sha.to_string(),
                message: format!("commit {sha}"),
                date: Some("2026-03-01T10:00:00Z".to_string()),
                author: Some("alice".to_string()),
            },
        );
        Ok(())
    }

    async fn update_ref(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        sha: &str,
        _force: bool,
    ) -> Result<()> {
        self.record("update_ref", &format!("{owner}/{name}"), sha).await?;
        let key = format!("{owner}/{name}");
        let mut repos = self.repos.write().await;
        let repo = repos
            .get_mut(&key)
            .ok_or_else(|| ReplicationError::remote("update_ref", 404, "Not Found", None))?;
        let tip = repo
            .branches
            .get_mut(branch)
            .ok_or_else(|| ReplicationError::remote("update_ref", 422, "Reference does not exist", None))?;
        *tip = sha.to_string();
        repo.commits.insert(
            0,
            CommitInfo {
                sha: sha.to_string(),
                message: format!("commit {sha}"),
                date: Some("2026-03-01T10:00:00Z".to_string()),
                author: Some("alice".to_string()),
            },
        );
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
        self.record("merge", &format!("{owner}/{name}"), head_sha).await?;
        let key = format!("{owner}/{name}");
        let mut repos = self.repos.write().await;
        let repo = repos
            .get_mut(&key)
            .ok_or_else(|| ReplicationError::remote("merge", 404, "Not Found", None))?;
        let tip = repo
            .branches
            .get_mut(base)
            .ok_or_else(|| ReplicationError::remote("merge", 404, "Base does not exist", None))?;

        // Base already contains head: the host answers 204.
        if tip.as_str() == head_sha {
            return Ok(None);
        }

        let merge_sha = format!("merge-{}", self.merge_counter.fetch_add(1, Ordering::SeqCst));
        *tip = merge_sha.clone();
        repo.commits.insert(
            0,
            CommitInfo {
                sha: merge_sha.clone(),
                message: message.to_string(),
                date: Some("2026-03-01T10:00:00Z".to_string()),
                author: Some("replicator".to_string()),
            },
        );
        Ok(Some(merge_sha))
    }

    async fn get_commit(&self, owner: &str, name: &str, sha: &str) -> Result<CommitInfo> {
        self.record("get_commit", &format!("{owner}/{name}"), sha).await?;
        let repo = self.repo(owner, name, "get_commit").await?;
        repo.commits
            .into_iter()
            .find(|c| c.sha == sha)
            .ok_or_else(|| ReplicationError::remote("get_commit", 404, "Commit not found", None))
    }
}
