// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Repository URL parsing and live metadata resolution.
//!
//! A stored repository record only carries a URL; everything else the
//! engine needs (default branch, branch tips, recent commits) is fetched
//! live from the host. [`parse_repo_url`] turns a URL into the
//! `(owner, name)` pair the host API addresses repositories by, and
//! [`RemoteRepoResolver`] fans out the three metadata reads
//! concurrently.

use crate::error::{ReplicationError, Result};
use crate::host::{HostedRepoClient, RepoDetails};
use crate::registry::Repository;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::metrics;

/// Owner/name pair extracted from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub name: String,
}

/// Parse a hosted-repo URL into owner and repository name.
///
/// Accepted shapes: `https://<host>/<owner>/<name>`, with or without a
/// scheme, with an optional `.git` suffix on the name, and with extra
/// trailing path segments (`/tree/main`, `/pull/42`) tolerated and
/// ignored. The host must look like a hostname (contain a dot); owner
/// and name must be non-empty.
///
/// Parsing never goes near the network: a malformed URL fails here and
/// the operation that needed it aborts with zero remote calls.
pub fn parse_repo_url(url: &str) -> Result<RepoCoordinates> {
    let invalid = || ReplicationError::InvalidUrl {
        url: url.to_string(),
    };

    let rest = match url.split_once("://") {
        Some((scheme, rest)) => {
            if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid());
            }
            rest
        }
        None => url,
    };

    let mut segments = rest.split('/');
    let host = segments.next().ok_or_else(invalid)?;
    if !host.contains('.') || host.is_empty() {
        return Err(invalid());
    }

    let owner = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let raw_name = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let name = raw_name.strip_suffix(".git").unwrap_or(raw_name);
    if name.is_empty() {
        return Err(invalid());
    }

    Ok(RepoCoordinates {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// Resolves a stored repository record into live host metadata.
pub struct RemoteRepoResolver<H: HostedRepoClient> {
    client: Arc<H>,
    commit_page_size: usize,
}

impl<H: HostedRepoClient> RemoteRepoResolver<H> {
    pub fn new(client: Arc<H>, commit_page_size: usize) -> Self {
        Self {
            client,
            commit_page_size,
        }
    }

    /// Fetch live metadata for a stored repository.
    ///
    /// The three reads (repository, branches, commits) run concurrently;
    /// the first failure cancels the rest and fails the resolve. Results
    /// are combined only when all three succeed, so a `RepoDetails` is
    /// always internally consistent modulo host-side races.
    #[instrument(skip(self, repo), fields(repo_id = %repo.id))]
    pub async fn resolve(&self, repo: &Repository) -> Result<RepoDetails> {
        let coords = parse_repo_url(&repo.url)?;
        let start = Instant::now();

        let (info, branches, commits) = tokio::try_join!(
            self.client.get_repository(&coords.owner, &coords.name),
            self.client.list_branches(&coords.owner, &coords.name),
            self.client
                .list_commits(&coords.owner, &coords.name, self.commit_page_size),
        )?;

        debug!(
            owner = %coords.owner,
            name = %coords.name,
            branches = branches.len(),
            commits = commits.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Resolved repository metadata"
        );
        metrics::record_resolve(start.elapsed());

        Ok(RepoDetails {
            default_branch: info.default_branch,
            branches,
            last_commits: commits,
        })
    }

    /// The host-designated default branch for a stored repository.
    pub async fn default_branch(&self, repo: &Repository) -> Result<String> {
        let coords = parse_repo_url(&repo.url)?;
        let info = self.client.get_repository(&coords.owner, &coords.name).await?;
        Ok(info.default_branch)
    }

    /// Parse the record's URL without touching the network.
    pub fn coordinates(&self, repo: &Repository) -> Result<RepoCoordinates> {
        parse_repo_url(&repo.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(owner: &str, name: &str) -> RepoCoordinates {
        RepoCoordinates {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_parse_canonical_url() {
        assert_eq!(
            parse_repo_url("https://github.com/acme/widgets").unwrap(),
            coords("acme", "widgets")
        );
    }

    #[test]
    fn test_parse_strips_git_suffix() {
        assert_eq!(
            parse_repo_url("https://github.com/acme/widgets.git").unwrap(),
            coords("acme", "widgets")
        );
    }

    #[test]
    fn test_parse_without_scheme() {
        assert_eq!(
            parse_repo_url("github.com/acme/widgets").unwrap(),
            coords("acme", "widgets")
        );
    }

    #[test]
    fn test_parse_tolerates_trailing_segments() {
        assert_eq!(
            parse_repo_url("https://github.com/acme/widgets/tree/main").unwrap(),
            coords("acme", "widgets")
        );
        assert_eq!(
            parse_repo_url("https://github.com/acme/widgets/pull/42/files").unwrap(),
            coords("acme", "widgets")
        );
    }

    #[test]
    fn test_parse_other_hosts() {
        assert_eq!(
            parse_repo_url("https://github.example.internal/team/svc").unwrap(),
            coords("team", "svc")
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in [
            "not-a-url",
            "",
            "https://github.com",
            "https://github.com/acme",
            "https://github.com//widgets",
            "https://github.com/acme/",
            "localhost/acme/widgets",
            "https://github.com/acme/.git",
            "ht!tp://github.com/acme/widgets",
        ] {
            let err = parse_repo_url(bad).unwrap_err();
            assert_eq!(err.kind(), "InvalidUrlFormat", "should reject: {bad}");
        }
    }

    #[test]
    fn test_invalid_url_error_carries_original() {
        let err = parse_repo_url("not-a-url").unwrap_err();
        assert!(err.to_string().contains("not-a-url"));
    }
}
