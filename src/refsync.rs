// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Branch existence reconciliation.
//!
//! Before the engine pushes to a target branch, the branch has to exist
//! on the target. [`RefSynchronizer::ensure_branch`] reads the branch
//! and, on a 404 only, creates it from a fallback commit. Any other
//! failure (auth, rate limit, transport) propagates untouched — a 403
//! must never be mistaken for "missing".

use crate::error::Result;
use crate::host::{BranchInfo, HostedRepoClient};
use std::sync::Arc;
use tracing::info;

/// Ensures branches exist on targets before refs are moved.
pub struct RefSynchronizer<H: HostedRepoClient> {
    client: Arc<H>,
}

impl<H: HostedRepoClient> RefSynchronizer<H> {
    pub fn new(client: Arc<H>) -> Self {
        Self { client }
    }

    /// Make sure `branch` exists on `owner/name`, returning its tip.
    ///
    /// Missing branch (404) is created pointing at `fallback_sha` and
    /// re-read so the returned tip reflects what the host actually
    /// stored. Idempotent: an existing branch is returned as-is, at
    /// whatever commit it currently points to.
    pub async fn ensure_branch(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        fallback_sha: &str,
    ) -> Result<BranchInfo> {
        match self.client.get_branch(owner, name, branch).await {
            Ok(existing) => Ok(existing),
            Err(e) if e.is_not_found() => {
                info!(owner, name, branch, sha = fallback_sha, "Creating missing branch");
                self.client
                    .create_ref(owner, name, &format!("refs/heads/{branch}"), fallback_sha)
                    .await?;
                self.client.get_branch(owner, name, branch).await
            }
            Err(e) => Err(e),
        }
    }
}
