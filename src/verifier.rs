// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Post-replication convergence check.
//!
//! Answers one question: do the targets' recorded tips match the
//! source's recorded tip? The check refreshes each target from the
//! host first so it compares fresh data, but a refresh failure is
//! tolerated — the comparison then runs against the stale row, which
//! can only make the check more conservative, never falsely green
//! against data the engine has never seen.

use crate::error::{ReplicationError, Result};
use crate::host::HostedRepoClient;
use crate::metrics;
use crate::registry::RepositoryRegistry;
use crate::resolver::RemoteRepoResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a convergence check: a single boolean and a generic
/// message. The result deliberately does not say which targets
/// diverged or what commit was expected; that detail stays in the
/// structured logs, never on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub success: bool,
    pub message: String,
}

/// Verifies that targets converged on the source commit.
pub struct ConvergenceVerifier<H: HostedRepoClient> {
    registry: Arc<RepositoryRegistry>,
    resolver: RemoteRepoResolver<H>,
}

impl<H: HostedRepoClient> ConvergenceVerifier<H> {
    pub fn new(registry: Arc<RepositoryRegistry>, client: Arc<H>, commit_page_size: usize) -> Self {
        Self {
            registry,
            resolver: RemoteRepoResolver::new(client, commit_page_size),
        }
    }

    /// Compare each target's recorded tip against the source's.
    ///
    /// Fails with `Precondition` — before any remote call — when the
    /// source has no recorded commit to compare against. Unknown ids
    /// fail with `RepositoryNotFound`. Comparison is exact string
    /// equality on the stored commit identifiers; a target with no
    /// recorded commit counts as a mismatch.
    #[instrument(skip(self, target_ids), fields(targets = target_ids.len()))]
    pub async fn verify(&self, source_id: &str, target_ids: &[String]) -> Result<VerificationResult> {
        let source = self.registry.require(source_id).await?;
        let expected = source.last_commit.clone().ok_or_else(|| {
            ReplicationError::Precondition(
                "source repository has no recorded commit to verify against".to_string(),
            )
        })?;

        let mut targets = Vec::with_capacity(target_ids.len());
        for id in target_ids {
            targets.push(self.registry.require(id).await?);
        }

        // Refresh each target so the comparison sees current host
        // state. A failed refresh is logged and the stale row used.
        for target in &targets {
            match self.resolver.resolve(target).await {
                Ok(details) => {
                    if let Err(e) = self.registry.record_refresh(&target.id, &details).await {
                        warn!(target = %target.id, error = %e, "Failed to persist refresh during verify");
                    }
                }
                Err(e) => {
                    warn!(target = %target.id, error = %e, "Failed to refresh target during verify");
                }
            }
        }

        let mut mismatched = 0usize;
        for id in target_ids {
            let row = self.registry.require(id).await?;
            if row.last_commit.as_deref() != Some(expected.as_str()) {
                warn!(
                    target = %id,
                    expected = %expected,
                    found = ?row.last_commit,
                    "Target tip does not match source"
                );
                mismatched += 1;
            }
        }

        let success = mismatched == 0;
        metrics::record_verification(success);

        if success {
            info!(expected = %expected, "All targets converged on source commit");
        } else {
            warn!(
                expected = %expected,
                mismatched,
                "Convergence check found diverged targets"
            );
        }

        Ok(VerificationResult {
            success,
            message: if success {
                "All repositories are in sync".to_string()
            } else {
                "Some repositories may not be in sync".to_string()
            },
        })
    }
}
