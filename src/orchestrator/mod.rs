// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication orchestrator.
//!
//! Drives a full replication run: resolve the source tip once, then
//! push it to each requested target in order, recording a tagged
//! outcome per target. Targets are processed sequentially — the host
//! rate-limits aggressively, and a run is small (a handful of mirrors),
//! so fan-out buys nothing but harder failure attribution.
//!
//! # Failure semantics
//!
//! Local pre-flight problems (empty target set, unknown ids, a source
//! that cannot be resolved) abort the run before any target is touched
//! and surface as `Err`. Once pushing starts, a per-target failure is
//! data, not an error: the target gets a `Failed` outcome and, unless
//! the caller asked to continue on error, every remaining target is
//! marked `Skipped`. The caller always learns exactly which mirrors
//! moved.

pub mod types;

pub use types::{RunResult, TargetOutcome, TargetStatus};

use crate::error::{ReplicationError, Result};
use crate::host::{HostedRepoClient, RepoDetails};
use crate::metrics;
use crate::refsync::RefSynchronizer;
use crate::registry::{Repository, RepositoryRegistry};
use crate::resolver::{parse_repo_url, RemoteRepoResolver};
use crate::strategy::{PushStrategy, PushStrategyExecutor};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Coordinates resolver, ref synchronizer and push strategies over the
/// registry.
pub struct ReplicationOrchestrator<H: HostedRepoClient> {
    registry: Arc<RepositoryRegistry>,
    client: Arc<H>,
    resolver: RemoteRepoResolver<H>,
    refsync: RefSynchronizer<H>,
    executor: PushStrategyExecutor<H>,
}

impl<H: HostedRepoClient> ReplicationOrchestrator<H> {
    pub fn new(
        registry: Arc<RepositoryRegistry>,
        client: Arc<H>,
        commit_page_size: usize,
    ) -> Self {
        Self {
            registry,
            resolver: RemoteRepoResolver::new(Arc::clone(&client), commit_page_size),
            refsync: RefSynchronizer::new(Arc::clone(&client)),
            executor: PushStrategyExecutor::new(Arc::clone(&client)),
            client,
        }
    }

    /// Refresh a repository's cached metadata from the host
    /// (the `getLastCommit` operation).
    ///
    /// Resolves live metadata and persists it to the registry before
    /// returning, so the stored row always reflects the response the
    /// caller saw.
    #[instrument(skip(self))]
    pub async fn refresh(&self, repo_id: &str) -> Result<RepoDetails> {
        let repo = self.registry.require(repo_id).await?;
        let details = self.resolver.resolve(&repo).await?;
        self.registry.record_refresh(repo_id, &details).await?;
        metrics::record_refresh(true);
        Ok(details)
    }

    /// Replicate the source repository's tip to each target.
    ///
    /// With `continue_on_error = false` (the default wire behavior) the
    /// first failed target stops the run and the rest are `Skipped`;
    /// with `true`, every target is attempted regardless.
    #[instrument(skip(self, target_ids), fields(targets = target_ids.len(), %strategy))]
    pub async fn push(
        &self,
        source_id: &str,
        target_ids: &[String],
        strategy: PushStrategy,
        continue_on_error: bool,
    ) -> Result<RunResult> {
        if target_ids.is_empty() {
            return Err(ReplicationError::Validation(
                "no target repositories specified".to_string(),
            ));
        }

        let started = Instant::now();
        let started_at = Utc::now();

        // Pre-flight: every id must exist before anything is pushed.
        let source = self.registry.require(source_id).await?;
        let mut targets = Vec::with_capacity(target_ids.len());
        for id in target_ids {
            targets.push(self.registry.require(id).await?);
        }

        // Resolve the live source tip once; every target receives the
        // same commit even if the source moves mid-run.
        let source_coords = parse_repo_url(&source.url)?;
        let source_branch = self.resolver.default_branch(&source).await?;
        let source_tip = self
            .client
            .get_branch(&source_coords.owner, &source_coords.name, &source_branch)
            .await?;
        let source_sha = source_tip.sha.clone();

        info!(
            source = %source.display_label(),
            branch = %source_branch,
            sha = %source_sha,
            %strategy,
            "Starting replication run"
        );

        let mut outcomes = Vec::with_capacity(targets.len());
        let mut aborted = false;

        for target in &targets {
            if aborted {
                outcomes.push(TargetOutcome::skipped(&target.id, target.display_label()));
                continue;
            }

            match self
                .push_one(target, &source_sha, &source, strategy)
                .await
            {
                Ok(sha) => {
                    metrics::record_push_outcome(strategy.as_str(), "pushed");
                    outcomes.push(TargetOutcome::pushed(&target.id, target.display_label(), sha));
                }
                Err(e) => {
                    error!(
                        target = %target.display_label(),
                        error = %e,
                        "Push to target failed"
                    );
                    metrics::record_push_outcome(strategy.as_str(), "failed");
                    outcomes.push(TargetOutcome::failed(
                        &target.id,
                        target.display_label(),
                        e.to_string(),
                    ));
                    if !continue_on_error {
                        aborted = true;
                    }
                }
            }
        }

        let result = RunResult {
            source_repo_id: source.id.clone(),
            source_sha,
            strategy,
            started_at,
            outcomes,
        };

        metrics::record_run(result.success(), started.elapsed());
        if result.success() {
            info!(
                pushed = result.pushed_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Replication run complete"
            );
        } else {
            warn!(
                pushed = result.pushed_count(),
                total = result.outcomes.len(),
                "Replication run finished with failures"
            );
        }

        Ok(result)
    }

    /// Push the source commit to one target: parse its URL, resolve
    /// its own default branch, make sure that branch exists, apply the
    /// strategy, persist the result.
    async fn push_one(
        &self,
        target: &Repository,
        source_sha: &str,
        source: &Repository,
        strategy: PushStrategy,
    ) -> Result<String> {
        let coords = self.resolver.coordinates(target)?;

        // The push lands on the target's default branch, which may
        // not share the source's branch name.
        let branch = self.resolver.default_branch(target).await?;

        self.refsync
            .ensure_branch(&coords.owner, &coords.name, &branch, source_sha)
            .await?;

        let sha = self
            .executor
            .apply(
                strategy,
                &coords.owner,
                &coords.name,
                &branch,
                source_sha,
                source.display_label(),
            )
            .await?;

        self.registry.record_push(&target.id, &sha).await?;
        Ok(sha)
    }
}
