// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Result types for replication runs.

use crate::strategy::PushStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one target in a replication run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TargetStatus {
    /// The target branch was moved; `sha` is where it now points.
    Pushed { sha: String },
    /// The push to this target failed; the run may have continued.
    Failed { error: String },
    /// Never attempted because an earlier target failed and the run
    /// was not asked to continue on error.
    Skipped,
}

/// Per-target record in a [`RunResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutcome {
    pub repo_id: String,
    /// Display label of the target (nickname or name).
    pub repo_label: String,
    #[serde(flatten)]
    pub status: TargetStatus,
}

impl TargetOutcome {
    pub fn pushed(repo_id: impl Into<String>, label: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            repo_label: label.into(),
            status: TargetStatus::Pushed { sha: sha.into() },
        }
    }

    pub fn failed(repo_id: impl Into<String>, label: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            repo_label: label.into(),
            status: TargetStatus::Failed { error: error.into() },
        }
    }

    pub fn skipped(repo_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            repo_label: label.into(),
            status: TargetStatus::Skipped,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TargetStatus::Failed { .. })
    }
}

/// Result of a whole replication run: the source commit that was
/// replicated and one tagged outcome per requested target, in request
/// order. A run that failed some targets is still a value, not an
/// error — only local pre-flight problems (unknown ids, empty target
/// set, unresolvable source) abort before any outcome exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub source_repo_id: String,
    /// Commit replicated to every target.
    pub source_sha: String,
    pub strategy: PushStrategy,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<TargetOutcome>,
}

impl RunResult {
    /// True when every target was pushed.
    pub fn success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.status, TargetStatus::Pushed { .. }))
    }

    /// The first failure message, if any target failed.
    pub fn first_error(&self) -> Option<&str> {
        self.outcomes.iter().find_map(|o| match &o.status {
            TargetStatus::Failed { error } => Some(error.as_str()),
            _ => None,
        })
    }

    pub fn pushed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TargetStatus::Pushed { .. }))
            .count()
    }
}
