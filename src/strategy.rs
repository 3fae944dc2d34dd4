// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Push strategies.
//!
//! Three caller-selectable ways to move a target branch to the source
//! tip, all expressed through the host API (no git transport):
//!
//! - `regular` — merge the source commit into the target branch on the
//!   host. History is preserved; divergent targets produce a merge
//!   commit, conflicting ones fail.
//! - `force` — point the target ref directly at the source commit,
//!   discarding whatever the target had.
//! - `force-with-lease` — accepted as a distinct wire value but
//!   identical to `force` here: the ref update is one unconditional
//!   host call, and the host API offers no compare-and-swap to hang a
//!   lease check on.

use crate::error::{ReplicationError, Result};
use crate::host::HostedRepoClient;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// How a target branch is moved to the source commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushStrategy {
    /// Merge the source commit into the target branch.
    #[serde(rename = "regular")]
    Regular,
    /// Overwrite the target ref with the source commit.
    #[serde(rename = "force")]
    Force,
    /// Same as [`Force`](Self::Force); see module docs.
    #[serde(rename = "force-with-lease")]
    ForceWithLease,
}

impl PushStrategy {
    /// Wire name, matching the serde rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Force => "force",
            Self::ForceWithLease => "force-with-lease",
        }
    }
}

impl fmt::Display for PushStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PushStrategy {
    type Err = ReplicationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regular" => Ok(Self::Regular),
            "force" => Ok(Self::Force),
            "force-with-lease" => Ok(Self::ForceWithLease),
            other => Err(ReplicationError::Validation(format!(
                "unknown push strategy: {other}"
            ))),
        }
    }
}

/// Applies a [`PushStrategy`] to one target branch.
pub struct PushStrategyExecutor<H: HostedRepoClient> {
    client: Arc<H>,
}

impl<H: HostedRepoClient> PushStrategyExecutor<H> {
    pub fn new(client: Arc<H>) -> Self {
        Self { client }
    }

    /// Move `owner/name@branch` to `source_sha`, returning the commit
    /// the branch ends up at.
    ///
    /// For the force strategies that is always `source_sha`. For
    /// `regular` it is the merge commit the host created, or
    /// `source_sha` when the host reports the branch already contains
    /// it (nothing to merge).
    pub async fn apply(
        &self,
        strategy: PushStrategy,
        owner: &str,
        name: &str,
        branch: &str,
        source_sha: &str,
        source_label: &str,
    ) -> Result<String> {
        match strategy {
            PushStrategy::Force | PushStrategy::ForceWithLease => {
                self.client
                    .update_ref(owner, name, branch, source_sha, true)
                    .await?;
                info!(owner, name, branch, sha = source_sha, %strategy, "Force-updated ref");
                Ok(source_sha.to_string())
            }
            PushStrategy::Regular => {
                let message = format!(
                    "Replicate {source_label} via {strategy} push"
                );
                let merged = self
                    .client
                    .merge(owner, name, branch, source_sha, &message)
                    .await?;
                match merged {
                    Some(merge_sha) => {
                        info!(owner, name, branch, sha = %merge_sha, "Merged source into target");
                        Ok(merge_sha)
                    }
                    None => {
                        debug!(owner, name, branch, "Target already contains source commit");
                        Ok(source_sha.to_string())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_wire_names() {
        assert_eq!(PushStrategy::Regular.to_string(), "regular");
        assert_eq!(PushStrategy::Force.to_string(), "force");
        assert_eq!(PushStrategy::ForceWithLease.to_string(), "force-with-lease");
    }

    #[test]
    fn test_strategy_from_str_roundtrip() {
        for s in [
            PushStrategy::Regular,
            PushStrategy::Force,
            PushStrategy::ForceWithLease,
        ] {
            assert_eq!(s.as_str().parse::<PushStrategy>().unwrap(), s);
        }
    }

    #[test]
    fn test_strategy_from_str_rejects_unknown() {
        let err = "rebase".parse::<PushStrategy>().unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_strategy_serde_matches_wire() {
        assert_eq!(
            serde_json::to_string(&PushStrategy::ForceWithLease).unwrap(),
            "\"force-with-lease\""
        );
        let parsed: PushStrategy = serde_json::from_str("\"regular\"").unwrap();
        assert_eq!(parsed, PushStrategy::Regular);
    }
}
