//! # Repo Replicator
//!
//! A replication engine for keeping a fleet of hosted repositories in
//! lockstep with a designated master.
//!
//! ## Architecture
//!
//! The engine sits between a small RPC endpoint (called by the UI) and
//! the hosted-repo REST API, with a SQLite registry of tracked
//! repositories in the middle:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                           repo-replicator                            │
//! │                                                                      │
//! │  ┌──────────┐    ┌──────────────────────────┐    ┌────────────────┐  │
//! │  │ RPC      │───►│ ReplicationOrchestrator  │───►│ HostedRepo     │  │
//! │  │ endpoint │    │ (resolve, ensure, push)  │    │ Client (REST)  │  │
//! │  └──────────┘    └──────────────────────────┘    └────────────────┘  │
//! │       │                      │                           ▲           │
//! │       │                      ▼                           │           │
//! │       │           ┌────────────────────┐      ┌────────────────────┐ │
//! │       └──────────►│ RepositoryRegistry │      │ConvergenceVerifier │ │
//! │                   │ (SQLite)           │◄─────│ (refresh + compare)│ │
//! │                   └────────────────────┘      └────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Replication Flow
//!
//! 1. **Resolve**: read the source's default branch and live tip
//! 2. **Ensure**: create the branch on each target if it is missing
//! 3. **Push**: merge (`regular`) or overwrite (`force`) per strategy
//! 4. **Verify**: refresh each target and compare recorded tips
//!
//! ## Usage
//!
//! ```rust,no_run
//! use repo_replicator::config::EngineConfig;
//! use repo_replicator::host::GitHubClient;
//! use repo_replicator::orchestrator::ReplicationOrchestrator;
//! use repo_replicator::registry::RepositoryRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> repo_replicator::Result<()> {
//!     let config = EngineConfig::from_env()?;
//!     let registry = Arc::new(RepositoryRegistry::new(&config.registry).await?);
//!     let client = Arc::new(GitHubClient::new(&config.host)?);
//!
//!     let orchestrator =
//!         ReplicationOrchestrator::new(registry, client, config.host.commit_page_size);
//!     let details = orchestrator.refresh("some-repo-id").await?;
//!     println!("tip: {:?}", details.last_commit());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod metrics;
pub mod orchestrator;
pub mod refsync;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod strategy;
pub mod verifier;

// Re-exports for convenience
pub use config::{EngineConfig, HostConfig, HttpConfig, RegistryConfig};
pub use error::{ReplicationError, Result};
pub use host::{GitHubClient, HostedRepoClient, RepoDetails};
pub use orchestrator::{ReplicationOrchestrator, RunResult, TargetOutcome, TargetStatus};
pub use refsync::RefSynchronizer;
pub use registry::{Repository, RepositoryRegistry};
pub use resolver::{parse_repo_url, RemoteRepoResolver, RepoCoordinates};
pub use strategy::{PushStrategy, PushStrategyExecutor};
pub use verifier::{ConvergenceVerifier, VerificationResult};
