//! Shared test helpers.

pub mod mock_host;

use repo_replicator::config::RegistryConfig;
use repo_replicator::orchestrator::ReplicationOrchestrator;
use repo_replicator::registry::RepositoryRegistry;
use repo_replicator::verifier::ConvergenceVerifier;
use self::mock_host::MockHost;
use std::sync::Arc;

pub const COMMIT_PAGE_SIZE: usize = 5;

/// Everything an end-to-end test needs, wired over one mock host.
pub struct Harness {
    pub host: Arc<MockHost>,
    pub registry: Arc<RepositoryRegistry>,
    pub orchestrator: ReplicationOrchestrator<MockHost>,
    pub verifier: ConvergenceVerifier<MockHost>,
}

impl Harness {
    pub async fn new() -> Self {
        let host = Arc::new(MockHost::new());
        let registry = Arc::new(
            RepositoryRegistry::new(&RegistryConfig::in_memory())
                .await
                .expect("in-memory registry"),
        );
        let orchestrator = ReplicationOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&host),
            COMMIT_PAGE_SIZE,
        );
        let verifier = ConvergenceVerifier::new(
            Arc::clone(&registry),
            Arc::clone(&host),
            COMMIT_PAGE_SIZE,
        );
        Self {
            host,
            registry,
            orchestrator,
            verifier,
        }
    }
}
