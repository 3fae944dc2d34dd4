//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - Hosted-repo API calls (counts and latency, per operation)
//! - Metadata resolves and refreshes
//! - Replication runs and per-target push outcomes
//! - Convergence verification results
//! - RPC endpoint traffic
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `replicator_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! # Usage
//!
//! ```rust,no_run
//! use repo_replicator::metrics;
//! use std::time::Duration;
//!
//! // In the host client after a response
//! metrics::record_remote_call("merge", true);
//! metrics::record_remote_call_latency("merge", Duration::from_millis(120));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a hosted-repo API call result by operation.
pub fn record_remote_call(operation: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("replicator_remote_calls_total", "operation" => operation.to_string(), "status" => status).increment(1);
}

/// Record hosted-repo API call latency by operation.
pub fn record_remote_call_latency(operation: &str, duration: Duration) {
    histogram!("replicator_remote_call_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Record a full metadata resolve (the three concurrent reads).
pub fn record_resolve(duration: Duration) {
    counter!("replicator_resolves_total").increment(1);
    histogram!("replicator_resolve_duration_seconds").record(duration.as_secs_f64());
}

/// Record a metadata refresh result (resolve + registry write).
pub fn record_refresh(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("replicator_refreshes_total", "status" => status).increment(1);
}

/// Record one target's push outcome within a run.
pub fn record_push_outcome(strategy: &str, outcome: &str) {
    counter!(
        "replicator_pushes_total",
        "strategy" => strategy.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a completed replication run.
pub fn record_run(success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("replicator_runs_total", "status" => status).increment(1);
    histogram!("replicator_run_duration_seconds").record(duration.as_secs_f64());
}

/// Record a convergence verification result.
pub fn record_verification(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("replicator_verifications_total", "status" => status).increment(1);
}

/// Record an RPC request by operation type.
pub fn record_rpc_request(operation: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("replicator_rpc_requests_total", "operation" => operation.to_string(), "status" => status).increment(1);
}

/// Gauge for the number of registered repositories.
pub fn set_registered_repos(count: usize) {
    gauge!("replicator_registered_repos").set(count as f64);
}
