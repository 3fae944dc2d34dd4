// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replication engine.
//!
//! Errors are categorized by where they originate (stored data, caller
//! input, the remote host API, the local registry) and carry enough
//! context to build the wire error envelope.
//!
//! # Error Categories
//!
//! | Error Type | Origin | Remote call made? |
//! |------------|--------|-------------------|
//! | `InvalidUrl` | Malformed stored repository URL | No |
//! | `RepositoryNotFound` | Unknown id passed by caller | No |
//! | `Validation` | Bad request shape (e.g. empty target set) | No |
//! | `Precondition` | Operation attempted before its inputs exist | No |
//! | `RemoteApi` | Hosted-repo API failure (auth, rate limit, conflict) | Yes |
//! | `Registry` | Local SQLite failure | No |
//! | `Config` | Invalid or missing configuration | No |
//! | `Internal` | Unexpected internal error | No |
//!
//! # Propagation
//!
//! Nothing in the engine retries. Every failure aborts the current
//! operation and is surfaced to the caller with the original message and
//! (for remote errors) the HTTP status the host returned. The single
//! place an error is *inspected* rather than propagated is
//! [`ReplicationError::is_not_found()`], which `ensure_branch` uses to
//! create a missing target branch.

use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Render the optional HTTP status for the `RemoteApi` display impl.
fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(s) => format!(", HTTP {s}"),
        None => String::new(),
    }
}

/// Errors that can occur while replicating repositories.
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Stored repository URL does not match `host/<owner>/<name>[.git]`.
    ///
    /// Fatal for the whole operation; the remote API is never called.
    #[error("invalid repository URL: {url}")]
    InvalidUrl { url: String },

    /// Caller passed an id the registry does not know.
    #[error("repository not found: {id}")]
    RepositoryNotFound { id: String },

    /// Request failed local validation before any remote call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation attempted before its inputs exist
    /// (e.g. verification before the source has a recorded commit).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Hosted-repo API failure: auth, rate limit, merge conflict,
    /// permission, or transport. Fatal for the target being processed.
    #[error("remote API error ({operation}{}): {message}", fmt_status(status))]
    RemoteApi {
        /// The API operation that failed (e.g. "merge", "update_ref").
        operation: String,
        /// HTTP status from the host, if a response was received.
        status: Option<u16>,
        message: String,
        /// The host's documentation link, when the response body had one.
        documentation_url: Option<String>,
    },

    /// Local registry (SQLite) failure.
    #[error("registry error: {0}")]
    Registry(#[from] sqlx::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReplicationError {
    /// Create a remote API error with a status code.
    pub fn remote(
        operation: impl Into<String>,
        status: u16,
        message: impl Into<String>,
        documentation_url: Option<String>,
    ) -> Self {
        Self::RemoteApi {
            operation: operation.into(),
            status: Some(status),
            message: message.into(),
            documentation_url,
        }
    }

    /// Create a remote API error without a status (transport failure).
    pub fn remote_msg(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            operation: operation.into(),
            status: None,
            message: message.into(),
            documentation_url: None,
        }
    }

    /// True when the remote host answered 404 for this operation.
    ///
    /// This is the one error the pipeline recovers from: a missing
    /// target branch is created instead of failing the run.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RemoteApi { status: Some(404), .. })
    }

    /// The HTTP status carried by a remote error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteApi { status, .. } => *status,
            _ => None,
        }
    }

    /// Short machine-readable kind name for the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "InvalidUrlFormat",
            Self::RepositoryNotFound { .. } => "RepositoryNotFound",
            Self::Validation(_) => "ValidationError",
            Self::Precondition(_) => "PreconditionFailed",
            Self::RemoteApi { .. } => "RemoteApiError",
            Self::Registry(_) => "RegistryError",
            Self::Config(_) => "ConfigError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// The host's documentation link, when the error has one.
    pub fn documentation_url(&self) -> Option<&str> {
        match self {
            Self::RemoteApi {
                documentation_url, ..
            } => documentation_url.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ReplicationError {
    fn from(e: reqwest::Error) -> Self {
        Self::RemoteApi {
            operation: "http".to_string(),
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
            documentation_url: None,
        }
    }
}
