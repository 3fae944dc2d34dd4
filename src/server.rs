// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! JSON RPC endpoint.
//!
//! A single POST route dispatches on the request body's `type` field;
//! browsers call it directly, so every response (including errors)
//! carries permissive CORS headers and preflight `OPTIONS` is answered
//! unconditionally.
//!
//! The error contract is blunt on purpose: any failure, local or
//! remote, becomes HTTP 500 with a `{ success: false, error, details }`
//! envelope. Clients branch on the envelope's `details.name`, never on
//! the status code.

use crate::error::ReplicationError;
use crate::host::HostedRepoClient;
use crate::metrics;
use crate::orchestrator::ReplicationOrchestrator;
use crate::registry::RepositoryRegistry;
use crate::strategy::PushStrategy;
use crate::verifier::ConvergenceVerifier;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error as _;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Shared handler state.
pub struct AppState<H: HostedRepoClient> {
    pub registry: Arc<RepositoryRegistry>,
    pub orchestrator: Arc<ReplicationOrchestrator<H>>,
    pub verifier: Arc<ConvergenceVerifier<H>>,
}

impl<H: HostedRepoClient> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            orchestrator: Arc::clone(&self.orchestrator),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

/// Build the RPC router.
pub fn router<H: HostedRepoClient>(state: AppState<H>) -> Router {
    Router::new()
        .route("/", post(dispatch::<H>))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Wire request shapes, dispatched on `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RpcRequest {
    #[serde(rename = "getLastCommit", rename_all = "camelCase")]
    GetLastCommit { source_repo_id: String },

    #[serde(rename = "push", rename_all = "camelCase")]
    Push {
        source_repo_id: String,
        /// Single-target form.
        target_repo_id: Option<String>,
        /// Multi-target form; takes precedence when both are present.
        target_repo_ids: Option<Vec<String>>,
        push_type: PushStrategy,
        #[serde(default)]
        continue_on_error: bool,
    },

    #[serde(rename = "verify", rename_all = "camelCase")]
    Verify {
        source_repo_id: String,
        target_repo_ids: Vec<String>,
    },

    #[serde(rename = "listRepositories")]
    ListRepositories,

    #[serde(rename = "registerRepository", rename_all = "camelCase")]
    RegisterRepository {
        url: String,
        nickname: Option<String>,
    },

    #[serde(rename = "deleteRepository", rename_all = "camelCase")]
    DeleteRepository { repo_id: String },

    #[serde(rename = "setMaster", rename_all = "camelCase")]
    SetMaster { repo_id: String },
}

impl RpcRequest {
    fn operation(&self) -> &'static str {
        match self {
            Self::GetLastCommit { .. } => "getLastCommit",
            Self::Push { .. } => "push",
            Self::Verify { .. } => "verify",
            Self::ListRepositories => "listRepositories",
            Self::RegisterRepository { .. } => "registerRepository",
            Self::DeleteRepository { .. } => "deleteRepository",
            Self::SetMaster { .. } => "setMaster",
        }
    }
}

async fn dispatch<H: HostedRepoClient>(
    State(state): State<AppState<H>>,
    body: Json<Value>,
) -> Response {
    // Every failure maps to 500, including a body that does not parse,
    // so deserialization happens inside the handler rather than in an
    // extractor that would answer 400/422.
    let request: RpcRequest = match serde_json::from_value(body.0) {
        Ok(r) => r,
        Err(e) => {
            let err = ReplicationError::Validation(format!("invalid request: {e}"));
            metrics::record_rpc_request("unknown", false);
            return error_response(&err, None);
        }
    };

    let operation = request.operation();
    info!(operation, "RPC request");

    let response = handle(state, request).await;
    metrics::record_rpc_request(operation, response.status().is_success());
    response
}

async fn handle<H: HostedRepoClient>(state: AppState<H>, request: RpcRequest) -> Response {
    match request {
        RpcRequest::GetLastCommit { source_repo_id } => {
            match state.orchestrator.refresh(&source_repo_id).await {
                Ok(details) => ok(json!({ "success": true, "details": details })),
                Err(e) => error_response(&e, None),
            }
        }

        RpcRequest::Push {
            source_repo_id,
            target_repo_id,
            target_repo_ids,
            push_type,
            continue_on_error,
        } => {
            let targets = target_repo_ids
                .or_else(|| target_repo_id.map(|id| vec![id]))
                .unwrap_or_default();

            match state
                .orchestrator
                .push(&source_repo_id, &targets, push_type, continue_on_error)
                .await
            {
                Ok(result) if result.success() => ok(json!({
                    "success": true,
                    "message": format!("Successfully pushed to {} repositories", result.pushed_count()),
                    "sha": result.source_sha,
                    "outcomes": result.outcomes,
                })),
                Ok(result) => {
                    // Remote failures are data in the run result; the
                    // wire contract still reports them as 500.
                    let first = result.first_error().unwrap_or("push failed").to_string();
                    let err = ReplicationError::Internal(first);
                    warn!(pushed = result.pushed_count(), "Push run had failures");
                    error_response(&err, Some(json!({ "outcomes": result.outcomes })))
                }
                Err(e) => error_response(&e, None),
            }
        }

        RpcRequest::Verify {
            source_repo_id,
            target_repo_ids,
        } => match state.verifier.verify(&source_repo_id, &target_repo_ids).await {
            Ok(result) => ok(serde_json::to_value(&result).unwrap_or_else(|_| json!({}))),
            Err(e) => error_response(&e, None),
        },

        RpcRequest::ListRepositories => match state.registry.list().await {
            Ok(repos) => {
                metrics::set_registered_repos(repos.len());
                ok(json!({ "success": true, "repositories": repos }))
            }
            Err(e) => error_response(&e, None),
        },

        RpcRequest::RegisterRepository { url, nickname } => {
            match state.registry.register(&url, nickname.as_deref()).await {
                Ok(repo) => ok(json!({ "success": true, "repository": repo })),
                Err(e) => error_response(&e, None),
            }
        }

        RpcRequest::DeleteRepository { repo_id } => {
            match state.registry.delete(&repo_id).await {
                Ok(true) => ok(json!({ "success": true })),
                Ok(false) => error_response(
                    &ReplicationError::RepositoryNotFound { id: repo_id },
                    None,
                ),
                Err(e) => error_response(&e, None),
            }
        }

        RpcRequest::SetMaster { repo_id } => match state.registry.set_master(&repo_id).await {
            Ok(()) => ok(json!({ "success": true })),
            Err(e) => error_response(&e, None),
        },
    }
}

fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

/// Render the error chain the way a stack trace reads, one cause per line.
fn render_stack(err: &ReplicationError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str("\n    caused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Build the HTTP 500 error envelope.
fn error_response(err: &ReplicationError, extra: Option<Value>) -> Response {
    let response_body = match err {
        ReplicationError::RemoteApi { message, .. } => Value::String(message.clone()),
        _ => Value::Null,
    };

    let mut envelope = json!({
        "success": false,
        "error": err.to_string(),
        "details": {
            "status": err.status(),
            "name": err.kind(),
            "message": err.to_string(),
            "response": response_body,
            "documentation_url": err.documentation_url(),
            "stack": render_stack(err),
        },
    });

    if let (Some(obj), Some(Value::Object(extra))) = (envelope.as_object_mut(), extra) {
        for (k, v) in extra {
            obj.insert(k, v);
        }
    }

    (StatusCode::INTERNAL_SERVER_ERROR, Json(envelope)).into_response()
}
