// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Persisted repository registry.
//!
//! Stores the tracked fleet in SQLite: one row per repository with its
//! URL, master flag, sync state, and cached branch/commit metadata.
//! The engine mutates rows after successful refreshes and pushes; the
//! UI reads them back verbatim, so the row shape is a wire contract.
//!
//! # Master Singleton
//!
//! At most one row has `is_master = 1`. The flag is maintained by
//! [`RepositoryRegistry::set_master`], which runs the clear-then-set
//! inside a single transaction so a crash cannot leave the registry
//! with zero masters. There is deliberately no database constraint:
//! the invariant is owned by the operation.
//!
//! # Why SQLite?
//!
//! - Rows are small and low-write (updated on refresh/push only)
//! - The fleet must survive service restarts
//! - WAL mode gives durability with good read concurrency

use crate::error::{ReplicationError, Result};
use crate::host::{BranchInfo, CommitInfo, RepoDetails};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;

/// A tracked repository record.
///
/// Field names match the row shape the UI consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Opaque unique identifier (uuid v4).
    pub id: String,
    /// Hosted-repo URL, unique per logical target.
    pub url: String,
    /// Short name derived from the URL.
    pub name: String,
    /// Optional display label.
    pub nickname: Option<String>,
    /// Registry-wide singleton flag.
    pub is_master: bool,
    /// Timestamp of last successful metadata refresh or push.
    pub last_sync: Option<DateTime<Utc>>,
    /// `"synced"` after a successful refresh/push; unset before.
    pub status: Option<String>,
    /// Cached tip commit identifier (opaque string).
    pub last_commit: Option<String>,
    /// Commit date as reported by the host (RFC3339 string).
    pub last_commit_date: Option<String>,
    pub default_branch: Option<String>,
    /// Cached branch list from the last refresh.
    pub branches: Vec<BranchInfo>,
    /// Cached recent commits, newest first, bounded to 5.
    pub recent_commits: Vec<CommitInfo>,
}

impl Repository {
    /// Label used in generated commit messages and logs.
    pub fn display_label(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }
}

/// Derive a short repo name from a stored URL.
///
/// Registration does not validate URLs (a bad URL fails later, at
/// resolve time), so this has to produce something for any input:
/// the last path segment minus a `.git` suffix, or the whole string.
fn name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        trimmed.to_string()
    } else {
        name.to_string()
    }
}

type RepoRow = (
    String,         // id
    String,         // url
    String,         // name
    Option<String>, // nickname
    i64,            // is_master
    Option<String>, // last_sync
    Option<String>, // status
    Option<String>, // last_commit
    Option<String>, // last_commit_date
    Option<String>, // default_branch
    String,         // branches (JSON)
    String,         // recent_commits (JSON)
);

const SELECT_COLUMNS: &str = "id, url, name, nickname, is_master, last_sync, status, \
     last_commit, last_commit_date, default_branch, branches, recent_commits";

fn row_to_repository(row: RepoRow) -> Result<Repository> {
    let (
        id,
        url,
        name,
        nickname,
        is_master,
        last_sync,
        status,
        last_commit,
        last_commit_date,
        default_branch,
        branches,
        recent_commits,
    ) = row;

    let last_sync = match last_sync {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| ReplicationError::Internal(format!("corrupt last_sync: {e}")))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    let branches: Vec<BranchInfo> = serde_json::from_str(&branches)
        .map_err(|e| ReplicationError::Internal(format!("corrupt branches column: {e}")))?;
    let recent_commits: Vec<CommitInfo> = serde_json::from_str(&recent_commits)
        .map_err(|e| ReplicationError::Internal(format!("corrupt recent_commits column: {e}")))?;

    Ok(Repository {
        id,
        url,
        name,
        nickname,
        is_master: is_master != 0,
        last_sync,
        status,
        last_commit,
        last_commit_date,
        default_branch,
        branches,
        recent_commits,
    })
}

/// Persistent repository store backed by SQLite.
pub struct RepositoryRegistry {
    pool: SqlitePool,
    path: String,
}

impl RepositoryRegistry {
    /// Open (or create) the registry at the configured path.
    pub async fn new(config: &RegistryConfig) -> Result<Self> {
        info!(path = %config.sqlite_path, "Initializing repository registry");

        let options = if config.sqlite_path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| ReplicationError::Config(format!("invalid SQLite options: {e}")))?
        } else {
            let opts =
                SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", config.sqlite_path))
                    .map_err(|e| ReplicationError::Config(format!("invalid SQLite path: {e}")))?
                    .create_if_missing(true)
                    .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
            if config.wal_mode {
                opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            } else {
                opts
            }
        };

        // One connection: registry traffic is tiny, and a shared
        // in-memory database needs a single connection to stay alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS repositories (
                id TEXT PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                nickname TEXT,
                is_master INTEGER NOT NULL DEFAULT 0,
                last_sync TEXT,
                status TEXT,
                last_commit TEXT,
                last_commit_date TEXT,
                default_branch TEXT,
                branches TEXT NOT NULL DEFAULT '[]',
                recent_commits TEXT NOT NULL DEFAULT '[]'
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            path: config.sqlite_path.clone(),
        })
    }

    /// Register a new repository.
    ///
    /// The first repository registered into an empty registry becomes
    /// the master. The URL is stored as given; validation happens at
    /// resolve time, not here.
    pub async fn register(&self, url: &str, nickname: Option<&str>) -> Result<Repository> {
        let id = uuid::Uuid::new_v4().to_string();
        let name = name_from_url(url);
        let is_master = self.count().await? == 0;

        sqlx::query(
            r#"
            INSERT INTO repositories (id, url, name, nickname, is_master, branches, recent_commits)
            VALUES (?, ?, ?, ?, ?, '[]', '[]')
            "#,
        )
        .bind(&id)
        .bind(url)
        .bind(&name)
        .bind(nickname)
        .bind(is_master as i64)
        .execute(&self.pool)
        .await?;

        info!(id = %id, url, is_master, "Registered repository");

        Ok(Repository {
            id,
            url: url.to_string(),
            name,
            nickname: nickname.map(|n| n.to_string()),
            is_master,
            last_sync: None,
            status: None,
            last_commit: None,
            last_commit_date: None,
            default_branch: None,
            branches: Vec::new(),
            recent_commits: Vec::new(),
        })
    }

    /// Fetch one repository by id.
    pub async fn get(&self, id: &str) -> Result<Option<Repository>> {
        let row: Option<RepoRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM repositories WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_repository).transpose()
    }

    /// Fetch one repository by id, failing with `RepositoryNotFound`.
    pub async fn require(&self, id: &str) -> Result<Repository> {
        self.get(id)
            .await?
            .ok_or_else(|| ReplicationError::RepositoryNotFound { id: id.to_string() })
    }

    /// List all repositories, master first, then by name.
    pub async fn list(&self) -> Result<Vec<Repository>> {
        let rows: Vec<RepoRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM repositories ORDER BY is_master DESC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_repository).collect()
    }

    /// The current master repository, if any.
    pub async fn master(&self) -> Result<Option<Repository>> {
        let row: Option<RepoRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM repositories WHERE is_master = 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_repository).transpose()
    }

    /// Make `id` the single master repository.
    ///
    /// Clear-then-set runs in one transaction: either the new master is
    /// set and everything else cleared, or nothing changes. An unknown
    /// id rolls back and the previous master survives.
    pub async fn set_master(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE repositories SET is_master = 0 WHERE is_master = 1")
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query("UPDATE repositories SET is_master = 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            // Implicit rollback on drop keeps the previous master.
            return Err(ReplicationError::RepositoryNotFound { id: id.to_string() });
        }

        tx.commit().await?;
        info!(id, "Master repository changed");
        Ok(())
    }

    /// Delete a repository record. No remote side effects.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM repositories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(id, "Deleted repository");
        } else {
            debug!(id, "Delete requested for unknown repository");
        }
        Ok(deleted)
    }

    /// Persist refreshed metadata after a successful resolve
    /// (the `getLastCommit` operation).
    ///
    /// An empty repository (host returned no commits) keeps its
    /// previous commit columns; everything else still updates.
    pub async fn record_refresh(&self, id: &str, details: &RepoDetails) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let last_commit = details.last_commit().map(|c| c.sha.clone());
        let last_commit_date = details.last_commit().and_then(|c| c.date.clone());

        let branches = serde_json::to_string(&details.branches)
            .map_err(|e| ReplicationError::Internal(format!("encode branches: {e}")))?;
        let recent_commits = serde_json::to_string(&details.last_commits)
            .map_err(|e| ReplicationError::Internal(format!("encode recent_commits: {e}")))?;

        let result = sqlx::query(
            r#"
            UPDATE repositories SET
                last_commit = COALESCE(?, last_commit),
                last_commit_date = COALESCE(?, last_commit_date),
                last_sync = ?,
                status = 'synced',
                default_branch = ?,
                branches = ?,
                recent_commits = ?
            WHERE id = ?
            "#,
        )
        .bind(&last_commit)
        .bind(&last_commit_date)
        .bind(&now)
        .bind(&details.default_branch)
        .bind(&branches)
        .bind(&recent_commits)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ReplicationError::RepositoryNotFound { id: id.to_string() });
        }

        debug!(id, last_commit = ?last_commit, "Recorded metadata refresh");
        Ok(())
    }

    /// Persist the result of a successful push to a target.
    pub async fn record_push(&self, id: &str, sha: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE repositories SET
                last_sync = ?,
                status = 'synced',
                last_commit = ?,
                last_commit_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&now)
        .bind(sha)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ReplicationError::RepositoryNotFound { id: id.to_string() });
        }

        debug!(id, sha, "Recorded push result");
        Ok(())
    }

    /// Number of tracked repositories.
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM repositories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Database path (for diagnostics).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the pool gracefully, checkpointing WAL first.
    pub async fn close(&self) {
        if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
        {
            warn!(error = %e, "Failed to checkpoint WAL on close");
        }
        self.pool.close().await;
        info!("Repository registry closed");
    }
}
