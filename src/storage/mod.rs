use anyhow::{Context as _, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRow {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryRow {
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub project_id: String,
    /// Calendar date, ISO `YYYY-MM-DD`.
    pub date: String,
    pub hours: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

/// Scope for time-entry listings: everything the user owns, or one project.
#[derive(Debug, Clone)]
pub enum EntryScope {
    All,
    Project(String),
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("trackd.db");
        let opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<()> {
        let stmts = [
            "CREATE TABLE IF NOT EXISTS users (
                 id TEXT PRIMARY KEY,
                 username TEXT NOT NULL UNIQUE,
                 password_hash TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
            "CREATE TABLE IF NOT EXISTS sessions (
                 token TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL,
                 created_at TEXT NOT NULL,
                 expires_at TEXT NOT NULL
             )",
            "CREATE TABLE IF NOT EXISTS projects (
                 id TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL,
                 name TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
            "CREATE TABLE IF NOT EXISTS time_entries (
                 id TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL,
                 project_id TEXT NOT NULL,
                 date TEXT NOT NULL,
                 hours REAL NOT NULL,
                 description TEXT,
                 created_at TEXT NOT NULL
             )",
            "CREATE INDEX IF NOT EXISTS idx_projects_user_id ON projects(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_time_entries_project_id ON time_entries(project_id)",
            "CREATE INDEX IF NOT EXISTS idx_time_entries_user_id ON time_entries(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_time_entries_date ON time_entries(date)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
        ];
        for stmt in stmts {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .context("failed to initialize database schema")?;
        }
        Ok(())
    }

    // ─── Users ──────────────────────────────────────────────────────────────

    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_user(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user not found after insert"))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    // ─── Sessions ───────────────────────────────────────────────────────────

    pub async fn create_session(
        &self,
        user_id: &str,
        token: &str,
        expires_at: &str,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(&now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolve a session token to its user. Expired tokens resolve to `None`.
    pub async fn session_user(&self, token: &str) -> Result<Option<UserRow>> {
        Ok(sqlx::query_as(
            "SELECT u.* FROM users u
             JOIN sessions s ON s.user_id = u.id
             WHERE s.token = ? AND s.expires_at > ?",
        )
        .bind(token)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete sessions past their expiry and return the count.
    pub async fn prune_expired_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ─── Projects ───────────────────────────────────────────────────────────

    /// Newest first; rowid breaks ties between equal timestamps so the order
    /// stays stable across calls.
    pub async fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectRow>> {
        Ok(sqlx::query_as(
            "SELECT * FROM projects WHERE user_id = ? ORDER BY created_at DESC, rowid ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// `name` must already be trimmed and non-empty — callers validate.
    pub async fn create_project(&self, user_id: &str, name: &str) -> Result<ProjectRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO projects (id, user_id, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(user_id)
            .bind(name)
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.project_owned(user_id, &id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("project not found after insert"))
    }

    /// Ownership guard: the project with this id, but only if `user_id` owns
    /// it. `None` for both "no such project" and "someone else's project".
    pub async fn project_owned(&self, user_id: &str, project_id: &str) -> Result<Option<ProjectRow>> {
        Ok(sqlx::query_as("SELECT * FROM projects WHERE id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Delete a project and every time entry referencing it, in one
    /// transaction. The owner-scoped project DELETE doubles as the ownership
    /// check and takes the write lock up front, so two racing deletes
    /// serialize and the loser sees zero rows affected rather than a stale
    /// read snapshot. The cascade only runs when the project row actually
    /// went away.
    pub async fn delete_project(&self, user_id: &str, project_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM projects WHERE id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM time_entries WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    // ─── Time entries ───────────────────────────────────────────────────────

    /// Most recent work first: `date DESC`, then `created_at DESC` within a
    /// day. Callers must pass `EntryScope::Project` through the ownership
    /// guard before listing.
    pub async fn list_entries(
        &self,
        user_id: &str,
        scope: &EntryScope,
    ) -> Result<Vec<TimeEntryRow>> {
        match scope {
            EntryScope::All => Ok(sqlx::query_as(
                "SELECT * FROM time_entries WHERE user_id = ?
                 ORDER BY date DESC, created_at DESC, rowid DESC",
            )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?),
            EntryScope::Project(project_id) => Ok(sqlx::query_as(
                "SELECT * FROM time_entries WHERE user_id = ? AND project_id = ?
                 ORDER BY date DESC, created_at DESC, rowid DESC",
            )
            .bind(user_id)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?),
        }
    }

    /// `hours` must already be validated positive — callers enforce it before
    /// anything touches the database.
    pub async fn create_entry(
        &self,
        user_id: &str,
        project_id: &str,
        date: &str,
        hours: f64,
        description: Option<&str>,
    ) -> Result<TimeEntryRow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO time_entries (id, user_id, project_id, date, hours, description, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(project_id)
        .bind(date)
        .bind(hours)
        .bind(description)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        self.get_entry(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("time entry not found after insert"))
    }

    pub async fn get_entry(&self, id: &str) -> Result<Option<TimeEntryRow>> {
        Ok(sqlx::query_as("SELECT * FROM time_entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Owner-scoped delete. `false` means no entry with that id belongs to
    /// this user — existence and ownership are indistinguishable to callers.
    pub async fn delete_entry(&self, user_id: &str, entry_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM time_entries WHERE id = ? AND user_id = ?")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `SELECT 1` probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
