//! User Storage
//! Mission: Persist user accounts behind a store trait, SQLite by default

use crate::auth::models::{Credential, NewUser};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Insert refused by a uniqueness constraint. Carried inside the store's
/// `anyhow::Error` so callers can `downcast_ref` it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UserConflict {
    #[error("username already exists")]
    Username,
    #[error("email already exists")]
    Email,
}

/// Account lookups and inserts the gateway depends on.
///
/// Every call may block on I/O; implementations must be safe for concurrent
/// readers. Uniqueness of username and email is enforced by the store:
/// `create_user` fails with a [`UserConflict`] when either is taken.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<Option<Credential>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Credential>>;

    async fn create_user(&self, user: NewUser) -> Result<Credential>;

    async fn list_users(&self) -> Result<Vec<Credential>>;

    async fn count_admins(&self) -> Result<u64>;
}

const USER_COLUMNS: &str =
    "user_id, username, email, hashed_password, is_active, is_admin, created_at";

/// User storage with SQLite backend
pub struct SqliteUserStore {
    db_path: PathBuf,
}

impl SqliteUserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = open_connection(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                hashed_password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create users table")?;

        info!(db_path = %self.db_path.display(), "User store ready");
        Ok(())
    }

    /// Run a blocking database closure on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&db_path)?;
            f(&conn)
        })
        .await
        .context("User store task failed")?
    }
}

fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open user db at {}", db_path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("Failed to set user db busy timeout")?;
    Ok(conn)
}

fn insert_error(err: rusqlite::Error) -> anyhow::Error {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("users.username") {
                return UserConflict::Username.into();
            }
            if message.contains("users.email") {
                return UserConflict::Email.into();
            }
        }
    }
    anyhow::Error::new(err).context("Failed to insert user")
}

fn row_to_credential(row: &Row<'_>) -> rusqlite::Result<Credential> {
    let created_at: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Credential {
        user_id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_active: row.get(4)?,
        is_admin: row.get(5)?,
        created_at,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_user(&self, username: &str) -> Result<Option<Credential>> {
        let username = username.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                params![username],
                row_to_credential,
            )
            .optional()
            .context("Failed to look up user by username")
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Credential>> {
        let email = email.to_owned();
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![email],
                row_to_credential,
            )
            .optional()
            .context("Failed to look up user by email")
        })
        .await
    }

    async fn create_user(&self, user: NewUser) -> Result<Credential> {
        self.with_conn(move |conn| {
            let created_at = Utc::now();
            conn.execute(
                "INSERT INTO users (username, email, hashed_password, is_active, is_admin, created_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5)",
                params![
                    user.username,
                    user.email,
                    user.password_hash,
                    user.is_admin,
                    created_at.to_rfc3339(),
                ],
            )
            .map_err(insert_error)?;

            let credential = Credential {
                user_id: conn.last_insert_rowid(),
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                is_active: true,
                is_admin: user.is_admin,
                created_at,
            };

            info!(
                username = %credential.username,
                is_admin = credential.is_admin,
                "Created user"
            );
            Ok(credential)
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<Credential>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY user_id",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], row_to_credential)?
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to list users")?;
            Ok(users)
        })
        .await
    }

    async fn count_admins(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM users WHERE is_admin = 1", [], |row| {
                    row.get(0)
                })
                .context("Failed to check for admin users")?;
            Ok(count as u64)
        })
        .await
    }
}
