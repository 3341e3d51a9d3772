//! SQLite-backed profile store.
//!
//! Schema (`PRAGMA user_version = 1`):
//!
//! ```sql
//! users(id TEXT PRIMARY KEY, bio TEXT, experience TEXT, projects TEXT)
//! ```
//!
//! A connection is opened per lookup inside `spawn_blocking`, so the async
//! runtime never waits on disk I/O and no connection is shared across tasks.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::{ProfileError, ProfileFuture, ProfileStore, ProfileWriteFuture, UserProfile};
use crate::auth::SubjectId;

const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone)]
pub struct SqliteProfileStore {
    db_path: PathBuf,
}

impl SqliteProfileStore {
    /// Open (or create) the database at `db_path` and make sure the schema
    /// exists. Safe to call repeatedly.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ProfileError::Backend(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let store = Self { db_path };
        store.init_db()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn init_db(&self) -> Result<(), ProfileError> {
        let conn = open_conn(&self.db_path)?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| ProfileError::Backend(format!("read schema version: {e}")))?;

        match version {
            0 => conn
                .execute_batch(
                    "CREATE TABLE IF NOT EXISTS users (
                        id         TEXT PRIMARY KEY,
                        bio        TEXT NOT NULL DEFAULT '',
                        experience TEXT NOT NULL DEFAULT '',
                        projects   TEXT NOT NULL DEFAULT ''
                    );
                    PRAGMA user_version = 1;",
                )
                .map_err(|e| ProfileError::Backend(format!("init schema: {e}"))),
            SCHEMA_VERSION => Ok(()),
            other => Err(ProfileError::Backend(format!(
                "unsupported schema version {other}, expected {SCHEMA_VERSION}"
            ))),
        }
    }
}

fn open_conn(path: &Path) -> Result<Connection, ProfileError> {
    Connection::open(path)
        .map_err(|e| ProfileError::Backend(format!("open {}: {e}", path.display())))
}

fn lookup(path: &Path, subject: &str) -> Result<UserProfile, ProfileError> {
    let conn = open_conn(path)?;
    let row = conn
        .query_row(
            "SELECT bio, experience, projects FROM users WHERE id = ?1",
            params![subject],
            |row| {
                Ok(UserProfile {
                    bio: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    experience: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    projects: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            },
        )
        .optional()
        .map_err(|e| ProfileError::Backend(format!("lookup {subject}: {e}")))?;

    row.ok_or_else(|| ProfileError::NotFound(subject.to_string()))
}

fn upsert(path: &Path, subject: &str, profile: &UserProfile) -> Result<(), ProfileError> {
    let conn = open_conn(path)?;
    conn.execute(
        "INSERT INTO users (id, bio, experience, projects) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET bio = ?2, experience = ?3, projects = ?4",
        params![subject, profile.bio, profile.experience, profile.projects],
    )
    .map_err(|e| ProfileError::Backend(format!("upsert {subject}: {e}")))?;
    Ok(())
}

impl ProfileStore for SqliteProfileStore {
    fn get<'a>(&'a self, subject: &'a SubjectId) -> ProfileFuture<'a> {
        let path = self.db_path.clone();
        let subject = subject.to_string();
        Box::pin(async move {
            debug!(%subject, "loading profile from sqlite");
            tokio::task::spawn_blocking(move || lookup(&path, &subject))
                .await
                .map_err(|e| ProfileError::Backend(format!("lookup task failed: {e}")))?
        })
    }

    fn put<'a>(&'a self, subject: &'a SubjectId, profile: UserProfile) -> ProfileWriteFuture<'a> {
        let path = self.db_path.clone();
        let subject = subject.to_string();
        Box::pin(async move {
            debug!(%subject, "storing profile in sqlite");
            tokio::task::spawn_blocking(move || upsert(&path, &subject, &profile))
                .await
                .map_err(|e| ProfileError::Backend(format!("store task failed: {e}")))?
        })
    }
}
