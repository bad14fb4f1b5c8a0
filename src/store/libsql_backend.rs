//! libSQL backend: async `ConversationStore` implementation.
//!
//! Supports local file, remote (libSQL server / Turso) and in-memory
//! databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::{DatabaseConfig, DatabaseLocation};
use crate::conversation::{ConversationRecord, ConversationState, ConversationStep};
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::ConversationStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open the database described by `config` and run migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        match &config.location {
            DatabaseLocation::Local(path) => Self::new_local(Path::new(path)).await,
            DatabaseLocation::Remote(url) => {
                let token = config
                    .auth_token
                    .clone()
                    .unwrap_or_else(|| SecretString::from(String::new()));
                Self::new_remote(url, token).await
            }
            DatabaseLocation::Memory => Self::new_memory().await,
        }
    }

    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Connect to a remote libSQL server and run migrations.
    pub async fn new_remote(url: &str, auth_token: SecretString) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token.expose_secret().to_string())
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open remote database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(url = %url, "Remote database connected");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn find(&self, user_id: &str) -> Result<Option<ConversationRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {RECORD_COLUMNS} FROM user_states WHERE phone_number = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to look up {user_id}: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to read row for {user_id}: {e}")))?;

        row.map(|r| row_to_record(&r))
            .transpose()
            .map_err(|e| DatabaseError::Query(format!("Failed to decode row for {user_id}: {e}")))
    }
}

// ── Helper functions ────────────────────────────────────────────────

const RECORD_COLUMNS: &str = "id, phone_number, state, step, temp_data";

/// Map a libsql Row to a ConversationRecord.
///
/// Column order matches RECORD_COLUMNS.
fn row_to_record(row: &libsql::Row) -> Result<ConversationRecord, libsql::Error> {
    let state: String = row.get(2)?;
    let step: String = row.get(3)?;
    Ok(ConversationRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        state: ConversationState::from(state),
        step: ConversationStep::from(step),
        scratch: row.get::<String>(4).unwrap_or_default(),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ConversationStore for LibSqlBackend {
    async fn get_or_create(&self, user_id: &str) -> Result<ConversationRecord, DatabaseError> {
        let defaults = ConversationRecord::new(user_id);

        // A single conditional insert keeps concurrent first contacts from
        // creating duplicates; the loser simply inserts nothing.
        let inserted = self
            .conn()
            .execute(
                "INSERT INTO user_states (phone_number, state, step, temp_data) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(phone_number) DO NOTHING",
                params![
                    user_id,
                    defaults.state.as_str(),
                    defaults.step.as_str(),
                    defaults.scratch.as_str()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("Failed to create record for {user_id}: {e}")))?;

        if inserted > 0 {
            debug!(user_id = %user_id, "Created conversation record");
        }

        self.find(user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "user_state".into(),
                id: user_id.to_string(),
            })
    }

    async fn save(&self, record: &ConversationRecord) -> Result<(), DatabaseError> {
        // One statement for all three fields: concurrent saves for the same
        // user resolve as last-write-wins, never a mix of both.
        let updated = self
            .conn()
            .execute(
                "UPDATE user_states SET state = ?1, step = ?2, temp_data = ?3 WHERE phone_number = ?4",
                params![
                    record.state.as_str(),
                    record.step.as_str(),
                    record.scratch.as_str(),
                    record.user_id.as_str()
                ],
            )
            .await
            .map_err(|e| {
                DatabaseError::Query(format!("Failed to save record for {}: {e}", record.user_id))
            })?;

        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "user_state".into(),
                id: record.user_id.clone(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT 1", ())
            .await
            .map_err(|e| DatabaseError::Pool(format!("Database ping failed: {e}")))?;
        rows.next()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Database ping failed: {e}")))?;
        Ok(())
    }
}
