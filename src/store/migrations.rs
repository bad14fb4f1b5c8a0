//! Schema migrations for the conversation store.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its version row, so a failed
//! step leaves neither partial schema nor a false version behind.

use libsql::Connection;
use tracing::{debug, info};

use crate::error::DatabaseError;

/// One schema step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Schema history, oldest first. Append only.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "user_states",
    sql: r#"
        CREATE TABLE IF NOT EXISTS user_states (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_number TEXT NOT NULL UNIQUE,
            state TEXT NOT NULL DEFAULT 'start',
            step TEXT NOT NULL DEFAULT 'intro',
            temp_data TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_user_states_phone_number ON user_states(phone_number);
    "#,
}];

/// Bring the schema up to date. Safe to call on every startup.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    apply_pending(conn, MIGRATIONS).await
}

async fn apply_pending(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Cannot create _migrations: {e}")))?;

    let applied = schema_version(conn).await?;
    let pending: Vec<&Migration> = migrations.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        debug!(version = applied, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        info!(version = migration.version, name = migration.name, "Applying migration");
        apply_one(conn, migration).await?;
    }
    Ok(())
}

async fn apply_one(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let label = format!("V{} ({})", migration.version, migration.name);

    let tx = conn
        .transaction()
        .await
        .map_err(|e| DatabaseError::Migration(format!("{label}: cannot begin: {e}")))?;

    let applied = async {
        tx.execute_batch(migration.sql).await?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![migration.version, migration.name],
        )
        .await?;
        Ok::<_, libsql::Error>(())
    }
    .await;

    if let Err(e) = applied {
        tx.rollback().await.ok();
        return Err(DatabaseError::Migration(format!("{label}: {e}")));
    }

    tx.commit()
        .await
        .map_err(|e| DatabaseError::Migration(format!("{label}: cannot commit: {e}")))
}

/// Highest applied version, 0 on a fresh database.
async fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Cannot read schema version: {e}")))?;

    match rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Cannot read schema version: {e}")))?
    {
        Some(row) => row
            .get(0)
            .map_err(|e| DatabaseError::Migration(format!("Bad schema version value: {e}"))),
        None => Ok(0),
    }
}
