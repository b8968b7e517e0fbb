//! Database schema migrations.
//!
//! A `_migrations` table records every applied version; pending scripts run
//! in order, each inside its own transaction.

use super::Error;
use tokio_rusqlite::{Connection, params};

struct Migration {
    version: i64,
    sql: &'static str,
}

/// Ordered migration list. Every script uses CREATE IF NOT EXISTS.
const MIGRATIONS: &[Migration] = &[Migration { version: 1, sql: include_str!("../../migrations/001_cache_stores.sql") }];

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if the version table cannot be read or a script fails;
/// a failed script leaves the schema at the previous version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("version {}: {e}", migration.version)))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![migration.version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version = migration.version, "applied cache schema migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
