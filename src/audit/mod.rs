//! Audit log: SQLite-backed history of CLI operations on a vault directory.
//!
//! Stored at `<vault_dir>/audit.db`.  Only identifiers and operation
//! names are recorded, never material.  If the database can't be opened
//! or written to, commands carry on without logging.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::cli::Cli;
use crate::errors::{Result, VaultError};

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub secret_id: Option<String>,
    pub details: Option<String>,
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `<vault_dir>/audit.db`.
    ///
    /// `None` means audit logging is unavailable.
    pub fn open(vault_dir: &Path) -> Option<Self> {
        let db_path = Self::db_path(vault_dir);
        let conn = Connection::open(&db_path).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                operation   TEXT NOT NULL,
                secret_id   TEXT,
                details     TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation.  Failures are logged and otherwise ignored.
    pub fn log(&self, operation: &str, secret_id: Option<&str>, details: Option<&str>) {
        let now = Utc::now().to_rfc3339();
        if let Err(e) = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, secret_id, details)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![now, operation, secret_id, details],
        ) {
            tracing::debug!(error = %e, operation, "audit insert failed");
        }
    }

    /// Most recent entries first, at most `limit`, optionally no older
    /// than `since`.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        // RFC 3339 strings from `to_rfc3339()` sort chronologically.
        let since_str = since.map_or_else(String::new, |ts| ts.to_rfc3339());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, secret_id, details
                 FROM audit_log
                 WHERE timestamp >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(|e| VaultError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params![since_str, limit_i64], |row| {
                let ts_str: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    secret_id: row.get(3)?,
                    details: row.get(4)?,
                })
            })
            .map_err(|e| VaultError::AuditError(format!("query exec: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| VaultError::AuditError(format!("row parse: {e}")))
    }

    pub fn db_path(vault_dir: &Path) -> PathBuf {
        vault_dir.join("audit.db")
    }
}

/// Log an event for the vault directory the CLI is pointed at.
///
/// Never fails the calling command.
pub fn log_audit(cli: &Cli, op: &str, secret_id: Option<&str>, details: Option<&str>) {
    let Ok(vault_dir) = crate::cli::vault_dir(cli) else {
        return;
    };

    if let Some(audit) = AuditLog::open(&vault_dir) {
        audit.log(op, secret_id, details);
    }
}
