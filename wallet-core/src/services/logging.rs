//! Logging service - structured event logging to DuckDB
//!
//! Stores privacy-safe events in logs.duckdb. Balances, amounts and
//! credentials are never logged.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::{Connection, Row};
use serde::{Deserialize, Serialize};

use super::migration::MigrationService;
use crate::domain::result::Error;
use crate::log_migrations::LOG_MIGRATIONS;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

const ENTRY_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform,
     event, command, error_kind, error_message";

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    // Lower 16 bits: counter (65536 unique IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now_ms().max(0) as u64) << 16) | counter
}

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Who is writing to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Embedded,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Embedded => "embedded",
        }
    }
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            error_kind: None,
            error_message: None,
        }
    }

    /// Set the command context (for CLI events)
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Record a wallet error by kind and message
    pub fn with_error(mut self, error: &Error) -> Self {
        self.error_kind = Some(error.kind().as_str().to_string());
        self.error_message = Some(match error {
            // These messages can carry balances or raw amount input
            Error::InsufficientFunds { .. } => "Insufficient balance".to_string(),
            Error::InvalidRequest(_) => "Invalid request".to_string(),
            other => other.to_string(),
        });
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl LogEntry {
    fn read(row: &Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            entry_point: row.get(2)?,
            app_version: row.get(3)?,
            platform: row.get(4)?,
            event: row.get(5)?,
            command: row.get(6)?,
            error_kind: row.get(7)?,
            error_message: row.get(8)?,
        })
    }
}

/// Filter for [`LoggingService::search`]
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub command: Option<String>,
    pub failed_only: bool,
    pub limit: usize,
}

impl LogQuery {
    pub fn recent(limit: usize) -> Self {
        Self {
            command: None,
            failed_only: false,
            limit,
        }
    }

    pub fn for_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn failed(mut self) -> Self {
        self.failed_only = true;
        self
    }
}

/// Outcome counts for one CLI command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    pub command: String,
    pub succeeded: u64,
    pub failed: u64,
}

/// Service for structured event logging
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Open or create logs.duckdb in the wallet directory and run any
    /// pending log migrations
    pub fn new(
        wallet_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = wallet_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Log an event
    ///
    /// The entry point, app version and platform come from the service.
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, entry_point, app_version, platform,
                event, command, error_kind, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                self.platform,
                &event.event,
                &event.command,
                &event.error_kind,
                &event.error_message,
            ],
        )?;

        Ok(())
    }

    /// Log a simple event with just a name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.search(&LogQuery::recent(limit))
    }

    /// Most recent failures, newest first
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.search(&LogQuery::recent(limit).failed())
    }

    /// Entries matching `query`, newest first
    pub fn search(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let mut sql = format!("SELECT {} FROM sys_logs WHERE TRUE", ENTRY_COLUMNS);
        if query.command.is_some() {
            sql.push_str(" AND command = ?");
        }
        if query.failed_only {
            sql.push_str(" AND error_kind IS NOT NULL");
        }
        sql.push_str(&format!(" ORDER BY timestamp DESC, id DESC LIMIT {}", query.limit));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(duckdb::params_from_iter(query.command.iter()), LogEntry::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Succeeded and failed counts per CLI command, by command name
    pub fn command_stats(&self) -> Result<Vec<CommandStats>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT command,
                    COUNT(*) FILTER (WHERE error_kind IS NULL),
                    COUNT(*) FILTER (WHERE error_kind IS NOT NULL)
             FROM sys_logs
             WHERE command IS NOT NULL
             GROUP BY command
             ORDER BY command",
        )?;
        let stats = stmt
            .query_map([], |row| {
                Ok(CommandStats {
                    command: row.get(0)?,
                    succeeded: row.get::<_, i64>(1)? as u64,
                    failed: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    /// How often each error kind occurred, most frequent first
    pub fn error_kind_counts(&self, command: Option<&str>) -> Result<Vec<(String, u64)>> {
        let mut sql =
            String::from("SELECT error_kind, COUNT(*) FROM sys_logs WHERE error_kind IS NOT NULL");
        if command.is_some() {
            sql.push_str(" AND command = ?");
        }
        sql.push_str(" GROUP BY error_kind ORDER BY COUNT(*) DESC, error_kind");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let counts = stmt
            .query_map(duckdb::params_from_iter(command.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    /// Total number of log entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete entries older than the given unix timestamp (ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
