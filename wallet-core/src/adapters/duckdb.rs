//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection, OptionalExt};
use log::warn;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Direction, Role, TransactionRecord};
use crate::ports::AccountRepository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str = "account_id, username, email, payment_id, credential, role,
     CAST(balance AS VARCHAR), version, created_at";

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Check if an error is a UNIQUE / PRIMARY KEY violation
fn is_uniqueness_violation(err: &duckdb::Error) -> bool {
    let lower = err.to_string().to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

/// Raw column values of a wallet_accounts row, before parsing
struct AccountRow {
    id: String,
    username: String,
    email: String,
    payment_id: String,
    credential: String,
    role: String,
    balance: String,
    version: i64,
    created_at: String,
}

impl AccountRow {
    fn read(row: &duckdb::Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            payment_id: row.get(3)?,
            credential: row.get(4)?,
            role: row.get(5)?,
            balance: row.get(6)?,
            version: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    fn into_account(self, history: Vec<TransactionRecord>) -> Result<Account> {
        Ok(Account {
            id: parse_uuid(&self.id)?,
            role: Role::from_str(&self.role).map_err(Error::persistence)?,
            balance: parse_decimal(&self.balance)?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
            email: self.email,
            payment_id: self.payment_id,
            credential: self.credential,
            history,
            version: self.version,
        })
    }
}

/// DuckDB repository implementation
///
/// A single connection guarded by a mutex. Multi-statement writes run inside
/// one DuckDB transaction so they commit or roll back together.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the wallet database
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process has the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.map(Error::from).unwrap_or_else(|| {
            Error::persistence(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database (nothing is written to disk)
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off; nothing here needs ICU or httpfs
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::persistence(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::persistence(format!("{:#}", e)))
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Reads ===

    fn query_one(conn: &Connection, filter: &str, args: &[&str]) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM wallet_accounts WHERE {} LIMIT 1", ACCOUNT_COLUMNS, filter);
        let row = conn
            .query_row(&sql, duckdb::params_from_iter(args.iter()), AccountRow::read)
            .optional()?;

        match row {
            Some(row) => {
                let history = Self::load_history(conn, &row.id)?;
                Ok(Some(row.into_account(history)?))
            }
            None => Ok(None),
        }
    }

    fn load_history(conn: &Connection, account_id: &str) -> Result<Vec<TransactionRecord>> {
        let mut stmt = conn.prepare(
            "SELECT record_id, direction, CAST(amount AS VARCHAR), counterparty, created_at
             FROM wallet_transactions
             WHERE account_id = ?
             ORDER BY seq",
        )?;

        let rows = stmt
            .query_map([account_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, direction, amount, counterparty, created_at)| {
                Ok(TransactionRecord {
                    id: parse_uuid(&id)?,
                    direction: Direction::from_str(&direction).map_err(Error::persistence)?,
                    amount: parse_decimal(&amount)?,
                    counterparty,
                    timestamp: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    // === Writes ===

    /// Version-checked balance update plus any history records not yet stored
    fn write_account(conn: &Connection, account: &Account) -> Result<()> {
        let id = account.id.to_string();

        let updated = conn.execute(
            "UPDATE wallet_accounts
             SET balance = CAST(? AS DECIMAL(18, 2)), version = version + 1, updated_at = ?
             WHERE account_id = ? AND version = ?",
            params![
                account.balance.to_string(),
                Utc::now().to_rfc3339(),
                id,
                account.version,
            ],
        )?;
        if updated == 0 {
            return Err(Error::Conflict(format!(
                "account '{}' changed since it was read",
                account.username
            )));
        }

        // History is append-only, so only the tail past the stored length is new
        let stored: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wallet_transactions WHERE account_id = ?",
            [&id],
            |row| row.get(0),
        )?;

        for (seq, record) in account.history.iter().enumerate().skip(stored as usize) {
            conn.execute(
                "INSERT INTO wallet_transactions
                    (record_id, account_id, seq, direction, amount, counterparty, created_at)
                 VALUES (?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), ?, ?)",
                params![
                    record.id.to_string(),
                    id,
                    seq as i64,
                    record.direction.as_str(),
                    record.amount.to_string(),
                    record.counterparty,
                    record.timestamp.to_rfc3339(),
                ],
            )?;
        }

        Ok(())
    }

    /// Number of history rows stored for an account (diagnostics and tests)
    pub fn history_len(&self, account_id: Uuid) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wallet_transactions WHERE account_id = ?",
            [account_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sum of all account balances
    pub fn total_balance(&self) -> Result<Decimal> {
        let conn = self.lock()?;
        let total: String = conn.query_row(
            "SELECT CAST(COALESCE(SUM(balance), 0) AS VARCHAR) FROM wallet_accounts",
            [],
            |row| row.get(0),
        )?;
        parse_decimal(&total)
    }
}

#[async_trait]
impl AccountRepository for DuckDbRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::query_one(&conn, "username = ? OR payment_id = ?", &[identifier, identifier])
    }

    async fn find_by_login(&self, username_or_email: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::query_one(
            &conn,
            "username = ? OR email = ?",
            &[username_or_email, username_or_email],
        )
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::query_one(&conn, "username = ?", &[username])
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::query_one(&conn, "account_id = ?", &[&id.to_string()])
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM wallet_accounts ORDER BY username",
            ACCOUNT_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], AccountRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| {
                let history = Self::load_history(&conn, &row.id)?;
                row.into_account(history)
            })
            .collect()
    }

    async fn insert(&self, account: &Account) -> Result<()> {
        account.validate()?;
        let conn = self.lock()?;

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM wallet_accounts
             WHERE username = ? OR email = ? OR payment_id = ?",
            params![account.username, account.email, account.payment_id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Err(Error::UsernameOrEmailTaken);
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO wallet_accounts
                (account_id, username, email, payment_id, credential, role,
                 balance, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, CAST(? AS DECIMAL(18, 2)), 0, ?, ?)",
            params![
                account.id.to_string(),
                account.username,
                account.email,
                account.payment_id,
                account.credential,
                account.role.as_str(),
                account.balance.to_string(),
                account.created_at.to_rfc3339(),
                now,
            ],
        )
        .map_err(|e| {
            if is_uniqueness_violation(&e) {
                Error::UsernameOrEmailTaken
            } else {
                Error::from(e)
            }
        })?;

        Ok(())
    }

    async fn save_all(&self, accounts: &[Account]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for account in accounts {
            // An error here drops `tx`, which rolls back every earlier write
            Self::write_account(&tx, account)?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.lock()?;
        let id = id.to_string();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM wallet_transactions WHERE account_id = ?", [&id])?;
        let deleted = tx.execute("DELETE FROM wallet_accounts WHERE account_id = ?", [&id])?;

        tx.commit()?;
        Ok(deleted > 0)
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::persistence(format!("Invalid id '{}': {}", s, e)))
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::persistence(format!("Invalid amount '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::persistence(format!("Invalid timestamp '{}': {}", s, e)))
}
