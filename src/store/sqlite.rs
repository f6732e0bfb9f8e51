// 💾 SQLite Record Store
// Local backend for the accounts table (file or in-memory), WAL journal.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::RecordStore;
use crate::error::StoreError;
use crate::record::{parse_timestamp, Currency, FinancialRecord, NewRecord, RecordId};
use crate::search::{self, MatchFields};

const SELECT_COLUMNS: &str =
    "SELECT id, amount, currency, service, username, description, is_recurring, created_at
     FROM accounts";

const NEWEST_FIRST: &str = "ORDER BY created_at DESC, rowid DESC";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn select(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("{} {} {}", SELECT_COLUMNS, filter, NEWEST_FIRST);
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(params, record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = records.len(), filter, "sqlite select");
        Ok(records)
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            service TEXT NOT NULL,
            username TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            is_recurring INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_service ON accounts(service)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_bucket ON accounts(currency, is_recurring)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_created_at ON accounts(created_at)",
        [],
    )?;

    Ok(())
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FinancialRecord> {
    let id: String = row.get(0)?;
    let currency: String = row.get(2)?;
    let created_at_str: String = row.get(7)?;

    let created_at = parse_timestamp(&created_at_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            Type::Text,
            format!("bad created_at {:?}", created_at_str).into(),
        )
    })?;

    Ok(FinancialRecord {
        id: RecordId::from(id),
        amount: row.get(1)?,
        currency: Currency::from(currency),
        service: row.get(3)?,
        username: row.get(4)?,
        description: row.get(5)?,
        is_recurring: row.get(6)?,
        created_at,
    })
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn insert(&self, record: NewRecord) -> Result<FinancialRecord, StoreError> {
        let id = RecordId::from(uuid::Uuid::new_v4().to_string());
        let created_at = Utc::now();

        self.lock()?.execute(
            "INSERT INTO accounts (
                id, amount, currency, service, username, description, is_recurring, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.as_str(),
                record.amount,
                record.currency.code(),
                record.service,
                record.username,
                record.description,
                record.is_recurring,
                created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        info!(id = %id, service = %record.service, "record inserted");
        Ok(record.into_record(id, created_at))
    }

    async fn list_all(&self) -> Result<Vec<FinancialRecord>, StoreError> {
        self.select("", [])
    }

    async fn query_by(
        &self,
        currency: &Currency,
        is_recurring: bool,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        self.select(
            "WHERE currency = ?1 AND is_recurring = ?2",
            params![currency.code(), is_recurring],
        )
    }

    async fn delete_by_service(&self, service: &str) -> Result<usize, StoreError> {
        let removed = self
            .lock()?
            .execute("DELETE FROM accounts WHERE service = ?1", [service])?;

        info!(service, removed, "records deleted by service");
        Ok(removed)
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError> {
        let removed = self
            .lock()?
            .execute("DELETE FROM accounts WHERE id = ?1", [id.as_str()])?;

        Ok(removed > 0)
    }

    async fn search(&self, query: &str) -> Result<Vec<FinancialRecord>, StoreError> {
        // SQLite LIKE only folds ASCII, so match in Rust to keep accents case-insensitive
        let records = self.select("", [])?;
        Ok(search::filter_records(
            &records,
            query,
            MatchFields::ServiceAndDescription,
        ))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id FROM accounts LIMIT 1")?;
        let _ = stmt.query_map([], |row| row.get::<_, String>(0))?.next().transpose()?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
