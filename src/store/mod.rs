// 🗄️ Record Store Adapter
// The engine's view of its persistence collaborator. Every call is a fresh
// round trip; nothing is cached between calls.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{Currency, FinancialRecord, NewRecord, RecordId};

pub mod rest;
pub mod sqlite;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Table holding the records, both locally and remotely
pub const ACCOUNTS_TABLE: &str = "accounts";

/// Contract the engine needs from a structured-record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record; the store assigns `id` and `created_at`
    async fn insert(&self, record: NewRecord) -> Result<FinancialRecord, StoreError>;

    /// Every record, newest first
    async fn list_all(&self) -> Result<Vec<FinancialRecord>, StoreError>;

    /// Equality filter on currency and recurrence flag
    async fn query_by(
        &self,
        currency: &Currency,
        is_recurring: bool,
    ) -> Result<Vec<FinancialRecord>, StoreError>;

    /// Remove every record whose service equals `service`. Returns how many went.
    async fn delete_by_service(&self, service: &str) -> Result<usize, StoreError>;

    /// Remove a single record. Returns false when no such id exists.
    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError>;

    /// Case-insensitive substring match on service OR description, newest first
    async fn search(&self, query: &str) -> Result<Vec<FinancialRecord>, StoreError>;

    /// Minimal read used for connectivity checks and keep-alive pings
    async fn ping(&self) -> Result<(), StoreError>;
}
