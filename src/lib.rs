// FastAccounts - Core Library
// Record normalization, storage adapters, aggregation and search.
// Used by the CLI, the API server and tests.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod import;
pub mod monitor;
pub mod normalizer;
pub mod record;
pub mod search;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use aggregation::{summarize, summarize_at, FinancialSummary, SummaryPolicy, Totals};
pub use config::{AppConfig, Backend, EngineOptions};
pub use error::{ConfigError, Error, Result, StoreError, ValidationError};
pub use import::{import_entries, load_entries, read_entries, ImportReport};
pub use monitor::{keep_alive, probe, watch, ConnectionStatus};
pub use normalizer::{format_localized, normalize, normalize_str, parse_localized, RawAmount};
pub use record::{BillingCycle, Currency, EntryForm, FinancialRecord, NewRecord, RecordId};
pub use search::{filter_records, MatchFields};
pub use service::AccountsService;
pub use store::{RecordStore, RestStore, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
