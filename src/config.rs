// ⚙️ Configuration
// Resolved once at process start from the environment (and `.env`).
// Missing connection settings are fatal.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::aggregation::SummaryPolicy;
use crate::error::{ConfigError, StoreError};
use crate::search::MatchFields;
use crate::store::{RecordStore, RestStore, SqliteStore};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Where records live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Supabase project endpoint plus API key
    Remote { url: String, key: String },
    /// Local SQLite file
    Sqlite { path: PathBuf },
}

/// Engine behavior the embedding application can tune
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineOptions {
    pub policy: SummaryPolicy,
    pub match_fields: MatchFields,
    pub default_username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    pub engine: EngineOptions,
    pub request_timeout: Duration,
    pub probe_interval: Duration,
    pub listen_addr: SocketAddr,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get("ACCOUNTS_DB_PATH") {
            Some(path) => Backend::Sqlite {
                path: PathBuf::from(path),
            },
            None => Backend::Remote {
                url: get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                key: get("SUPABASE_KEY").ok_or(ConfigError::Missing("SUPABASE_KEY"))?,
            },
        };

        let policy = get("ACCOUNTS_SUMMARY_POLICY")
            .map(|v| v.parse::<SummaryPolicy>())
            .transpose()?
            .unwrap_or_default();

        let match_fields = get("ACCOUNTS_SEARCH_FIELDS")
            .map(|v| v.parse::<MatchFields>())
            .transpose()?
            .unwrap_or_default();

        let request_timeout = Duration::from_secs(parse_secs(
            "ACCOUNTS_REQUEST_TIMEOUT_SECS",
            get("ACCOUNTS_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let probe_interval = Duration::from_secs(parse_secs(
            "ACCOUNTS_PROBE_INTERVAL_SECS",
            get("ACCOUNTS_PROBE_INTERVAL_SECS"),
            DEFAULT_PROBE_INTERVAL_SECS,
        )?);

        let listen_raw = get("ACCOUNTS_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            var: "ACCOUNTS_LISTEN_ADDR",
            value: listen_raw.clone(),
        })?;

        Ok(AppConfig {
            backend,
            engine: EngineOptions {
                policy,
                match_fields,
                default_username: get("ACCOUNTS_DEFAULT_USERNAME"),
            },
            request_timeout,
            probe_interval,
            listen_addr,
        })
    }

    /// Construct the store handle this configuration points at
    pub fn open_store(&self) -> Result<Arc<dyn RecordStore>, StoreError> {
        match &self.backend {
            Backend::Remote { url, key } => {
                Ok(Arc::new(RestStore::new(url, key, self.request_timeout)?))
            }
            Backend::Sqlite { path } => Ok(Arc::new(SqliteStore::open(path)?)),
        }
    }
}

fn parse_secs(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::Invalid { var, value }),
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================
