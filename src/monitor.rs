// 📡 Connectivity Monitor
// Lightweight probe against the store, used for the online/offline badge
// and for the keep-alive ping that stops a free-tier backend from pausing.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::store::RecordStore;

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Online { checked_at: DateTime<Local> },
    Offline { checked_at: DateTime<Local>, reason: String },
}

impl ConnectionStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectionStatus::Online { .. })
    }

    pub fn checked_at(&self) -> DateTime<Local> {
        match self {
            ConnectionStatus::Online { checked_at } => *checked_at,
            ConnectionStatus::Offline { checked_at, .. } => *checked_at,
        }
    }

    /// Short label for status lines: "Connected · Sync: 14:02:11" / "Offline"
    pub fn label(&self) -> String {
        match self {
            ConnectionStatus::Online { checked_at } => {
                format!("Connected · Sync: {}", checked_at.format("%H:%M:%S"))
            }
            ConnectionStatus::Offline { .. } => "Offline".to_string(),
        }
    }
}

/// Run the minimal read once and report the outcome. Never fails.
pub async fn probe(store: &dyn RecordStore) -> ConnectionStatus {
    let checked_at = Local::now();
    match store.ping().await {
        Ok(()) => ConnectionStatus::Online { checked_at },
        Err(e) => {
            warn!(error = %e, "store probe failed");
            ConnectionStatus::Offline {
                checked_at,
                reason: e.to_string(),
            }
        }
    }
}

/// Single keep-alive ping. The error is returned so a scheduler can flag it.
pub async fn keep_alive(store: &dyn RecordStore) -> Result<(), StoreError> {
    match store.ping().await {
        Ok(()) => {
            info!(at = %Local::now(), "keep-alive ping succeeded");
            Ok(())
        }
        Err(e) => {
            warn!(at = %Local::now(), error = %e, "keep-alive ping failed");
            Err(e)
        }
    }
}

/// Probe every `interval` and hand each status to `on_status`. Stops when
/// `on_status` returns false.
pub async fn watch<F>(store: &dyn RecordStore, interval: Duration, mut on_status: F)
where
    F: FnMut(ConnectionStatus) -> bool,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !on_status(probe(store).await) {
            break;
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
