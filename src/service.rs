// 🧮 Accounts Service
// What the embedding application calls: validate + normalize on save,
// summaries and search over freshly fetched records, deletes, probes.

use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregation::{self, FinancialSummary, SummaryPolicy};
use crate::config::EngineOptions;
use crate::error::{Result, StoreError};
use crate::record::{Currency, EntryForm, FinancialRecord, RecordId};
use crate::search;
use crate::store::RecordStore;

pub struct AccountsService {
    store: Arc<dyn RecordStore>,
    options: EngineOptions,
}

impl AccountsService {
    pub fn new(store: Arc<dyn RecordStore>, options: EngineOptions) -> Self {
        AccountsService { store, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Validate the entry, then persist it. Nothing reaches the store when
    /// validation fails, and a failed insert is returned as an error.
    pub async fn save_entry(&self, entry: EntryForm) -> Result<FinancialRecord> {
        let record = entry.validate(self.options.default_username.as_deref())?;
        let stored = self.store.insert(record).await?;
        Ok(stored)
    }

    pub async fn list(&self) -> Result<Vec<FinancialRecord>> {
        Ok(self.store.list_all().await?)
    }

    /// Fresh snapshot filtered locally with the configured match fields
    pub async fn filter(&self, query: &str) -> Result<Vec<FinancialRecord>> {
        let records = self.store.list_all().await?;
        Ok(search::filter_records(
            &records,
            query,
            self.options.match_fields,
        ))
    }

    /// Search delegated to the store. A blank query lists everything instead.
    pub async fn search(&self, query: &str) -> Result<Vec<FinancialRecord>> {
        if query.trim().is_empty() {
            return self.list().await;
        }
        Ok(self.store.search(query).await?)
    }

    /// Summary under the configured policy
    pub async fn financial_summary(&self) -> Result<FinancialSummary> {
        self.financial_summary_with(self.options.policy).await
    }

    pub async fn financial_summary_with(&self, policy: SummaryPolicy) -> Result<FinancialSummary> {
        let records = match policy {
            SummaryPolicy::FlagBased => self.fetch_flag_buckets().await?,
            SummaryPolicy::DateBased => self.store.list_all().await?,
        };

        Ok(aggregation::summarize(&records, policy))
    }

    /// Only the records the flag-based policy can count, one filtered query per bucket
    async fn fetch_flag_buckets(&self) -> std::result::Result<Vec<FinancialRecord>, StoreError> {
        let mut records = Vec::new();
        for currency in Currency::AGGREGATED.iter() {
            for recurring in [true, false] {
                records.extend(self.store.query_by(currency, recurring).await?);
            }
        }
        Ok(records)
    }

    /// Remove every record carrying this service name. Service names are not
    /// guaranteed unique, so more than one record may go.
    pub async fn delete_service(&self, service: &str) -> Result<usize> {
        let removed = self.store.delete_by_service(service).await?;
        if removed > 1 {
            warn!(service, removed, "delete by service name removed several records");
        } else {
            info!(service, removed, "delete by service name");
        }
        Ok(removed)
    }

    pub async fn delete_record(&self, id: &RecordId) -> Result<bool> {
        Ok(self.store.delete_by_id(id).await?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
