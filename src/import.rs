// 📥 CSV Import
// Bulk-load entries; every row goes through the same validation as a single save.
//
// Expected headers: service,username,amount,currency,description,recurring

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::normalizer::RawAmount;
use crate::record::EntryForm;
use crate::service::AccountsService;

/// One CSV row. Amount stays text so the locale normalizer sees it untouched.
#[derive(Debug, Deserialize)]
struct CsvRow {
    service: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    recurring: Option<String>,
}

impl CsvRow {
    fn into_entry(self, line: usize) -> EntryForm {
        // "recurring" accepts true/false or a billing label (Monthly, One-time, ...)
        let (recurring, billing) = match self.recurring.as_deref().map(str::trim) {
            None | Some("") => (None, None),
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => (Some(true), None),
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => (Some(false), None),
            Some(v) => (None, Some(v.to_string())),
        };

        if self.service.trim().is_empty() {
            warn!(line, "csv row without service");
        }

        EntryForm {
            service: self.service,
            username: self.username,
            amount: self.amount.map(RawAmount::Text),
            currency: self.currency,
            description: self.description,
            recurring,
            billing,
        }
    }
}

/// Read entries from any CSV source
pub fn read_entries<R: Read>(reader: R) -> Result<Vec<EntryForm>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);

    let mut entries = Vec::new();
    for (index, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("Failed to deserialize row at line {}", line))?;
        entries.push(row.into_entry(line));
    }

    Ok(entries)
}

pub fn load_entries(csv_path: &Path) -> Result<Vec<EntryForm>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {:?}", csv_path))?;
    read_entries(file)
}

/// Outcome of an import run
#[derive(Debug, Default)]
pub struct ImportReport {
    pub saved: usize,
    /// (row number, reason) for every row that did not make it
    pub rejected: Vec<(usize, String)>,
}

/// Save every entry, collecting failures instead of stopping at the first one
pub async fn import_entries(service: &AccountsService, entries: Vec<EntryForm>) -> ImportReport {
    let mut report = ImportReport::default();

    for (index, entry) in entries.into_iter().enumerate() {
        match service.save_entry(entry).await {
            Ok(_) => report.saved += 1,
            Err(e) => report.rejected.push((index + 2, e.to_string())),
        }
    }

    report
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::record::Currency;
    use crate::store::SqliteStore;
    use std::sync::Arc;

    const SAMPLE: &str = "\
service,username,amount,currency,description,recurring
Netflix,ana,\"55,90\",BRL,plano padrão,Monthly
Hotel Paris,ana,\"1.585,43\",EUR,,One-time
GitHub,ops,4,USD,,true
,ana,10,BRL,,true
Spotify,ana,abc,BRL,,true
";

    #[test]
    fn test_read_entries() {
        let entries = read_entries(SAMPLE.as_bytes()).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].billing.as_deref(), Some("Monthly"));
        assert_eq!(entries[2].recurring, Some(true));
        assert_eq!(entries[1].amount, Some(RawAmount::Text("1.585,43".to_string())));
    }

    #[tokio::test]
    async fn test_import_reports_rejected_rows() {
        let service = AccountsService::new(
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            EngineOptions::default(),
        );

        let entries = read_entries(SAMPLE.as_bytes()).unwrap();
        let report = import_entries(&service, entries).await;

        assert_eq!(report.saved, 3);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].0, 5);
        assert_eq!(report.rejected[1].0, 6);

        let hotel = service.search("paris").await.unwrap();
        assert_eq!(hotel[0].amount, 1585.43);
        assert_eq!(hotel[0].currency, Currency::Eur);
        assert!(!hotel[0].is_recurring);
    }
}
