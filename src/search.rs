// 🔍 Search / Filter Engine
// Case-insensitive substring matching over a record snapshot.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::record::FinancialRecord;

/// Which text fields a query is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFields {
    Service,
    #[default]
    ServiceAndDescription,
}

impl FromStr for MatchFields {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields: Vec<String> = s
            .split(',')
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        fields.sort();
        fields.dedup();

        match fields.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["service"] => Ok(MatchFields::Service),
            ["description", "service"] => Ok(MatchFields::ServiceAndDescription),
            _ => Err(ConfigError::Invalid {
                var: "ACCOUNTS_SEARCH_FIELDS",
                value: s.to_string(),
            }),
        }
    }
}

/// Does `record` contain `needle` (already lowercased) in one of `fields`?
pub fn matches(record: &FinancialRecord, needle: &str, fields: MatchFields) -> bool {
    if record.service.to_lowercase().contains(needle) {
        return true;
    }

    match fields {
        MatchFields::Service => false,
        MatchFields::ServiceAndDescription => record.description.to_lowercase().contains(needle),
    }
}

/// Filter a snapshot, keeping its order. A blank or whitespace-only query
/// keeps every record; otherwise the query is matched as typed, spaces included.
pub fn filter_records(
    records: &[FinancialRecord],
    query: &str,
    fields: MatchFields,
) -> Vec<FinancialRecord> {
    if query.trim().is_empty() {
        return records.to_vec();
    }
    let needle = query.to_lowercase();

    records
        .iter()
        .filter(|record| matches(record, &needle, fields))
        .cloned()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
