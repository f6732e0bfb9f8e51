// 📊 Aggregation Engine
// Per-currency monthly / annual totals under a configurable bucketing policy.
//
// FlagBased:  monthly = recurring records, annual = one-off records.
// DateBased:  annual = created this calendar year, monthly = created this
//             calendar month (so annual includes monthly).

use chrono::{DateTime, Datelike, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::record::{Currency, FinancialRecord};

// ============================================================================
// POLICY
// ============================================================================

/// Rule used to put a record into the monthly or the annual bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryPolicy {
    /// Partition by recurrence flag, ignore timestamps
    #[default]
    FlagBased,
    /// Partition by creation date relative to now, ignore the flag
    DateBased,
}

impl SummaryPolicy {
    pub fn name(&self) -> &str {
        match self {
            SummaryPolicy::FlagBased => "flag",
            SummaryPolicy::DateBased => "date",
        }
    }
}

impl FromStr for SummaryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flag" | "flag_based" | "recurring" => Ok(SummaryPolicy::FlagBased),
            "date" | "date_based" | "calendar" => Ok(SummaryPolicy::DateBased),
            _ => Err(ConfigError::Invalid {
                var: "ACCOUNTS_SUMMARY_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub monthly: f64,
    pub annual: f64,
}

/// Totals keyed by currency. BRL and USD are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialSummary {
    totals: BTreeMap<Currency, Totals>,
}

impl Default for FinancialSummary {
    fn default() -> Self {
        FinancialSummary {
            totals: Currency::AGGREGATED
                .iter()
                .map(|c| (c.clone(), Totals::default()))
                .collect(),
        }
    }
}

impl FinancialSummary {
    /// Totals for a currency; zero for anything not aggregated
    pub fn get(&self, currency: &Currency) -> Totals {
        self.totals.get(currency).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Currency, &Totals)> {
        self.totals.iter()
    }

    fn add(&mut self, currency: &Currency, monthly: f64, annual: f64) {
        // Unrecognized currencies never get a bucket
        if let Some(totals) = self.totals.get_mut(currency) {
            totals.monthly += monthly;
            totals.annual += annual;
        }
    }
}

/// Summarize against the local clock
pub fn summarize(records: &[FinancialRecord], policy: SummaryPolicy) -> FinancialSummary {
    summarize_at(records, policy, Local::now())
}

/// Summarize against an explicit instant. Calendar boundaries for the
/// date-based policy are taken in `now`'s time zone.
pub fn summarize_at<Tz: TimeZone>(
    records: &[FinancialRecord],
    policy: SummaryPolicy,
    now: DateTime<Tz>,
) -> FinancialSummary {
    let mut summary = FinancialSummary::default();

    for record in records {
        match policy {
            SummaryPolicy::FlagBased => {
                if record.is_recurring {
                    summary.add(&record.currency, record.amount, 0.0);
                } else {
                    summary.add(&record.currency, 0.0, record.amount);
                }
            }
            SummaryPolicy::DateBased => {
                let created = record.created_at.with_timezone(&now.timezone());
                if created.year() != now.year() {
                    continue;
                }
                let monthly = if created.month() == now.month() {
                    record.amount
                } else {
                    0.0
                };
                summary.add(&record.currency, monthly, record.amount);
            }
        }
    }

    summary
}

// ============================================================================
// TESTS
// ============================================================================
