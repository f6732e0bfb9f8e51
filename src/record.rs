// 🧾 Financial Record Model
// Typed record read back from the store, the insert payload, and the raw
// entry form that the embedding application validates before saving.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::normalizer::{self, RawAmount};

// ============================================================================
// CURRENCY
// ============================================================================

/// Currency code of a record. Only BRL and USD take part in totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Currency {
    #[default]
    Brl,
    Usd,
    Eur,
    /// Code read back from the store that we do not know about
    Other(String),
}

impl Currency {
    /// Currencies that always appear in a summary
    pub const AGGREGATED: [Currency; 2] = [Currency::Brl, Currency::Usd];

    pub fn code(&self) -> &str {
        match self {
            Currency::Brl => "BRL",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Other(code) => code,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Currency::Brl => "R$",
            Currency::Usd => "US$",
            Currency::Eur => "€",
            Currency::Other(code) => code,
        }
    }

    pub fn is_aggregated(&self) -> bool {
        matches!(self, Currency::Brl | Currency::Usd)
    }

    /// Parse a code typed by the user. Unknown codes are rejected here,
    /// while codes coming back from the store are kept as `Other`.
    pub fn parse_input(code: &str) -> Result<Self, ValidationError> {
        match Currency::from(code.to_string()) {
            Currency::Other(_) => Err(ValidationError::new(
                "currency",
                format!("Unsupported currency {:?} (expected BRL, USD or EUR)", code.trim()),
            )),
            known => Ok(known),
        }
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        match code.trim().to_uppercase().as_str() {
            "BRL" => Currency::Brl,
            "USD" => Currency::Usd,
            "EUR" => Currency::Eur,
            _ => Currency::Other(code),
        }
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// BILLING CYCLE
// ============================================================================

/// Billing choice offered by the entry form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingCycle {
    Monthly,
    Yearly,
    OneTime,
}

impl BillingCycle {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, BillingCycle::OneTime)
    }
}

impl FromStr for BillingCycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(BillingCycle::Monthly),
            "yearly" | "annual" => Ok(BillingCycle::Yearly),
            "one-time" | "one-off" | "onetime" | "once" => Ok(BillingCycle::OneTime),
            other => Err(ValidationError::new(
                "billing",
                format!("Unknown billing cycle {:?}", other),
            )),
        }
    }
}

// ============================================================================
// RECORD ID
// ============================================================================

/// Store-assigned identifier, opaque to the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct RecordId(String);

/// Remote stores hand out numeric ids, the local store hands out UUIDs
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for RecordId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => RecordId(n.to_string()),
            RawId::Text(s) => RecordId(s),
        }
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// A stored expense entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: RecordId,
    pub amount: f64,
    pub currency: Currency,
    pub service: String,
    pub username: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "recurring_billing")]
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    pub amount: f64,
    pub currency: Currency,
    pub service: String,
    pub username: String,
    pub description: String,
    pub is_recurring: bool,
}

impl NewRecord {
    /// Attach store-assigned identity
    pub fn into_record(self, id: RecordId, created_at: DateTime<Utc>) -> FinancialRecord {
        FinancialRecord {
            id,
            amount: self.amount,
            currency: self.currency,
            service: self.service,
            username: self.username,
            description: self.description,
            is_recurring: self.is_recurring,
            created_at,
        }
    }
}

/// Raw values as collected by a form, a CSV row or a JSON request body
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntryForm {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub amount: Option<RawAmount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "recurring_billing", alias = "is_recurring")]
    pub recurring: Option<bool>,
    #[serde(default)]
    pub billing: Option<String>,
}

impl EntryForm {
    /// Validate required fields and normalize the amount.
    ///
    /// `default_username` fills in a missing username. A blank amount and
    /// amount text that does not parse are both rejected, so a zero amount
    /// only reaches the store when typed explicitly.
    pub fn validate(self, default_username: Option<&str>) -> Result<NewRecord, ValidationError> {
        let service = self.service.trim().to_string();
        if service.is_empty() {
            return Err(ValidationError::required("service"));
        }

        let username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .or_else(|| default_username.map(str::to_string))
            .unwrap_or_default();
        if username.is_empty() {
            return Err(ValidationError::required("username"));
        }

        let amount = match &self.amount {
            None => return Err(ValidationError::required("amount")),
            Some(raw) if raw.is_blank() => return Err(ValidationError::required("amount")),
            Some(RawAmount::Text(text)) => normalizer::parse_localized(text)
                .map_err(|e| ValidationError::new("amount", e.to_string()))?,
            Some(number) => normalizer::normalize(Some(number)),
        };

        let currency = match self.currency.as_deref().map(str::trim) {
            None | Some("") => Currency::default(),
            Some(code) => Currency::parse_input(code)?,
        };

        let is_recurring = match (self.billing.as_deref(), self.recurring) {
            (Some(billing), _) => billing.parse::<BillingCycle>()?.is_recurring(),
            (None, Some(flag)) => flag,
            (None, None) => true,
        };

        Ok(NewRecord {
            amount,
            currency,
            service,
            username,
            description: self.description.unwrap_or_default().trim().to_string(),
            is_recurring,
        })
    }
}

/// Parse a timestamp as stores return it: RFC 3339, or naive UTC
/// (`2024-05-01 10:00:00` / `2024-05-01T10:00:00.123`)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn form(service: &str, amount: &str) -> EntryForm {
        EntryForm {
            service: service.to_string(),
            username: Some("ana".to_string()),
            amount: Some(RawAmount::from(amount)),
            currency: Some("BRL".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(Currency::from("brl".to_string()), Currency::Brl);
        assert_eq!(Currency::from(" USD ".to_string()), Currency::Usd);
        assert_eq!(Currency::from("GBP".to_string()), Currency::Other("GBP".to_string()));
        assert!(Currency::Usd.is_aggregated());
        assert!(!Currency::Eur.is_aggregated());
        assert!(Currency::parse_input("GBP").is_err());
        assert_eq!(Currency::parse_input("eur").unwrap(), Currency::Eur);
        assert_eq!(Currency::default(), Currency::Brl);
    }

    #[test]
    fn test_currency_serde_as_code() {
        let json = serde_json::to_string(&Currency::Brl).unwrap();
        assert_eq!(json, "\"BRL\"");
        let back: Currency = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(back, Currency::Usd);
    }

    #[test]
    fn test_record_id_from_number_or_text() {
        let n: RecordId = serde_json::from_str("42").unwrap();
        let t: RecordId = serde_json::from_str("\"a-b\"").unwrap();
        assert_eq!(n.as_str(), "42");
        assert_eq!(t.as_str(), "a-b");
    }

    #[test]
    fn test_billing_cycle() {
        assert!("Monthly".parse::<BillingCycle>().unwrap().is_recurring());
        assert!("Yearly".parse::<BillingCycle>().unwrap().is_recurring());
        assert!(!"One-time".parse::<BillingCycle>().unwrap().is_recurring());
        assert!("weekly".parse::<BillingCycle>().is_err());
    }

    #[test]
    fn test_validate_normalizes_amount() {
        let record = form("Netflix", "1.585,43").validate(None).unwrap();
        assert_eq!(record.amount, 1585.43);
        assert_eq!(record.currency, Currency::Brl);
        assert!(record.is_recurring);
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_validate_required_fields() {
        let err = form("  ", "10,00").validate(None).unwrap_err();
        assert_eq!(err.field, "service");

        let mut no_user = form("Spotify", "10,00");
        no_user.username = None;
        assert_eq!(no_user.clone().validate(None).unwrap_err().field, "username");
        assert_eq!(no_user.validate(Some("default")).unwrap().username, "default");

        let mut no_amount = form("Spotify", "");
        assert_eq!(no_amount.clone().validate(None).unwrap_err().field, "amount");
        no_amount.amount = None;
        assert_eq!(no_amount.validate(None).unwrap_err().field, "amount");
    }

    #[test]
    fn test_validate_rejects_garbage_amount_but_allows_explicit_zero() {
        let err = form("Spotify", "abc").validate(None).unwrap_err();
        assert_eq!(err.field, "amount");

        let zero = form("Spotify", "0,00").validate(None).unwrap();
        assert_eq!(zero.amount, 0.0);
    }

    #[test]
    fn test_validate_billing_overrides_flag() {
        let mut entry = form("Hotel", "900,00");
        entry.recurring = Some(true);
        entry.billing = Some("One-time".to_string());
        assert!(!entry.validate(None).unwrap().is_recurring);
    }

    #[test]
    fn test_entry_form_from_json() {
        let entry: EntryForm = serde_json::from_str(
            r#"{"service":"AWS","username":"ops","amount":20.5,"currency":"USD","recurring_billing":false}"#,
        )
        .unwrap();
        let record = entry.validate(None).unwrap();
        assert_eq!(record.amount, 20.5);
        assert_eq!(record.currency, Currency::Usd);
        assert!(!record.is_recurring);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let a = parse_timestamp("2024-05-01T10:00:00+00:00").unwrap();
        let b = parse_timestamp("2024-05-01T10:00:00.000000").unwrap();
        let c = parse_timestamp("2024-05-01 10:00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(parse_timestamp("yesterday").is_none());
    }
}
