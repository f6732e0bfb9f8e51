// ☁️ Remote Record Store
// Supabase / PostgREST backend: one HTTP round trip per call, no retries.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use super::{RecordStore, ACCOUNTS_TABLE};
use crate::error::StoreError;
use crate::normalizer::RawAmount;
use crate::record::{parse_timestamp, Currency, FinancialRecord, NewRecord, RecordId};

const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Clone)]
pub struct RestStore {
    client: Client,
    table_url: String,
    key: String,
}

/// Row as PostgREST returns it. Converted into a typed record right away.
#[derive(Debug, Deserialize)]
struct AccountRow {
    id: RecordId,
    amount: Option<RawAmount>,
    currency: Option<String>,
    service: Option<String>,
    username: Option<String>,
    description: Option<String>,
    #[serde(alias = "recurring_billing")]
    is_recurring: Option<bool>,
    created_at: Option<String>,
}

impl TryFrom<AccountRow> for FinancialRecord {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let service = row
            .service
            .filter(|s| !s.is_empty())
            .ok_or_else(|| StoreError::Decode(format!("record {} has no service", row.id)))?;

        // Stored amounts are already canonical, so text is parsed as-is
        let amount = match row.amount {
            Some(RawAmount::Number(n)) => Some(n),
            Some(RawAmount::Text(s)) => s.trim().parse::<f64>().ok(),
            None => None,
        }
        .filter(|n| n.is_finite())
        .ok_or_else(|| StoreError::Decode(format!("record {} has no usable amount", row.id)))?;

        let created_at = row
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| StoreError::Decode(format!("record {} has a bad created_at", row.id)))?;

        Ok(FinancialRecord {
            id: row.id,
            amount,
            currency: Currency::from(row.currency.unwrap_or_default()),
            service,
            username: row.username.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            is_recurring: row.is_recurring.unwrap_or(false),
            created_at,
        })
    }
}

/// Build the quoted `ilike` operand for a free-text query.
///
/// LIKE metacharacters are escaped so they match literally, the value is
/// wrapped in `*` wildcards, and double quotes keep `,` `(` `)` from
/// breaking the surrounding `or=(...)` list.
pub fn ilike_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    for ch in query.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }

    let pattern = format!("*{}*", escaped);
    format!("\"{}\"", pattern.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `or` filter used by `search`
pub fn search_filter(query: &str) -> String {
    let pattern = ilike_pattern(query);
    format!("(service.ilike.{0},description.ilike.{0})", pattern)
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode_rows(response: Response) -> Result<Vec<FinancialRecord>, StoreError> {
    let rows: Vec<AccountRow> = check(response).await?.json().await?;
    rows.into_iter().map(FinancialRecord::try_from).collect()
}

impl RestStore {
    /// `base_url` is the project endpoint (e.g. `https://xyz.supabase.co`),
    /// `key` the API key sent as both `apikey` and bearer token.
    pub fn new(base_url: &str, key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(RestStore {
            client,
            table_url: table_url(base_url),
            key: key.to_string(),
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.table_url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn fetch(&self, query: &[(&str, String)]) -> Result<Vec<FinancialRecord>, StoreError> {
        debug!(?query, "remote select");
        let response = self.request(Method::GET).query(query).send().await?;
        decode_rows(response).await
    }

    async fn delete_where(&self, filter: (&str, String)) -> Result<usize, StoreError> {
        let response = self
            .request(Method::DELETE)
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("select", "id".to_string()), filter])
            .send()
            .await?;

        // Rows are counted, not decoded: a legacy row with missing columns is still gone
        let deleted: Vec<IgnoredAny> = check(response).await?.json().await?;
        Ok(deleted.len())
    }
}

fn table_url(base_url: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), ACCOUNTS_TABLE)
}

fn newest_first() -> (&'static str, String) {
    ("order", "created_at.desc".to_string())
}

#[async_trait]
impl RecordStore for RestStore {
    async fn insert(&self, record: NewRecord) -> Result<FinancialRecord, StoreError> {
        let response = self
            .request(Method::POST)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&record)
            .send()
            .await?;

        let stored = decode_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))?;

        info!(id = %stored.id, service = %stored.service, "record inserted");
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<FinancialRecord>, StoreError> {
        self.fetch(&[("select", "*".to_string()), newest_first()]).await
    }

    async fn query_by(
        &self,
        currency: &Currency,
        is_recurring: bool,
    ) -> Result<Vec<FinancialRecord>, StoreError> {
        self.fetch(&[
            ("select", "*".to_string()),
            ("currency", format!("eq.{}", currency.code())),
            ("is_recurring", format!("eq.{}", is_recurring)),
            newest_first(),
        ])
        .await
    }

    async fn delete_by_service(&self, service: &str) -> Result<usize, StoreError> {
        let removed = self
            .delete_where(("service", format!("eq.{}", service)))
            .await?;

        info!(service, removed, "records deleted by service");
        Ok(removed)
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError> {
        let removed = self.delete_where(("id", format!("eq.{}", id))).await?;
        Ok(removed > 0)
    }

    async fn search(&self, query: &str) -> Result<Vec<FinancialRecord>, StoreError> {
        self.fetch(&[
            ("select", "*".to_string()),
            ("or", search_filter(query)),
            newest_first(),
        ])
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let response = self
            .request(Method::GET)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const NETFLIX_ROW: &str = r#"{"id": 7, "amount": 55.9, "currency": "BRL", "service": "Netflix",
        "username": "ana", "description": "plano", "is_recurring": true,
        "created_at": "2025-03-01T12:00:00+00:00"}"#;

    /// One-shot HTTP stub: answers a single request with `status` and `body`
    /// and hands back the raw request text.
    async fn serve_once(status: &'static str, body: String) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&raw).to_string()
        });

        (addr, handle)
    }

    fn store_at(addr: SocketAddr) -> RestStore {
        RestStore::new(&format!("http://{}/", addr), "secret", Duration::from_secs(5)).unwrap()
    }

    fn request_line(request: &str) -> &str {
        request.lines().next().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_insert_posts_and_decodes_representation() {
        let (addr, server) = serve_once("201 Created", format!("[{}]", NETFLIX_ROW)).await;
        let store = store_at(addr);

        let stored = store
            .insert(NewRecord {
                amount: 55.9,
                currency: Currency::Brl,
                service: "Netflix".to_string(),
                username: "ana".to_string(),
                description: "plano".to_string(),
                is_recurring: true,
            })
            .await
            .unwrap();

        assert_eq!(stored.id.as_str(), "7");
        assert_eq!(stored.service, "Netflix");
        assert_eq!(stored.amount, 55.9);

        let request = server.await.unwrap();
        assert_eq!(request_line(&request), "POST /rest/v1/accounts HTTP/1.1");
        let lowered = request.to_lowercase();
        assert!(lowered.contains("prefer: return=representation"));
        assert!(lowered.contains("apikey: secret"));
        assert!(lowered.contains("authorization: bearer secret"));
        assert!(request.contains(r#""service":"Netflix""#));
        assert!(request.contains(r#""currency":"BRL""#));
    }

    #[tokio::test]
    async fn test_query_by_sends_currency_and_flag_filters() {
        let (addr, server) = serve_once("200 OK", format!("[{}]", NETFLIX_ROW)).await;

        let records = store_at(addr).query_by(&Currency::Brl, true).await.unwrap();
        assert_eq!(records.len(), 1);

        let request = server.await.unwrap();
        let line = request_line(&request);
        assert!(line.starts_with("GET /rest/v1/accounts?"));
        assert!(line.contains("select=*"));
        assert!(line.contains("currency=eq.BRL"));
        assert!(line.contains("is_recurring=eq.true"));
        assert!(line.contains("order=created_at.desc"));
    }

    #[tokio::test]
    async fn test_delete_counts_rows_without_decoding_records() {
        // Second row is a legacy one without created_at
        let body = r#"[{"id": 1, "service": "Spotify", "amount": 21.9,
                        "created_at": "2025-03-01T12:00:00Z"},
                       {"id": 2, "service": "Spotify", "amount": 21.9, "created_at": null}]"#;
        let (addr, server) = serve_once("200 OK", body.to_string()).await;

        let removed = store_at(addr).delete_by_service("Spotify").await.unwrap();
        assert_eq!(removed, 2);

        let request = server.await.unwrap();
        assert_eq!(
            request_line(&request),
            "DELETE /rest/v1/accounts?select=id&service=eq.Spotify HTTP/1.1"
        );
        assert!(request.to_lowercase().contains("prefer: return=representation"));
    }

    #[tokio::test]
    async fn test_delete_by_id_reports_missing_record() {
        let (addr, server) = serve_once("200 OK", "[]".to_string()).await;

        let removed = store_at(addr).delete_by_id(&RecordId::from("42")).await.unwrap();
        assert!(!removed);

        let request = server.await.unwrap();
        assert!(request_line(&request).contains("id=eq.42"));
    }

    #[tokio::test]
    async fn test_search_sends_or_filter_newest_first() {
        let (addr, server) = serve_once("200 OK", format!("[{}]", NETFLIX_ROW)).await;

        let records = store_at(addr).search("net").await.unwrap();
        assert_eq!(records[0].service, "Netflix");

        let request = server.await.unwrap();
        let line = request_line(&request);
        assert!(line.contains("or=%28service.ilike.%22*net*%22%2Cdescription.ilike.%22*net*%22%29"));
        assert!(line.contains("order=created_at.desc"));
    }

    #[tokio::test]
    async fn test_ping_reads_one_id() {
        let (addr, server) = serve_once("200 OK", "[]".to_string()).await;

        store_at(addr).ping().await.unwrap();

        let request = server.await.unwrap();
        assert_eq!(
            request_line(&request),
            "GET /rest/v1/accounts?select=id&limit=1 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let (addr, server) =
            serve_once("503 Service Unavailable", r#"{"message":"paused"}"#.to_string()).await;

        let err = store_at(addr).list_all().await.unwrap_err();
        match err {
            StoreError::Status { status, body } => {
                assert_eq!(status, 503);
                assert!(body.contains("paused"));
            }
            other => panic!("expected status error, got {:?}", other),
        }

        server.await.unwrap();
    }

    #[test]
    fn test_table_url_trims_slash() {
        assert_eq!(
            table_url("https://demo.supabase.co/"),
            "https://demo.supabase.co/rest/v1/accounts"
        );
    }

    #[test]
    fn test_ilike_pattern_escapes() {
        assert_eq!(ilike_pattern("net"), r#""*net*""#);
        assert_eq!(ilike_pattern("a,b"), r#""*a,b*""#);
        assert_eq!(ilike_pattern("50%_off"), r#""*50\\%\\_off*""#);
        assert_eq!(ilike_pattern(r#"say "hi""#), r#""*say \"hi\"*""#);
    }

    #[test]
    fn test_search_filter_covers_both_fields() {
        assert_eq!(
            search_filter("net"),
            r#"(service.ilike."*net*",description.ilike."*net*")"#
        );
    }

    #[test]
    fn test_row_conversion() {
        let row: AccountRow = serde_json::from_str(
            r#"{"id": 7, "amount": 55.9, "currency": "BRL", "service": "Netflix",
                "username": "ana", "description": null, "is_recurring": true,
                "created_at": "2025-03-01T12:00:00.123456+00:00"}"#,
        )
        .unwrap();

        let record = FinancialRecord::try_from(row).unwrap();
        assert_eq!(record.id.as_str(), "7");
        assert_eq!(record.amount, 55.9);
        assert_eq!(record.currency, Currency::Brl);
        assert_eq!(record.description, "");
        assert!(record.is_recurring);
    }

    #[test]
    fn test_row_with_text_amount_is_not_relocalized() {
        let row: AccountRow = serde_json::from_str(
            r#"{"id": "x", "amount": "1585.43", "currency": "USD", "service": "AWS",
                "created_at": "2025-03-01 12:00:00"}"#,
        )
        .unwrap();

        assert_eq!(FinancialRecord::try_from(row).unwrap().amount, 1585.43);
    }

    #[test]
    fn test_row_without_service_is_rejected() {
        let row: AccountRow = serde_json::from_str(
            r#"{"id": 1, "amount": 1, "created_at": "2025-03-01T12:00:00Z"}"#,
        )
        .unwrap();

        assert!(matches!(
            FinancialRecord::try_from(row),
            Err(StoreError::Decode(_))
        ));
    }
}
