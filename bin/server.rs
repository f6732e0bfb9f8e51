// FastAccounts - Web Server
// REST API over the accounts service (axum)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fast_accounts::{
    probe, AccountsService, AppConfig, ConnectionStatus, EntryForm, Error, FinancialRecord,
    FinancialSummary, RecordId, SummaryPolicy, ValidationError,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<AccountsService>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Self::with_success(true, data)
    }

    /// Envelope for a payload sent alongside a non-2xx status
    fn with_success(success: bool, data: T) -> Json<Self> {
        Json(Self {
            success,
            data: Some(data),
            error: None,
        })
    }
}

/// Maps engine errors to status codes: bad input is the caller's fault,
/// a store failure is an upstream one.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Store(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(status = status.as_u16(), error = %self.0, "request failed");

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct SummaryParams {
    policy: Option<String>,
}

#[derive(Serialize)]
struct DeleteResponse {
    deleted: usize,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Store connectivity
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    health_response(probe(state.service.store().as_ref()).await)
}

fn health_response(status: ConnectionStatus) -> (StatusCode, Json<ApiResponse<ConnectionStatus>>) {
    let online = status.is_online();
    let code = if online {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, ApiResponse::with_success(online, status))
}

/// GET /api/accounts?q= - All records, filtered locally
async fn list_accounts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<FinancialRecord>> {
    Ok(ApiResponse::ok(state.service.filter(&params.q).await?))
}

/// POST /api/accounts - Save a new record
async fn create_account(
    State(state): State<AppState>,
    Json(entry): Json<EntryForm>,
) -> Result<(StatusCode, Json<ApiResponse<FinancialRecord>>), ApiError> {
    let stored = state.service.save_entry(entry).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(stored)))
}

/// GET /api/accounts/search?q= - Search on the store
async fn search_accounts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<FinancialRecord>> {
    Ok(ApiResponse::ok(state.service.search(&params.q).await?))
}

/// DELETE /api/accounts/by-service/:service - Remove every record with that name
async fn delete_by_service(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> ApiResult<DeleteResponse> {
    let deleted = state.service.delete_service(&service).await?;
    Ok(ApiResponse::ok(DeleteResponse { deleted }))
}

/// DELETE /api/accounts/:id - Remove one record
async fn delete_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let removed = state.service.delete_record(&RecordId::from(id)).await?;
    Ok(delete_response(removed).into_response())
}

fn delete_response(removed: bool) -> (StatusCode, Json<ApiResponse<DeleteResponse>>) {
    let code = if removed { StatusCode::OK } else { StatusCode::NOT_FOUND };
    let deleted = usize::from(removed);
    (code, ApiResponse::with_success(removed, DeleteResponse { deleted }))
}

/// GET /api/summary?policy=flag|date - Totals per currency
async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> ApiResult<FinancialSummary> {
    let policy = summary_policy(params.policy.as_deref(), state.service.options().policy)?;
    Ok(ApiResponse::ok(state.service.financial_summary_with(policy).await?))
}

/// A bad `?policy=` is the caller's input, not server configuration
fn summary_policy(raw: Option<&str>, default: SummaryPolicy) -> Result<SummaryPolicy, ApiError> {
    match raw {
        Some(raw) => raw
            .parse::<SummaryPolicy>()
            .map_err(|e| ApiError(Error::Validation(ValidationError::new("policy", e.to_string())))),
        None => Ok(default),
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("FastAccounts - Web Server");

    let config = AppConfig::from_env()?;
    let store = config.open_store()?;
    let service = AccountsService::new(store, config.engine.clone());

    // Create shared state
    let state = AppState {
        service: Arc::new(service),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/search", get(search_accounts))
        .route("/accounts/by-service/:service", delete(delete_by_service))
        .route("/accounts/:id", delete(delete_by_id))
        .route("/summary", get(get_summary))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "server running");

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
