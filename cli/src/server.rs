use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use crate::usda::UsdaClient;
use nutrilog_core::db::Database;
use nutrilog_core::error::TrackerError;
use nutrilog_core::models::{
    DailyRecord, Dashboard, FoodCandidate, GoalSettings, LoggedEntry, parse_day,
};
use nutrilog_core::report;
use nutrilog_core::tracker::{SEARCH_FAILED_MESSAGE, Tracker};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

/// Stamped on every response, error responses included.
const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("content-security-policy", "default-src 'none'"),
    ("referrer-policy", "no-referrer"),
];

#[derive(Clone)]
struct AppState {
    tracker: Arc<Mutex<Tracker<Database>>>,
    usda: Arc<UsdaClient>,
    api_key: Option<String>,
}

impl AppState {
    fn tracker(&self) -> MutexGuard<'_, Tracker<Database>> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Either an index into the last server-side search, or a full candidate.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddEntryRequest {
    candidate_index: Option<usize>,
    candidate: Option<FoodCandidate>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    Unauthorized,
    BadRequest(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid or missing API key".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(err) => {
                tracing::error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<TrackerError>() {
            Some(TrackerError::SearchFailed(_)) => {
                Self::BadGateway(SEARCH_FAILED_MESSAGE.to_string())
            }
            Some(e) if e.is_user_input() => Self::BadRequest(e.to_string()),
            _ => Self::Internal(err),
        }
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        anyhow::Error::from(err).into()
    }
}

fn parse_path_date(date_str: &str) -> Result<NaiveDate, ApiError> {
    Ok(parse_day(date_str)?)
}

// --- Middleware ---

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Every `/api` route needs `Authorization: Bearer <key>` unless the server
/// was started with `--no-auth`.
async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    if bearer_token(request.headers()) != Some(expected) {
        tracing::debug!(path = request.uri().path(), "rejected unauthenticated request");
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    response
}

// --- Handlers ---

async fn search_foods(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<FoodCandidate>>, ApiError> {
    // The lock is only held to issue the ticket and to apply the outcome.
    let ticket = state.tracker().begin_search(&params.q)?;
    let outcome = state.usda.search_async(&params.q).await;
    state.tracker().complete_search(ticket, &outcome);
    Ok(Json(outcome?))
}

async fn get_day(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_path_date(&date_str)?;
    let record = state.tracker().day(date)?;
    Ok(Json(record))
}

async fn add_entry(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
    Json(body): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<LoggedEntry>), ApiError> {
    let date = parse_path_date(&date_str)?;
    let tracker = state.tracker();
    let entry = match (body.candidate_index, body.candidate) {
        (Some(index), None) => tracker.add_candidate(date, index)?,
        (None, Some(candidate)) => tracker.add(date, candidate)?,
        _ => {
            return Err(ApiError::BadRequest(
                "Provide exactly one of candidateIndex or candidate".to_string(),
            ));
        }
    };
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn remove_entry(
    State(state): State<AppState>,
    Path((date_str, index)): Path<(String, i64)>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_path_date(&date_str)?;
    let index = usize::try_from(index)
        .map_err(|_| ApiError::BadRequest(format!("Invalid entry index {index}")))?;
    let record = state.tracker().remove(date, index)?;
    Ok(Json(record))
}

async fn clear_day(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailyRecord>, ApiError> {
    let date = parse_path_date(&date_str)?;
    let record = state.tracker().clear(date)?;
    Ok(Json(record))
}

async fn get_goals(State(state): State<AppState>) -> Result<Json<GoalSettings>, ApiError> {
    Ok(Json(state.tracker().goals()?))
}

async fn put_goals(
    State(state): State<AppState>,
    Json(goals): Json<GoalSettings>,
) -> Result<Json<GoalSettings>, ApiError> {
    Ok(Json(state.tracker().set_goals(goals)?))
}

fn build_dashboard(state: &AppState, date: NaiveDate) -> Result<Dashboard, ApiError> {
    let tracker = state.tracker();
    let goals = tracker.goals()?;
    Ok(report::dashboard(tracker.journal(), date, &goals)?)
}

async fn dashboard_today(State(state): State<AppState>) -> Result<Json<Dashboard>, ApiError> {
    let today = Local::now().date_naive();
    Ok(Json(build_dashboard(&state, today)?))
}

async fn dashboard_for_date(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<Dashboard>, ApiError> {
    let date = parse_path_date(&date_str)?;
    Ok(Json(build_dashboard(&state, date)?))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(search_foods))
        .route("/api/log/{date}", get(get_day).delete(clear_day))
        .route("/api/log/{date}/entries", post(add_entry))
        .route("/api/log/{date}/entries/{index}", delete(remove_entry))
        .route("/api/goals", get(get_goals).put(put_goals))
        .route("/api/report/dashboard", get(dashboard_today))
        .route("/api/report/dashboard/{date}", get(dashboard_for_date))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

fn mask_key(key: &str) -> String {
    if key.len() < 12 || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

// --- Server startup ---

pub async fn start_server(
    tracker: Tracker<Database>,
    usda: UsdaClient,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        tracker: Arc::new(Mutex::new(tracker)),
        usda: Arc::new(usda),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            mask_key(key)
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
        if bind != "127.0.0.1" && bind != "localhost" {
            eprintln!(
                "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
            );
        }
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    tracing::info!(bind, port, "server listening");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
