use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Extension, Form, Json, Router,
    extract::{ConnectInfo, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::checkin::{self, MAX_COMMENT_LEN, MAX_QR_LEN, Status};
use crate::columns::{self, ColumnMapping, FixedLayout};
use crate::config::Config;
use crate::error::{GateError, Result};
use crate::login::{self, Session, SessionId};
use crate::ratelimit::{FETCH_LIMIT, RateLimiter, UPDATE_LIMIT};
use crate::sheet::{GoogleSheet, SheetStore};
use crate::student::StudentRecord;

/// Shared application state: the backing store, the column configuration and
/// the rate limiter. Sessions live in their own global map (see `login`).
pub struct AppState {
    pub store: Arc<dyn SheetStore>,
    pub fixed_layout: Option<FixedLayout>,
    pub limiter: RateLimiter,
}

#[derive(Deserialize)]
struct FetchRequest {
    #[serde(default)]
    qr_string: String,
}

#[derive(Serialize)]
struct UpdateResponse {
    success: bool,
    message: String,
}

#[derive(Deserialize)]
struct UpdateRequest {
    #[serde(default)]
    row_index: Option<i64>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    comment: String,
}

#[derive(Deserialize)]
struct ResultForm {
    #[serde(default)]
    student_data: String,
    #[serde(default)]
    row_index: String,
}

/// Start the gate server
///
/// Builds the store from configuration, runs the non-fatal startup checks,
/// and serves until shutdown. A sheet that cannot be reached at startup is
/// logged and ignored; requests will then fail at the backing-store call.
pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn SheetStore> = Arc::new(GoogleSheet::from_config(&config));

    match store.read_all_rows().await {
        Ok(rows) => {
            info!("Sheet connection established ({} data rows)", rows.len());
            if config.fixed_layout.is_none() {
                if let Err(e) = columns::ensure_columns(store.as_ref()).await {
                    error!("Column maintenance failed: {}", e);
                }
            }
        }
        Err(e) => error!("Sheet connection failed at startup: {}", e),
    }

    let state = Arc::new(AppState {
        store,
        fixed_layout: config.fixed_layout.clone(),
        limiter: RateLimiter::new(),
    });

    let protected = Router::new()
        .route("/scan", get(serve_scan_page))
        .route("/result", get(redirect_to_scan).post(serve_result_page))
        .route("/fetch", post(fetch_student))
        .route("/update", post(update_student))
        .route_layer(middleware::from_fn(login::require_auth));

    let app = Router::new()
        .route("/", get(|| async { Redirect::to("/login") }))
        .route("/login", get(login::serve_login_page).post(login::handle_login))
        .route("/logout", get(login::handle_logout))
        .route("/health", get(health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn serve_scan_page() -> Html<&'static str> {
    Html(include_str!("./static/scan.html"))
}

async fn redirect_to_scan() -> Redirect {
    Redirect::to("/scan")
}

/// Render the record display page from the posted payload. The page script
/// reads the posted fields back out of session storage; a payload that does
/// not parse sends the operator back to the scanner.
async fn serve_result_page(Form(form): Form<ResultForm>) -> Response {
    if form.row_index.trim().is_empty()
        || serde_json::from_str::<serde_json::Value>(&form.student_data).is_err()
    {
        return Redirect::to("/scan").into_response();
    }

    Html(include_str!("./static/result.html")).into_response()
}

/// Resolve the column mapping for this request: fixed layout when configured,
/// otherwise a fresh read of the header row.
async fn resolve_mapping(state: &AppState) -> Result<ColumnMapping> {
    if let Some(layout) = &state.fixed_layout {
        return Ok(ColumnMapping::resolve(None, Some(layout)));
    }

    let headers = state.store.read_header_row().await?;
    Ok(ColumnMapping::resolve(Some(&headers), None))
}

/// `POST /fetch` — look up a scanned code
///
/// 200 with the row index and display projection on a fresh match, 404 when
/// the code is absent, 409 with consumer details when it was already used.
async fn fetch_student(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(session): Extension<Session>,
    Json(payload): Json<FetchRequest>,
) -> Result<Response> {
    if !state
        .limiter
        .allow(&addr.ip().to_string(), "fetch", FETCH_LIMIT)
    {
        return Err(GateError::RateLimited);
    }

    let qr_string = payload.qr_string.trim();
    if qr_string.is_empty() {
        return Err(GateError::Validation("QR string is required".to_string()));
    }
    if qr_string.len() > MAX_QR_LEN {
        return Err(GateError::Validation("QR string too long".to_string()));
    }

    info!(
        "Coordinator {} fetching QR '{}'",
        session.coordinator_name, qr_string
    );

    let mapping = resolve_mapping(&state).await?;
    let rows = state.store.read_all_rows().await?;

    let (record, row_index) =
        checkin::locate(&rows, &mapping, qr_string).ok_or(GateError::NotFound)?;

    if record.is_used() {
        return Err(already_used_error(&record));
    }

    Ok(Json(json!({
        "row_index": row_index,
        "student_data": record.display(),
    }))
    .into_response())
}

/// 409 payload for a consumed code, naming who checked it in and when;
/// missing sheet values fall back to placeholders.
fn already_used_error(record: &StudentRecord) -> GateError {
    let used_by = if record.coordinator.is_empty() {
        "Unknown".to_string()
    } else {
        record.coordinator.clone()
    };
    let used_at = if record.last_checked_time.is_empty() {
        "Unknown time".to_string()
    } else {
        record.last_checked_time.clone()
    };
    GateError::AlreadyUsed { used_by, used_at }
}

/// Validated `/update` parameters.
#[derive(Debug, PartialEq)]
struct UpdateParams {
    row_index: u32,
    status: Status,
}

/// Validate an `/update` payload before anything touches the sheet
///
/// The row index must fit a physical sheet row: present, at least 1, and
/// within u32 range (a wider value would otherwise truncate onto some
/// unrelated row). Status must be one of the four known verdicts and the
/// comment must fit the length cap.
fn validate_update(payload: &UpdateRequest) -> Result<UpdateParams> {
    let row_index = match payload.row_index {
        None => return Err(GateError::Validation("Row index is required".to_string())),
        Some(n) if n >= 1 && n <= u32::MAX as i64 => n as u32,
        Some(_) => return Err(GateError::Validation("Invalid row index".to_string())),
    };

    let status = Status::parse(&payload.status)
        .ok_or_else(|| GateError::Validation("Invalid status".to_string()))?;

    if payload.comment.chars().count() > MAX_COMMENT_LEN {
        return Err(GateError::Validation(format!(
            "Comment exceeds {} characters",
            MAX_COMMENT_LEN
        )));
    }

    Ok(UpdateParams { row_index, status })
}

/// `POST /update` — record the coordinator's verdict
///
/// Validation failures never reach the updater; a store failure comes back
/// as a 500 without detail. On success the session is cleared so the next
/// scan requires a fresh login.
async fn update_student(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(session): Extension<Session>,
    Extension(session_id): Extension<SessionId>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Response> {
    if !state
        .limiter
        .allow(&addr.ip().to_string(), "update", UPDATE_LIMIT)
    {
        return Err(GateError::RateLimited);
    }

    let UpdateParams { row_index, status } = validate_update(&payload)?;

    info!(
        "Coordinator {} updating row {} with status {}",
        session.coordinator_name,
        row_index,
        status.as_str()
    );

    let mapping = resolve_mapping(&state).await?;

    let updated = match checkin::update(
        state.store.as_ref(),
        &mapping,
        row_index,
        status,
        &payload.comment,
        &session.coordinator_name,
    )
    .await
    {
        Ok(()) => true,
        Err(e) => {
            error!("Update of row {} failed: {}", row_index, e);
            false
        }
    };

    if !updated {
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to update record" })),
        )
            .into_response());
    }

    // One scan per authentication: drop the session that just checked in.
    login::clear_session(&session_id.0);

    Ok(Json(UpdateResponse {
        success: true,
        message: "Status updated successfully".to_string(),
    })
    .into_response())
}

/// `GET /health` — liveness probe with a connectivity report
///
/// Always 200; a broken sheet connection is reported in the body rather
/// than by failing the probe.
async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let (connected, row_count) = match state.store.read_all_rows().await {
        Ok(rows) => (true, rows.len()),
        Err(e) => {
            warn!("Health check could not reach the sheet: {}", e);
            (false, 0)
        }
    };

    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "FRESH CHECKS QR Gate",
        "sheet_connected": connected,
        "row_count": row_count,
    }))
}
