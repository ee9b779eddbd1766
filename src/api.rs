//! HTTP API handlers and router.
//!
//! All endpoints speak JSON. Failures map to a uniform
//! `{"success": false, "error": "..."}` body via [`ApiError`]; internal
//! errors are logged with their detail and surfaced as an opaque 500.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::auth::{self, StaffCredentials};
use crate::dashboard;
use crate::model::{
    AlertsResponse, Complaint, ComplaintType, CreateBinRequest, CustomProgressRequest, DashboardResponse,
    DispatchResponse, GarbageBin, LoginRequest, LoginResponse, NewComplaint, OverflowRiskRequest,
    RecentComplaintsResponse, StatusAction, SubmitComplaintRequest, SubmitComplaintResponse,
};
use crate::simulation;
use crate::storage::Storage;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub credentials: StaffCredentials,
}

/// API-level error, rendered as a JSON body with the matching status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid credentials. Access denied.")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                error!(error = %e, "Internal error handling request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            // Internal detail goes to the log, not the client
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

async fn require_staff(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if auth::is_authenticated(&state.storage, headers).await? {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_public_dashboard))
        .route("/login", post(post_login))
        .route("/logout", post(post_logout))
        .route("/government-dashboard", get(get_staff_dashboard))
        .route("/dispatch", post(post_dispatch))
        .route("/complaint", post(post_complaint))
        .route("/update-status/:complaint_id/:status_type", post(post_update_status))
        .route("/complaints/recent", get(get_recent_complaints))
        .route("/alerts", get(get_alerts))
        .route("/bins", post(post_create_bin))
        .route("/bins/:bin_id/overflow-risk", post(post_overflow_risk))
        .route("/health", get(health_check))
        .with_state(state)
}

/// GET / - Public dashboard.
///
/// Same aggregates as the staff view, but fill levels are derived for the
/// response only; nothing is written.
#[instrument(skip_all)]
pub async fn get_public_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let view = dashboard::public_view(&state.storage, Utc::now()).await?;
    Ok(Json(view))
}

/// POST /login - Establish a staff session.
///
/// Wrong credentials are a 401 with no state change.
#[instrument(skip_all)]
pub async fn post_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = auth::login(
        &state.storage,
        &state.credentials,
        &request.username,
        &request.password,
        Utc::now(),
    )
    .await?;

    match token {
        Some(token) => {
            info!(username = %request.username, "Staff login");
            Ok(Json(LoginResponse { token }))
        }
        None => {
            warn!(username = %request.username, "Failed login attempt");
            Err(ApiError::InvalidCredentials)
        }
    }
}

/// POST /logout - Tear down the staff session named by the bearer token.
#[instrument(skip_all)]
pub async fn post_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = auth::bearer_token(&headers).ok_or(ApiError::Unauthorized)?;

    if state.storage.delete_session(token).await? {
        info!("Staff logout");
        Ok(Json(json!({ "success": true })))
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// GET /government-dashboard - Staff dashboard.
///
/// Triggers the fill-level refresh as a side effect of the read; any bins
/// whose refresh failed to persist are listed in the response.
#[instrument(skip_all)]
pub async fn get_staff_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, ApiError> {
    require_staff(&state, &headers).await?;

    let view = dashboard::staff_view(&state.storage, Utc::now()).await?;
    if !view.refresh_failures.is_empty() {
        warn!(
            failed = view.refresh_failures.len(),
            "Some bins failed to refresh"
        );
    }
    info!(
        bins = view.bin_counts.total,
        critical = view.bin_counts.critical,
        complaints = view.complaints.len(),
        "Staff dashboard viewed"
    );
    Ok(Json(view))
}

/// POST /dispatch - Empty every bin at or above the dispatch threshold.
#[instrument(skip_all)]
pub async fn post_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DispatchResponse>, ApiError> {
    require_staff(&state, &headers).await?;

    let bins_reset = simulation::dispatch_collection(&state.storage, Utc::now()).await?;
    info!(bins_reset, "Collection dispatched");
    Ok(Json(DispatchResponse { bins_reset }))
}

/// POST /complaint - Citizen complaint submission.
///
/// Unauthenticated. Unknown complaint types and empty required fields are a
/// 400 with a JSON error body.
#[instrument(skip_all)]
pub async fn post_complaint(
    State(state): State<AppState>,
    Json(request): Json<SubmitComplaintRequest>,
) -> Result<Json<SubmitComplaintResponse>, ApiError> {
    let complaint_type: ComplaintType = request.complaint_type.parse().map_err(|_| {
        ApiError::BadRequest(format!(
            "unknown complaint type '{}' (expected one of: overflow, missed_collection, \
             illegal_dumping, damaged_bin, other)",
            request.complaint_type
        ))
    })?;

    if request.location.trim().is_empty() {
        return Err(ApiError::BadRequest("location must not be empty".to_string()));
    }
    if request.description.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "description must not be empty".to_string(),
        ));
    }

    let new = NewComplaint {
        complaint_type,
        location: request.location,
        description: request.description,
        reported_by: request
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string()),
        contact_info: request.contact.unwrap_or_default(),
    };

    let complaint = state.storage.insert_complaint(&new, Utc::now()).await?;
    info!(
        complaint_id = complaint.id,
        complaint_type = complaint.complaint_type.as_str(),
        location = %complaint.location,
        "Complaint submitted"
    );

    Ok(Json(SubmitComplaintResponse {
        success: true,
        complaint_id: complaint.id,
        message: "Complaint submitted successfully",
    }))
}

/// POST /update-status/:complaint_id/:status_type - Staff complaint transition.
///
/// `status_type` is `progress` (start working, 50%), `resolved` (complete,
/// 100%), or `custom` (progress from the body, status derived).
#[instrument(skip_all, fields(complaint_id, status_type))]
pub async fn post_update_status(
    State(state): State<AppState>,
    Path((complaint_id, status_type)): Path<(i64, String)>,
    headers: HeaderMap,
    body: Option<Json<CustomProgressRequest>>,
) -> Result<Json<Complaint>, ApiError> {
    require_staff(&state, &headers).await?;

    let action = match status_type.as_str() {
        "progress" => StatusAction::Start,
        "resolved" => StatusAction::Complete,
        "custom" => {
            let Json(request) = body.ok_or_else(|| {
                ApiError::BadRequest("custom status update requires a progress value".to_string())
            })?;
            if !(0..=100).contains(&request.progress) {
                return Err(ApiError::BadRequest(format!(
                    "progress must be between 0 and 100, got {}",
                    request.progress
                )));
            }
            StatusAction::Custom(request.progress)
        }
        other => {
            return Err(ApiError::BadRequest(format!(
                "unknown status action '{other}' (expected progress, resolved, or custom)"
            )));
        }
    };

    let mut complaint = state
        .storage
        .get_complaint(complaint_id)
        .await?
        .ok_or(ApiError::NotFound("complaint"))?;

    let (status, progress) = action.apply();
    state
        .storage
        .update_complaint_status(complaint_id, status, progress)
        .await?;

    complaint.status = status;
    complaint.progress_percentage = progress;
    complaint.gov_notified = true;

    info!(
        complaint_id,
        status = status.as_str(),
        progress,
        "Complaint status updated"
    );
    Ok(Json(complaint))
}

/// GET /complaints/recent - Last 10 complaints for the public ticker.
#[instrument(skip_all)]
pub async fn get_recent_complaints(
    State(state): State<AppState>,
) -> Result<Json<RecentComplaintsResponse>, ApiError> {
    let listing = dashboard::recent_complaints(&state.storage).await?;
    Ok(Json(listing))
}

/// GET /alerts - Staff alert polling.
///
/// Reading an alert marks it delivered, so an unchanged system polls to an
/// empty list.
#[instrument(skip_all)]
pub async fn get_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AlertsResponse>, ApiError> {
    require_staff(&state, &headers).await?;

    let response = dashboard::poll_alerts(&state.storage, Utc::now()).await?;
    info!(alert_count = response.alerts.len(), "Alerts polled");
    Ok(Json(response))
}

/// POST /bins - Register a new garbage bin, empty as of now.
#[instrument(skip_all)]
pub async fn post_create_bin(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateBinRequest>,
) -> Result<Json<GarbageBin>, ApiError> {
    require_staff(&state, &headers).await?;

    if request.location.trim().is_empty() {
        return Err(ApiError::BadRequest("location must not be empty".to_string()));
    }

    let bin = state
        .storage
        .insert_bin(&request.location, Utc::now())
        .await?;
    info!(bin_id = bin.id, location = %bin.location, "Bin registered");
    Ok(Json(bin))
}

/// POST /bins/:bin_id/overflow-risk - Set the externally-owned risk flag.
#[instrument(skip_all, fields(bin_id))]
pub async fn post_overflow_risk(
    State(state): State<AppState>,
    Path(bin_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<OverflowRiskRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_staff(&state, &headers).await?;

    if !state
        .storage
        .set_overflow_risk(bin_id, request.overflow_risk)
        .await?
    {
        return Err(ApiError::NotFound("bin"));
    }

    info!(bin_id, overflow_risk = request.overflow_risk, "Overflow risk updated");
    Ok(Json(json!({ "success": true })))
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}
