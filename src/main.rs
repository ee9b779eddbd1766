//! Wasteboard - a municipal waste-management dashboard service.
//!
//! # API Endpoints
//!
//! - `GET /` - Public dashboard (read-only)
//! - `POST /login`, `POST /logout` - Staff session establishment/teardown
//! - `GET /government-dashboard` - Staff dashboard; refreshes bin fill levels
//! - `POST /dispatch` - Empty every bin at or above 70% fill
//! - `POST /complaint` - Citizen complaint submission
//! - `POST /update-status/:id/:status_type` - Staff complaint transition
//! - `GET /complaints/recent` - Last 10 complaints
//! - `GET /alerts` - Staff alert polling
//! - `POST /bins`, `POST /bins/:id/overflow-risk` - Bin registration/flagging
//! - `GET /health` - Health check

use std::env;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wasteboard::api::{AppState, router};
use wasteboard::auth::StaffCredentials;
use wasteboard::storage::Storage;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:wasteboard.db?mode=rwc";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("wasteboard=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("WASTEBOARD_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_url =
        env::var("WASTEBOARD_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    let username = env::var("WASTEBOARD_STAFF_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = env::var("WASTEBOARD_STAFF_PASSWORD").unwrap_or_else(|_| {
        warn!("WASTEBOARD_STAFF_PASSWORD not set; using the default password");
        "changeme".to_string()
    });

    info!(port, db_url = %db_url, "Starting Wasteboard server");

    // Initialize storage
    let storage = Storage::new(&db_url).await?;
    info!("Database initialized");

    // Create application state
    let state = AppState {
        storage,
        credentials: StaffCredentials::new(username, password),
    };

    // Build router
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Wasteboard is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
