//! Alert Relay Server
//!
//! Receives alert webhooks, runs them through the debouncer and relays the
//! survivors to chat.

use alerting::Debouncer;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use notify::Notifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

mod error;
pub mod routes;
pub mod settings;
pub mod telemetry;

pub use error::ApiError;
pub use settings::AppConfig;

/// Application state shared across handlers
pub struct AppState {
    pub debouncer: Debouncer,
    pub notifier: Arc<Notifier>,
    /// Prometheus exporter, when the global recorder could be installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(debouncer: Debouncer, notifier: Arc<Notifier>, metrics: Option<PrometheusHandle>) -> Self {
        Self {
            debouncer,
            notifier,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub pending_alerts: usize,
    pub max_pending_alerts: usize,
    pub debounce_window_seconds: u64,
    pub notifier_channels: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/alerts", post(routes::alerts::schedule_alert))
        .route("/api/v1/alerts/pending", get(routes::alerts::get_pending))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        pending_alerts: state.debouncer.pending_count().await,
        max_pending_alerts: state.debouncer.capacity().await,
        debounce_window_seconds: state.debouncer.window().as_secs(),
        notifier_channels: state.notifier.channel_count(),
    })
}

/// Prometheus scrape handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Resolve when the process is asked to stop
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Run the server
pub async fn run_server(config: AppConfig) -> Result<(), ApiError> {
    let metrics = match telemetry::install_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let (debouncer, fired) = Debouncer::new(&config.debounce)?;
    let notifier = Arc::new(Notifier::from_config(&config.telegram, &config.links));
    let dispatcher = tokio::spawn(Arc::clone(&notifier).run(fired));

    let state = Arc::new(AppState::new(debouncer.clone(), notifier, metrics));
    let app = create_router(state);

    info!("Starting alert relay on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let dropped = debouncer.cancel_all().await;
    if dropped > 0 {
        warn!(dropped, "Pending alerts discarded on shutdown");
    }
    drop(debouncer);

    if let Err(e) = dispatcher.await {
        error!("Alert dispatcher ended abnormally: {}", e);
    }

    info!("Alert relay stopped");
    Ok(())
}
