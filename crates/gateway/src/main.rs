//! PaperLens API Gateway
//!
//! The HTTP entry point for the research paper service.
//! Handles:
//! - Sessions, document uploads and literature reviews
//! - Per-document Q&A and cross-document comparisons
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use paperlens_common::{
    config::{AppConfig, ObservabilityConfig},
    errors::AppError,
    llm::{self, CompletionClient},
    metrics,
    session::SessionStore,
};
use paperlens_context::{Analyzer, Comparator, QaSession};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitState};

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    pub client: Arc<dyn CompletionClient>,
    pub analyzer: Arc<Analyzer>,
    pub qa: Arc<QaSession>,
    pub comparator: Arc<Comparator>,
}

impl AppState {
    /// Wire the components around one completion client
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let client = llm::create_client(&config.llm)?;
        Ok(Self::with_client(config, client))
    }

    fn with_client(config: AppConfig, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::from_config(&config.session)),
            analyzer: Arc::new(Analyzer::new(client.clone(), config.analysis.clone())),
            qa: Arc::new(QaSession::new(client.clone(), config.conversation.clone())),
            comparator: Arc::new(Comparator::new(client.clone(), config.comparison.clone())),
            client,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.observability);

    info!("Starting PaperLens API Gateway v{}", paperlens_common::VERSION);

    config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        e
    })?;

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        install_metrics_exporter(config.observability.metrics_port)?;
    }
    metrics::register_metrics();

    let state = AppState::new(config)?;
    info!(
        provider = %state.client.provider(),
        model = state.client.model_name(),
        strategy = ?state.config.analysis.strategy,
        "Completion capability ready"
    );

    let sweeper = state
        .sessions
        .clone()
        .spawn_sweeper(Duration::from_secs(state.config.session.sweep_interval_secs));

    // Build the router
    let app = create_router(state.clone())?;

    // Start the server
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Structured logging; `RUST_LOG` wins over the configured filter
fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics on their own port
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("ingestion_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("completion_duration_seconds".to_string()),
            metrics::COMPLETION_BUCKETS,
        )?
        .install()?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router, AppError> {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let body_limit = state.config.ingestion.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    // API routes
    let mut api_routes = Router::new()
        // Session endpoints
        .route("/sessions", post(handlers::sessions::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
        // Document endpoints
        .route(
            "/sessions/{id}/documents",
            post(handlers::documents::upload_document),
        )
        .route(
            "/sessions/{id}/documents/{doc}",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        )
        .route(
            "/sessions/{id}/documents/{doc}/analysis",
            post(handlers::documents::analyze_document),
        )
        .route(
            "/sessions/{id}/documents/{doc}/analysis.md",
            get(handlers::documents::download_report),
        )
        // Q&A endpoints
        .route(
            "/sessions/{id}/documents/{doc}/questions",
            post(handlers::conversation::ask_question),
        )
        .route(
            "/sessions/{id}/documents/{doc}/conversation",
            get(handlers::conversation::get_conversation)
                .delete(handlers::conversation::clear_conversation),
        )
        // Comparison endpoints
        .route(
            "/sessions/{id}/comparisons",
            post(handlers::comparisons::create_comparison)
                .get(handlers::comparisons::list_comparisons),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    if state.config.rate_limit.enabled {
        let limiter = RateLimitState::new(&state.config.rate_limit)?;
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    let request_timeout = state.config.request_timeout();

    // Compose the app
    Ok(Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn_with_state(
            request_timeout,
            middleware::timeout::enforce_timeout,
        ))
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
