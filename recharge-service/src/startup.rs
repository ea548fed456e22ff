//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers;
use crate::services::{build_gateway, build_store, PlanCatalog, RechargeLedger};
use axum::middleware::from_fn;
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use recharge_core::error::AppError;
use recharge_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: PlanCatalog,
    pub ledger: Arc<RechargeLedger>,
}

impl AppState {
    /// Wires the catalog, ledger store and payment gateway named by `config`.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let store = build_store(&config.storage).await.map_err(|e| {
            tracing::error!("Failed to open ledger store: {}", e);
            AppError::StorageError(e.into())
        })?;
        let gateway = build_gateway(&config.payment);

        tracing::info!(
            storage = ?config.storage.backend,
            gateway = gateway.name(),
            catalog = config.catalog.base_url.as_deref().unwrap_or("built-in"),
            "Recharge components initialized"
        );

        Ok(Self {
            config: config.clone(),
            catalog: PlanCatalog::new(&config.catalog),
            ledger: Arc::new(RechargeLedger::new(store, gateway)),
        })
    }
}

/// Builds the HTTP router with request id, metrics, tracing and CORS layers.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/operators", get(handlers::plans::list_operators))
        .route("/plans", get(handlers::plans::list_plans))
        .route("/recharges", post(handlers::recharges::submit_recharge))
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions),
        )
        .route(
            "/transactions/summary",
            get(handlers::transactions::transaction_summary),
        )
        .route(
            "/transactions/:id",
            get(handlers::transactions::get_transaction),
        )
        .route_layer(from_fn(metrics_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(
                    |request: &axum::http::Request<axum::body::Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or("-");

                        tracing::info_span!(
                            "http_request",
                            request_id = %request_id,
                            method = %request.method(),
                            uri = %request.uri(),
                            version = ?request.version(),
                        )
                    },
                ))
                .layer(cors),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let state = AppState::from_config(&config).await?;
        Self::build_with_state(config, state).await
    }

    /// Build the application around pre-wired components.
    pub async fn build_with_state(config: Config, state: AppState) -> Result<Self, AppError> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "invalid server address {}:{}: {}",
                    config.server.host,
                    config.server.port,
                    e
                ))
            })?;

        // Port 0 binds a random port for tests.
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Recharge service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, router(self.state)).await
    }
}
