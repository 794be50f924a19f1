mod api;
mod auth;
mod config;
mod db;
mod images;
mod importing;
mod models;
mod recipes;
mod schema;
mod state;
mod storage;
mod telemetry;
mod types;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware;
use axum::Router;
use cookbook_core::llm::create_provider;
use cookbook_core::{LlmError, ReqwestClient};
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, ConfigError};
use crate::db::DbError;
use crate::importing::ImportError;
use crate::state::AppState;
use crate::storage::{LocalBlobStore, UrlSigner};

/// Health checks are polled constantly; keep them out of the info log.
const QUIET_PATH: &str = "/api/health";

#[derive(Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Failed to recover interrupted imports: {0}")]
    Recovery(#[from] ImportError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to configure AI provider: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid signing key: {0}")]
    SigningKey(hmac::digest::InvalidLength),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

fn build_state(config: Config) -> Result<AppState, StartupError> {
    let pool = Arc::new(db::create_pool(&config.database_url)?);

    let recovered = importing::fail_interrupted_imports(&pool)?;
    if recovered > 0 {
        tracing::warn!(
            count = recovered,
            "Marked imports interrupted by a restart as failed"
        );
    }

    let http = ReqwestClient::builder()
        .allowlist(config.allowed_hosts.clone())
        .build()?;
    let llm = create_provider(&config.ai_provider, config.openrouter.clone())?;
    let storage = LocalBlobStore::new(config.storage_dir.clone());
    let signer =
        UrlSigner::new(&config.signing_key, &config.public_url).map_err(StartupError::SigningKey)?;

    tracing::info!(
        provider = %config.ai_provider,
        model = %config.openrouter.model,
        storage_dir = %config.storage_dir.display(),
        restricted_hosts = config.allowed_hosts.is_restricted(),
        "Import pipeline configured"
    );

    Ok(AppState {
        pool,
        config: Arc::new(config),
        http: Arc::new(http),
        llm,
        storage: Arc::new(storage),
        signer: Arc::new(signer),
    })
}

fn build_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_router = api::public::router().merge(api::storage::router());

    // Protected routes (auth required)
    let protected_router = Router::new()
        .nest(
            "/api/recipes",
            api::recipes::router()
                .merge(api::imports::router())
                .merge(api::images::router()),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    Router::new()
        .merge(public_router)
        .merge(protected_router)
        .merge(swagger_ui)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    if matched_path == QUIET_PATH {
                        tracing::trace_span!("http_request")
                    } else {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            path = %matched_path,
                        )
                    }
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        // Skip logging for trace-level spans
                        if span.metadata().map(|m| m.level()) == Some(&tracing::Level::TRACE) {
                            return;
                        }
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr;
    let public_url = config.public_url.clone();

    let state = build_state(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);
    tracing::info!("Swagger UI available at {}/swagger-ui/", public_url);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        match api::openapi().to_pretty_json() {
            Ok(spec) => println!("{}", spec),
            Err(e) => {
                eprintln!("Failed to serialize OpenAPI spec: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let telemetry = telemetry::init();

    let result = run().await;
    if let Err(e) = &result {
        tracing::error!("{}", e);
    }

    telemetry.shutdown();

    if result.is_err() {
        std::process::exit(1);
    }
}
