//! HTTP relay between the screening client and the hosted inference service.
//!
//! Exposes `/api/health`, `/api/predict-json` and `/api/predict-image`. Image
//! requests arrive as JSON data URLs and are re-posted upstream as multipart
//! uploads, with upstream failures translated into a uniform error envelope.

pub mod error;
pub mod handlers;
pub mod upstream;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::RelayConfig;
use crate::error::ScreeningError;

pub use error::RelayError;
pub use upstream::{InferenceUpstream, UpstreamEndpoint};

/// Room for JSON framing around the base64 payload.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

const ALLOWED_METHODS: &str = "GET,POST,OPTIONS";
const ALLOWED_HEADER_LIST: &str = "x-csrf-token,x-requested-with,accept,accept-version,\
content-length,content-md5,content-type,date,x-api-version";

/// Shared handler state.
#[derive(Clone)]
pub struct RelayState {
    pub upstream: Arc<InferenceUpstream>,
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Result<Self, ScreeningError> {
        let upstream = InferenceUpstream::new(&config)?;
        Ok(Self {
            upstream: Arc::new(upstream),
            config: Arc::new(config),
        })
    }
}

/// Build the relay router with CORS, tracing and body-size layers applied.
pub fn router(state: RelayState) -> Router {
    // base64 inflates by 4/3
    let body_limit = state.config.max_image_bytes / 3 * 4 + BODY_OVERHEAD_BYTES;

    let api = Router::new()
        .route(
            "/health",
            get(handlers::health)
                .options(handlers::preflight)
                .fallback(handlers::get_only),
        )
        .route(
            "/predict-json",
            post(handlers::predict_json)
                .options(handlers::preflight)
                .fallback(handlers::post_only),
        )
        .route(
            "/predict-image",
            post(handlers::predict_image)
                .options(handlers::preflight)
                .fallback(handlers::post_only),
        );

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        // CorsLayer only advertises methods and headers on preflights.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADER_LIST),
        ))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::list(
            ALLOWED_HEADER_LIST.split(',').map(HeaderName::from_static),
        ))
}

/// Bind and run the relay until Ctrl-C.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.bind_addr))?;

    let state = RelayState::new(config)?;
    info!(
        "Relay forwarding to {} (token configured: {})",
        state.upstream.base_url(),
        state.upstream.has_token()
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting relay on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
