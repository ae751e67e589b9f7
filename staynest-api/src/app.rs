/// Application state and router builder
///
/// This module defines the shared application state and provides a
/// function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use staynest_api::{app::AppState, config::Config};
/// use staynest_shared::store::MemoryStore;
///
/// let state = AppState::new(Arc::new(MemoryStore::new()), Config::default());
/// let app = staynest_api::app::build_router(state);
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use staynest_shared::store::RecordStore;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Record store (Postgres in production, in-memory in tests)
    pub store: Arc<dyn RecordStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn RecordStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/                             # API v1 (versioned)
///     ├── POST   /identities           # Sign up
///     ├── DELETE /identities/:id       # Delete account
///     ├── GET    /profile/:email       # Profile with reconciled status
///     ├── POST   /memberships          # Purchase a membership tier
///     ├── GET    /memberships/status/:email
///     ├── GET    /payments             # Resolved payment views
///     └── POST   /admin/sweep          # On-demand orphan sweep
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let v1_routes = Router::new()
        .route("/identities", post(routes::identities::create_identity))
        .route("/identities/:id", delete(routes::identities::delete_identity))
        .route("/profile/:email", get(routes::profile::get_profile))
        .route("/memberships", post(routes::memberships::purchase_membership))
        .route(
            "/memberships/status/:email",
            get(routes::memberships::membership_status),
        )
        .route("/payments", get(routes::payments::list_payments))
        .route("/admin/sweep", post(routes::admin::run_sweep));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
