//! # HTTP API
//!
//! axum server for the medication tracker.
//!
//! ## Routes
//!
//! | Route | Methods |
//! |-------|---------|
//! | `/health` | GET (never needs the API key) |
//! | `/` | GET, links to the collections |
//! | `/api/medications` | GET details, POST a form submission |
//! | `/medications/`, `/medications/{id}` | GET POST / GET PUT PATCH DELETE |
//! | `/colors/`, `/colors/{id}` | GET POST / GET PUT DELETE |
//! | `/reminders/`, `/reminders/{id}` | GET POST / GET PUT DELETE |
//! | `/reminders/by-medication/{id}` | GET |
//! | `/reminders/due` | GET, optional `?at=` local timestamp |
//!
//! Collections answer with and without the trailing slash.
//!
//! ## Layers (outermost first)
//!
//! CORS (permissive) → request tracing → rate limit → API key (all routes
//! but `/health`). JSON bodies over 64 KiB are refused with 413.

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;
pub use handlers::MSG_NO_REMINDERS;

use crate::config::{ServerConfig, SharedStore};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// STATE
// =============================================================================

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<SharedStore>>,
    /// None when the rate limit is 0 (disabled).
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    /// Build the state from an opened store and the server settings.
    pub fn new(store: SharedStore, config: &ServerConfig) -> Self {
        let limiter = NonZeroU32::new(config.rate_limit)
            .map(|per_second| Arc::new(RateLimiter::direct(Quota::per_second(per_second))));
        Self {
            store: Arc::new(RwLock::new(store)),
            limiter,
            api_key: config.api_key().map(Arc::from),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("rate_limited", &self.limiter.is_some())
            .field("api_key", &self.api_key.is_some())
            .finish()
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let medications = get(handlers::list_medications).post(handlers::create_medication);
    let colors = get(handlers::list_colors).post(handlers::create_color);
    let reminders = get(handlers::list_reminders).post(handlers::create_reminder);
    let submissions =
        get(handlers::list_medication_details).post(handlers::submit_medication);

    let protected = Router::new()
        .route("/", get(handlers::api_root))
        .route("/api/medications", submissions.clone())
        .route("/api/medications/", submissions)
        .route("/medications", medications.clone())
        .route("/medications/", medications)
        .route(
            "/medications/{id}",
            get(handlers::get_medication)
                .put(handlers::update_medication)
                .patch(handlers::patch_medication)
                .delete(handlers::delete_medication),
        )
        .route("/colors", colors.clone())
        .route("/colors/", colors)
        .route(
            "/colors/{id}",
            get(handlers::get_color)
                .put(handlers::update_color)
                .delete(handlers::delete_color),
        )
        .route("/reminders", reminders.clone())
        .route("/reminders/", reminders)
        .route("/reminders/due", get(handlers::due_reminders))
        .route(
            "/reminders/by-medication/{id}",
            get(handlers::reminders_by_medication),
        )
        .route(
            "/reminders/{id}",
            get(handlers::get_reminder)
                .put(handlers::update_reminder)
                .delete(handlers::delete_reminder),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// SERVER
// =============================================================================

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "MedPort server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl-C"),
    }
}
