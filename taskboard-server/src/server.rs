//! Shared application state, router assembly and server startup.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use taskboard::{Board, EntityStore};
use tower_http::trace::TraceLayer;

use crate::routes;

/// Default maximum accepted request body in bytes (64 KB).
const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// State shared by every request handler.
pub struct AppState<S> {
    /// Task and user operations over the shared store.
    pub board: Board<S>,
    /// Maximum accepted request body in bytes.
    max_body_size: usize,
}

impl<S: EntityStore> AppState<S> {
    /// Creates state with the default body size limit.
    #[must_use]
    pub const fn new(board: Board<S>) -> Self {
        Self::with_config(board, DEFAULT_MAX_BODY_SIZE)
    }

    /// Creates state with a custom body size limit.
    #[must_use]
    pub const fn with_config(board: Board<S>, max_body_size: usize) -> Self {
        Self {
            board,
            max_body_size,
        }
    }
}

/// Builds the full API router.
pub fn router<S: EntityStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let body_limit = state.max_body_size;
    Router::new()
        .nest("/api/tasks", routes::tasks::router())
        .nest("/api/users", routes::users::router())
        .route("/api/maintenance/sweep", post(routes::run_sweep::<S>))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves the API until `shutdown` resolves.
///
/// Returns the bound address (useful with port 0) and the handle of the
/// server task. In-flight requests are allowed to finish after `shutdown`.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn start_server_with_state<S, F>(
    addr: &str,
    state: Arc<AppState<S>>,
    shutdown: F,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
>
where
    S: EntityStore + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!(error = %e, "taskboard server error");
        }
    });

    Ok((bound_addr, handle))
}
