//! Request handlers.
//!
//! Handlers are thin: they extract the request, call the [`Board`], and wrap
//! the result in an [`Envelope`]. All consistency work happens in the core
//! library.
//!
//! [`Board`]: taskboard::Board

pub mod tasks;
pub mod users;

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use taskboard::{EntityStore, SweepReport};
use taskboard_proto::envelope::Envelope;

use crate::error::ApiError;
use crate::server::AppState;

/// `data` of a list response: the documents, or their number for
/// `?count=true`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListData<T> {
    /// `?count=true`.
    Count(usize),
    /// The documents, oldest first.
    Items(Vec<T>),
}

/// `POST /api/maintenance/sweep`: run the consistency sweep now.
pub async fn run_sweep<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Envelope<SweepReport>>, ApiError> {
    let report = state.board.run_consistency_sweep().await?;
    Ok(Json(Envelope::ok(report)))
}

/// `GET /health`.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
