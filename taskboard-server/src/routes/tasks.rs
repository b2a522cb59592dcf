//! `/api/tasks` handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use taskboard::EntityStore;
use taskboard_proto::envelope::{Envelope, ListQuery};
use taskboard_proto::{Task, TaskDraft, TaskId};

use super::ListData;
use crate::error::ApiError;
use crate::server::AppState;

/// Routes mounted under `/api/tasks`.
pub fn router<S: EntityStore + 'static>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/", get(list::<S>).post(create::<S>))
        .route(
            "/{id}",
            get(fetch::<S>).put(replace::<S>).delete(remove::<S>),
        )
}

async fn list<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Envelope<ListData<Task>>>, ApiError> {
    let data = if query.wants_count() {
        ListData::Count(state.board.count_tasks().await?)
    } else {
        ListData::Items(state.board.list_tasks().await?)
    };
    Ok(Json(Envelope::ok(data)))
}

async fn create<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<TaskDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Task>>), ApiError> {
    let Json(draft) = body?;
    let task = state.board.create_task(draft).await?;
    Ok((StatusCode::CREATED, Json(Envelope::created(task))))
}

async fn fetch<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TaskId>,
) -> Result<Json<Envelope<Task>>, ApiError> {
    let task = state.board.get_task(&id).await?;
    Ok(Json(Envelope::ok(task)))
}

async fn replace<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TaskId>,
    body: Result<Json<TaskDraft>, JsonRejection>,
) -> Result<Json<Envelope<Task>>, ApiError> {
    let Json(draft) = body?;
    let task = state.board.replace_task(&id, draft).await?;
    Ok(Json(Envelope::ok(task)))
}

async fn remove<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<TaskId>,
) -> Result<Json<Envelope<Task>>, ApiError> {
    let task = state.board.delete_task(&id).await?;
    Ok(Json(Envelope::deleted(task)))
}
