//! `/api/users` handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use taskboard::EntityStore;
use taskboard_proto::envelope::{Envelope, ListQuery};
use taskboard_proto::{User, UserDraft, UserId};

use super::ListData;
use crate::error::ApiError;
use crate::server::AppState;

/// Routes mounted under `/api/users`.
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
) -> Result<Json<Envelope<ListData<User>>>, ApiError> {
    let data = if query.wants_count() {
        ListData::Count(state.board.count_users().await?)
    } else {
        ListData::Items(state.board.list_users().await?)
    };
    Ok(Json(Envelope::ok(data)))
}

async fn create<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<UserDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<User>>), ApiError> {
    let Json(draft) = body?;
    let user = state.board.create_user(draft).await?;
    Ok((StatusCode::CREATED, Json(Envelope::created(user))))
}

async fn fetch<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<UserId>,
) -> Result<Json<Envelope<User>>, ApiError> {
    let user = state.board.get_user(&id).await?;
    Ok(Json(Envelope::ok(user)))
}

async fn replace<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<UserId>,
    body: Result<Json<UserDraft>, JsonRejection>,
) -> Result<Json<Envelope<User>>, ApiError> {
    let Json(draft) = body?;
    let user = state.board.replace_user(&id, draft).await?;
    Ok(Json(Envelope::with_message("Updated", user)))
}

async fn remove<S: EntityStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<UserId>,
) -> Result<Json<Envelope<User>>, ApiError> {
    let user = state.board.delete_user(&id).await?;
    Ok(Json(Envelope::deleted(user)))
}
