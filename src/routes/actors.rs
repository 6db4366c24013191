use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::movies::{search_filter, RecentQuery};
use super::{json_body, path_id, query_params};
use crate::{
    catalog::actors,
    error::AppResult,
    state::AppState,
    types::{CreateActorRequest, UpdateActorRequest},
};

#[derive(Debug, Deserialize)]
pub struct ListActorsQuery {
    pub search: Option<String>,
}

pub async fn list_actors(
    State(state): State<AppState>,
    query: Result<Query<ListActorsQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let q = query_params(query)?;
    let search = search_filter(q.search.as_deref())?;
    Ok(Json(actors::list(&state.db, search.as_deref()).await?))
}

pub async fn create_actor(
    State(state): State<AppState>,
    payload: Result<Json<CreateActorRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let req = json_body(payload)?;
    let actor = actors::create(&state.db, req).await?;
    state.metrics.inc_actors_created();
    Ok((StatusCode::CREATED, Json(actor)))
}

pub async fn recent_actors(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let q = query_params(query)?;
    let limit = q.limit.unwrap_or(state.config.catalog.featured_limit);
    let featured = actors::recent(&state.db, limit).await?;
    state.metrics.inc_featured_queries();
    tracing::debug!(limit, returned = featured.len(), "featured actors");
    Ok(Json(featured))
}

pub async fn get_actor(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(actors::get(&state.db, path_id(id)?).await?))
}

pub async fn actor_movies(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(actors::movies_of(&state.db, path_id(id)?).await?))
}

pub async fn update_actor(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateActorRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let id = path_id(id)?;
    let req = json_body(payload)?;
    Ok(Json(actors::update(&state.db, id, req).await?))
}

pub async fn delete_actor(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    actors::delete(&state.db, path_id(id)?).await?;
    state.metrics.inc_records_deleted();
    Ok(StatusCode::NO_CONTENT)
}
