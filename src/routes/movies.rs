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

use super::{json_body, path_id, query_params};
use crate::{
    catalog::{movies, search::sanitize_search_term},
    config::AppConfig,
    error::AppResult,
    state::AppState,
    types::{CreateMovieRequest, UpdateMovieRequest},
};

#[derive(Debug, Deserialize)]
pub struct ListMoviesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// Page size from the query, defaulted and capped by `[catalog]`. Values below 1 are
/// passed through so the service can reject them.
pub(crate) fn page_size(cfg: &AppConfig, requested: Option<i64>) -> i64 {
    requested.unwrap_or(cfg.catalog.default_page_size).min(cfg.catalog.max_page_size)
}

/// Blank search strings mean no filter.
pub(crate) fn search_filter(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw {
        Some(s) if !s.trim().is_empty() => Ok(Some(sanitize_search_term(s)?)),
        _ => Ok(None),
    }
}

pub async fn list_movies(
    State(state): State<AppState>,
    query: Result<Query<ListMoviesQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let q = query_params(query)?;
    let search = search_filter(q.search.as_deref())?;
    let limit = page_size(&state.config, q.limit);
    let page = movies::list(&state.db, q.page.unwrap_or(1), limit, search.as_deref()).await?;
    Ok(Json(page))
}

pub async fn create_movie(
    State(state): State<AppState>,
    payload: Result<Json<CreateMovieRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let req = json_body(payload)?;
    let movie = movies::create(&state.db, req).await?;
    state.metrics.inc_movies_created();
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn recent_movies(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let q = query_params(query)?;
    let limit = q.limit.unwrap_or(state.config.catalog.featured_limit);
    let featured = movies::recent(&state.db, limit).await?;
    state.metrics.inc_featured_queries();
    tracing::debug!(limit, returned = featured.len(), "featured movies");
    Ok(Json(featured))
}

pub async fn get_movie(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(movies::get(&state.db, path_id(id)?).await?))
}

pub async fn movie_actors(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(movies::actors_of(&state.db, path_id(id)?).await?))
}

pub async fn update_movie(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateMovieRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let id = path_id(id)?;
    let req = json_body(payload)?;
    Ok(Json(movies::update(&state.db, id, req).await?))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    movies::delete(&state.db, path_id(id)?).await?;
    state.metrics.inc_records_deleted();
    Ok(StatusCode::NO_CONTENT)
}
