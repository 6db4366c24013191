use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{json_body, path_id};
use crate::{
    catalog::ratings,
    error::AppResult,
    state::AppState,
    types::{CreateRatingRequest, UpdateRatingRequest},
};

pub async fn list_ratings(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(Json(ratings::list(&state.db).await?))
}

pub async fn create_rating(
    State(state): State<AppState>,
    payload: Result<Json<CreateRatingRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let req = json_body(payload)?;
    let rating = ratings::create(&state.db, req).await?;
    state.metrics.inc_ratings_created();
    Ok((StatusCode::CREATED, Json(rating)))
}

pub async fn get_rating(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(ratings::get(&state.db, path_id(id)?).await?))
}

pub async fn movie_ratings(
    State(state): State<AppState>,
    movie_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(ratings::by_movie(&state.db, path_id(movie_id)?).await?))
}

pub async fn movie_average(
    State(state): State<AppState>,
    movie_id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(ratings::average(&state.db, path_id(movie_id)?).await?))
}

pub async fn update_rating(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateRatingRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let id = path_id(id)?;
    let req = json_body(payload)?;
    Ok(Json(ratings::update(&state.db, id, req).await?))
}

pub async fn delete_rating(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    ratings::delete(&state.db, path_id(id)?).await?;
    state.metrics.inc_records_deleted();
    Ok(StatusCode::NO_CONTENT)
}
