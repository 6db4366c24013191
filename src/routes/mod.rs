//! HTTP handlers of the filmregal API.
//!
//! - `health`: liveness, readiness, metrics and version
//! - `movies`, `actors`, `ratings`: catalog CRUD plus featured selections
//! - `search`: combined movie and actor search
//! - `seeding`: TMDB import and catalog wipe
//!
//! Handlers only parse and shape HTTP; the work happens in [`crate::catalog`].

pub mod actors;
pub mod health;
pub mod movies;
pub mod ratings;
pub mod search;
pub mod seeding;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Json, Router,
};

use crate::error::{AppError, AppResult};
use crate::middleware::{auth::require_api_key, rate_limit::endpoint_rate_limit_middleware};
use crate::state::AppState;

/// Unwraps a JSON body, turning malformed or mistyped payloads into a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Same as [`json_body`] for query strings (`?limit=abc`).
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Numeric id from the path; `/movies/abc` becomes a JSON 400 instead of plain text.
pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id).map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// All API routes with the write guard and per-endpoint limits applied.
///
/// Global layers (body limit, validation, global rate limit, compression, tracing,
/// security headers, CORS) are added by the binary.
pub fn router(state: AppState) -> Router {
    let catalog = Router::new()
        .route("/movies", get(movies::list_movies).post(movies::create_movie))
        .route("/movies/recent", get(movies::recent_movies))
        .route(
            "/movies/{id}",
            get(movies::get_movie).patch(movies::update_movie).delete(movies::delete_movie),
        )
        .route("/movies/{id}/actors", get(movies::movie_actors))
        .route("/actors", get(actors::list_actors).post(actors::create_actor))
        .route("/actors/recent", get(actors::recent_actors))
        .route(
            "/actors/{id}",
            get(actors::get_actor).patch(actors::update_actor).delete(actors::delete_actor),
        )
        .route("/actors/{id}/movies", get(actors::actor_movies))
        .route("/ratings", get(ratings::list_ratings).post(ratings::create_rating))
        .route(
            "/ratings/{id}",
            get(ratings::get_rating).patch(ratings::update_rating).delete(ratings::delete_rating),
        )
        .route("/ratings/movie/{movie_id}", get(ratings::movie_ratings))
        .route("/ratings/movie/{movie_id}/average", get(ratings::movie_average))
        .route("/search", get(search::search_all))
        .route("/seeding/movies", post(seeding::seed_movies))
        .route("/seeding/clear", delete(seeding::clear_catalog))
        // Auth runs before the endpoint limits so unauthenticated writes don't use up the budget
        .layer(from_fn_with_state(state.clone(), endpoint_rate_limit_middleware))
        .layer(from_fn_with_state(state.config.clone(), require_api_key));

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics))
        .route("/metrics/prometheus", get(health::metrics_prometheus))
        .route("/version", get(health::version))
        .merge(catalog)
        .with_state(state)
}
