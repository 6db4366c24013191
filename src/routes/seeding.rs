use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::query_params;
use crate::{
    catalog::{
        self,
        seeding::{self, SeedOptions},
    },
    error::AppResult,
    state::AppState,
    tmdb::{TmdbClient, TmdbError},
};

const DEFAULT_IMPORT_COUNT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct SeedQuery {
    pub count: Option<u32>,
}

fn missing_api_key() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "message": "TMDB API key not configured. Please add TMDB_API_KEY to your \
                        environment variables.",
            "status": "error",
            "instructions": "Get your API key from https://www.themoviedb.org/settings/api",
        })),
    )
}

// Imports popular movies from TMDB. Runs to completion before responding.
pub async fn seed_movies(
    State(state): State<AppState>,
    query: Result<Query<SeedQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let count = query_params(query)?.count.unwrap_or(DEFAULT_IMPORT_COUNT);
    let client = match TmdbClient::from_config(&state.config.tmdb) {
        Ok(client) => client,
        Err(TmdbError::MissingApiKey) => {
            tracing::warn!("TMDB import requested without an API key");
            return Ok(missing_api_key());
        }
        Err(e) => return Err(e.into()),
    };
    let opts = SeedOptions {
        image_base_url: state.config.tmdb.image_base_url.clone(),
        request_delay: Duration::from_millis(state.config.tmdb.request_delay_ms),
    };

    let report = seeding::seed_movies(&state.db, &client, count, &opts).await?;
    state.metrics.add_movies_imported(u64::from(report.imported));
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Successfully seeded {} movies from TMDB API", report.imported),
            "status": "completed",
            "report": report,
        })),
    ))
}

// Wipes the whole catalog. Guarded by the API key like every other write.
pub async fn clear_catalog(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    catalog::clear_all(&state.db).await?;
    tracing::warn!("catalog cleared via API");
    Ok(StatusCode::NO_CONTENT)
}
