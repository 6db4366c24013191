use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::query_params;
use crate::{
    catalog::search,
    error::{AppError, AppResult},
    middleware::validation::sanitize_for_logging,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search_all(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let raw = query_params(query)?
        .q
        .ok_or_else(|| AppError::InvalidInput("Query parameter 'q' is required".to_string()))?;
    tracing::debug!(q = %sanitize_for_logging(&raw), "catalog search");
    let page_size = state.config.catalog.default_page_size;
    let results = search::search_all(&state.db, &raw, page_size).await?;
    state.metrics.inc_search_queries();
    Ok(Json(results))
}
