//! Read-only client for the TMDB v3 API, used by the catalog import.
//!
//! [`TmdbSource`] is the seam between the import in [`crate::catalog::seeding`]
//! and the network: [`TmdbClient`] talks to the real API, tests plug in
//! recorded responses.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::TmdbConfig;

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB API key not configured")]
    MissingApiKey,
    #[error("TMDB request timed out")]
    Timeout,
    #[error("TMDB API error: {0}")]
    Status(StatusCode),
    #[error("TMDB request failed: {0}")]
    Request(String),
    #[error("unexpected TMDB response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TmdbError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TmdbError::Timeout
        } else if error.is_decode() {
            TmdbError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            TmdbError::Status(status)
        } else {
            TmdbError::Request(error.to_string())
        }
    }
}

/// One entry of `/movie/popular`.
#[derive(Debug, Clone, Deserialize)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PopularPage {
    #[serde(default)]
    results: Vec<MovieSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    #[serde(default)]
    pub runtime: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub place_of_birth: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Genre {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GenreList {
    #[serde(default)]
    genres: Vec<Genre>,
}

/// The TMDB endpoints the import reads from.
#[async_trait]
pub trait TmdbSource: Send + Sync {
    /// Page `page` (1-based, 20 entries) of the popular movies list.
    async fn popular_movies(&self, page: u32) -> Result<Vec<MovieSummary>, TmdbError>;
    async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails, TmdbError>;
    /// Billed cast, lead roles first.
    async fn movie_cast(&self, movie_id: i64) -> Result<Vec<CastMember>, TmdbError>;
    async fn person(&self, person_id: i64) -> Result<Person, TmdbError>;
    /// Movie genre names keyed by TMDB genre id.
    async fn genres(&self) -> Result<HashMap<i64, String>, TmdbError>;
}

pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, TmdbError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Client for the `[tmdb]` section; fails with [`TmdbError::MissingApiKey`]
    /// when no token is set.
    pub fn from_config(cfg: &TmdbConfig) -> Result<Self, TmdbError> {
        let api_key = cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(TmdbError::MissingApiKey)?;
        Self::new(&cfg.base_url, api_key, Duration::from_secs(cfg.timeout_secs))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, TmdbError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!(%status, endpoint, "TMDB API error");
            return Err(TmdbError::Status(status));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl TmdbSource for TmdbClient {
    async fn popular_movies(&self, page: u32) -> Result<Vec<MovieSummary>, TmdbError> {
        let page: PopularPage = self.get_json(&format!("/movie/popular?page={}", page)).await?;
        Ok(page.results)
    }

    async fn movie_details(&self, movie_id: i64) -> Result<MovieDetails, TmdbError> {
        self.get_json(&format!("/movie/{}", movie_id)).await
    }

    async fn movie_cast(&self, movie_id: i64) -> Result<Vec<CastMember>, TmdbError> {
        let credits: Credits = self.get_json(&format!("/movie/{}/credits", movie_id)).await?;
        Ok(credits.cast)
    }

    async fn person(&self, person_id: i64) -> Result<Person, TmdbError> {
        self.get_json(&format!("/person/{}", person_id)).await
    }

    async fn genres(&self) -> Result<HashMap<i64, String>, TmdbError> {
        let list: GenreList = self.get_json("/genre/movie/list").await?;
        Ok(list.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }
}
