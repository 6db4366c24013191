//! Import of popular movies from TMDB, with their top-billed cast and two
//! ratings derived from the TMDB vote average.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::tmdb::{CastMember, MovieDetails, MovieSummary, Person, TmdbSource};
use crate::types::{CreateActorRequest, CreateMovieRequest, CreateRatingRequest};

use super::{actors, movies, ratings};

/// Entries per page of `/movie/popular`.
pub const TMDB_PAGE_SIZE: u32 = 20;
/// Largest `count` accepted for one import (25 pages).
pub const MAX_IMPORT_COUNT: u32 = 500;
/// Cast members taken per movie.
const TOP_CAST: usize = 5;

const NO_DESCRIPTION: &str = "No description available";
const UNKNOWN_GENRE: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub image_base_url: String,
    /// Pause after each movie; actors wait half of it, pages five times it.
    pub request_delay: Duration,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub requested: u32,
    pub imported: u32,
    /// Already in the catalog under the same title.
    pub skipped: u32,
    /// Lost to a failed TMDB lookup or insert.
    pub failed: u32,
    pub actors_created: u32,
}

/// How many entries to take from each popular page: full pages, then the remainder.
pub fn page_sizes(count: u32) -> Vec<u32> {
    let pages = count.div_ceil(TMDB_PAGE_SIZE);
    (1..=pages)
        .map(|page| match count % TMDB_PAGE_SIZE {
            rest if page == pages && rest != 0 => rest,
            _ => TMDB_PAGE_SIZE,
        })
        .collect()
}

/// Splits a display name at the first space. A single-word name is used for both parts.
pub fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = parts.collect();
    let last = if rest.is_empty() { first.clone() } else { rest.join(" ") };
    (first, last)
}

/// Country part of a TMDB `place_of_birth` ("Boston, Massachusetts, USA" is "USA").
pub fn nationality_from(place_of_birth: Option<&str>) -> Option<String> {
    place_of_birth
        .and_then(|place| place.rsplit(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn image_url(base: &str, path: Option<&str>) -> Option<String> {
    path.map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("{}{}", base.trim_end_matches('/'), p))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
}

pub fn movie_request(
    summary: &MovieSummary,
    details: &MovieDetails,
    genres: &HashMap<i64, String>,
    image_base_url: &str,
) -> CreateMovieRequest {
    let genre = summary
        .genre_ids
        .first()
        .and_then(|id| genres.get(id))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_GENRE.to_string());
    CreateMovieRequest {
        title: summary.title.clone(),
        description: Some(
            non_blank(summary.overview.as_deref()).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        ),
        genre: Some(genre),
        release_year: parse_date(summary.release_date.as_deref()).map(|d| i64::from(d.year())),
        duration: details.runtime.filter(|r| *r > 0),
        poster_url: image_url(image_base_url, summary.poster_path.as_deref()),
        actor_ids: None,
    }
}

/// Actor row for a cast member plus the parsed birthday.
pub fn actor_request(
    cast: &CastMember,
    person: &Person,
    image_base_url: &str,
) -> (CreateActorRequest, Option<NaiveDate>) {
    let (first_name, last_name) = split_name(&cast.name);
    let birthday = parse_date(person.birthday.as_deref());
    let req = CreateActorRequest {
        first_name,
        last_name,
        date_of_birth: birthday.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        nationality: nationality_from(person.place_of_birth.as_deref()),
        biography: non_blank(person.biography.as_deref()),
        photo_url: image_url(image_base_url, person.profile_path.as_deref()),
        movie_ids: None,
    };
    (req, birthday)
}

fn seed_score(value: f64) -> f64 {
    ((value * 10.0).round() / 10.0).clamp(0.0, 10.0)
}

/// Community rating at the TMDB average and a critic rating offset by up to half a
/// point. The offset is derived from the TMDB id so reruns import the same scores.
pub fn rating_requests(
    movie_id: i64,
    tmdb_id: i64,
    vote_average: f64,
) -> [CreateRatingRequest; 2] {
    let offset = (tmdb_id.rem_euclid(11) as f64 - 5.0) / 10.0;
    [
        CreateRatingRequest {
            score: seed_score(vote_average),
            review: Some("Great movie with excellent performances!".to_string()),
            reviewer_name: Some("TMDB Community".to_string()),
            source: Some("TMDB".to_string()),
            movie_id,
        },
        CreateRatingRequest {
            score: seed_score(vote_average + offset),
            review: Some("Highly recommended for movie enthusiasts.".to_string()),
            reviewer_name: Some("Film Critic".to_string()),
            source: Some("Professional Review".to_string()),
            movie_id,
        },
    ]
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Existing actor with the cast member's name, or a new one built from the TMDB
/// person record. `None` when TMDB has no usable person record.
async fn resolve_actor(
    db: &SqlitePool,
    source: &dyn TmdbSource,
    cast: &CastMember,
    opts: &SeedOptions,
    report: &mut SeedReport,
) -> AppResult<Option<i64>> {
    let (first_name, last_name) = split_name(&cast.name);
    if first_name.is_empty() {
        return Ok(None);
    }
    let mut conn = db.acquire().await?;
    if let Some(id) = actors::find_by_name(&mut conn, &first_name, &last_name).await? {
        return Ok(Some(id));
    }
    drop(conn);

    let person = match source.person(cast.id).await {
        Ok(person) => person,
        Err(e) => {
            tracing::warn!(
                person_id = cast.id,
                name = %cast.name,
                error = %e,
                "skipping cast member"
            );
            return Ok(None);
        }
    };
    let (req, birthday) = actor_request(cast, &person, &opts.image_base_url);
    let mut tx = db.begin().await?;
    let id = actors::insert(&mut tx, &req, birthday).await?;
    tx.commit().await?;
    report.actors_created += 1;
    tracing::debug!(actor_id = id, name = %cast.name, "actor imported");
    Ok(Some(id))
}

/// Imports one popular movie. `Ok(false)` means it was already in the catalog.
async fn import_movie(
    db: &SqlitePool,
    source: &dyn TmdbSource,
    summary: &MovieSummary,
    genres: &HashMap<i64, String>,
    opts: &SeedOptions,
    report: &mut SeedReport,
) -> AppResult<bool> {
    {
        let mut conn = db.acquire().await?;
        if movies::title_exists(&mut conn, &summary.title).await? {
            tracing::debug!(title = %summary.title, "movie already exists, skipping");
            return Ok(false);
        }
    }

    let details = source.movie_details(summary.id).await?;
    let cast = source.movie_cast(summary.id).await?;

    let mut actor_ids = Vec::new();
    for member in cast.iter().take(TOP_CAST) {
        if let Some(id) = resolve_actor(db, source, member, opts, report).await? {
            actor_ids.push(id);
        }
        pause(opts.request_delay / 2).await;
    }

    let mut req = movie_request(summary, &details, genres, &opts.image_base_url);
    req.actor_ids = Some(actor_ids);
    let mut tx = db.begin().await?;
    let movie_id = movies::insert(&mut tx, &req).await?;
    for rating in rating_requests(movie_id, summary.id, summary.vote_average) {
        ratings::insert(&mut *tx, &rating).await?;
    }
    tx.commit().await?;
    tracing::debug!(movie_id, title = %req.title, "movie imported");
    Ok(true)
}

/// Imports up to `count` popular movies. A movie or cast member that cannot be
/// fetched is logged and skipped; failing to read a popular page or the genre list
/// aborts the run.
pub async fn seed_movies(
    db: &SqlitePool,
    source: &dyn TmdbSource,
    count: u32,
    opts: &SeedOptions,
) -> AppResult<SeedReport> {
    if count == 0 || count > MAX_IMPORT_COUNT {
        return Err(AppError::ValidationError {
            field: "count".to_string(),
            message: format!("Value must be between 1 and {}, got {}", MAX_IMPORT_COUNT, count),
        });
    }
    tracing::info!(count, "starting TMDB import");

    let genres = source.genres().await?;
    tracing::info!(genres = genres.len(), "loaded TMDB genres");

    let mut report = SeedReport { requested: count, ..SeedReport::default() };
    let sizes = page_sizes(count);
    for (index, take) in sizes.iter().enumerate() {
        let page = index as u32 + 1;
        tracing::info!(page, pages = sizes.len(), "processing TMDB page");
        let popular = source.popular_movies(page).await?;

        for summary in popular.iter().take(*take as usize) {
            match import_movie(db, source, summary, &genres, opts, &mut report).await {
                Ok(true) => {
                    report.imported += 1;
                    pause(opts.request_delay).await;
                }
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(title = %summary.title, error = %e, "failed to import movie");
                    report.failed += 1;
                }
            }
        }
        pause(opts.request_delay * 5).await;
    }

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        failed = report.failed,
        actors_created = report.actors_created,
        "TMDB import finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sizes() {
        assert_eq!(page_sizes(100), vec![20; 5]);
        assert_eq!(page_sizes(45), vec![20, 20, 5]);
        assert_eq!(page_sizes(7), vec![7]);
        assert_eq!(page_sizes(20), vec![20]);
        assert!(page_sizes(0).is_empty());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Edward Norton"), ("Edward".into(), "Norton".into()));
        assert_eq!(
            split_name("Helena Bonham Carter"),
            ("Helena".into(), "Bonham Carter".into())
        );
        assert_eq!(split_name("Zendaya"), ("Zendaya".into(), "Zendaya".into()));
        assert_eq!(split_name("  Meat   Loaf "), ("Meat".into(), "Loaf".into()));
    }

    #[test]
    fn test_nationality_is_last_place_segment() {
        assert_eq!(nationality_from(Some("Boston, Massachusetts, USA")).as_deref(), Some("USA"));
        assert_eq!(nationality_from(Some("Paris")).as_deref(), Some("Paris"));
        assert_eq!(nationality_from(Some("  ")), None);
        assert_eq!(nationality_from(None), None);
    }

    #[test]
    fn test_rating_scores_are_rounded_and_clamped() {
        // 550 % 11 == 0, so the critic is half a point below
        let [community, critic] = rating_requests(1, 550, 8.433);
        assert_eq!(community.score, 8.4);
        assert_eq!(critic.score, 7.9);
        assert_eq!(community.source.as_deref(), Some("TMDB"));
        assert_eq!(critic.reviewer_name.as_deref(), Some("Film Critic"));

        let [_, critic] = rating_requests(1, 603, 9.9);
        assert_eq!(critic.score, 10.0);
        let [community, critic] = rating_requests(1, 550, 0.2);
        assert_eq!(community.score, 0.2);
        assert_eq!(critic.score, 0.0);
    }
}
