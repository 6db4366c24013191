//! Catalog services: persistence and query logic for movies, actors and ratings.
//!
//! Handlers in [`crate::routes`] stay thin and call into these functions, which
//! take a borrowed [`SqlitePool`] and return domain types from [`crate::types`].

pub mod actors;
pub mod movies;
pub mod ratings;
pub mod search;
pub mod seeding;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::error::AppResult;
use crate::types::{Actor, Movie, Rating};

pub(crate) const MOVIE_COLUMNS: &str = "m.id, m.title, m.description, m.genre, m.release_year, \
    m.duration, m.poster_url, m.created_at, m.updated_at";
pub(crate) const ACTOR_COLUMNS: &str = "a.id, a.first_name, a.last_name, a.date_of_birth, \
    a.nationality, a.biography, a.photo_url, a.created_at, a.updated_at";
pub(crate) const RATING_COLUMNS: &str = "r.id, r.score, r.review, r.reviewer_name, r.source, \
    r.movie_id, r.created_at, r.updated_at";

/// Ids bound per `IN (...)` list. SQLite caps the number of host parameters in
/// one statement, so id sets of any size are loaded in slices of this length.
pub(crate) const BIND_CHUNK: usize = 500;

#[derive(Debug, FromRow)]
pub(crate) struct MovieRow {
    id: i64,
    title: String,
    description: Option<String>,
    genre: Option<String>,
    release_year: Option<i64>,
    duration: Option<i64>,
    poster_url: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct ActorRow {
    id: i64,
    first_name: String,
    last_name: String,
    date_of_birth: Option<String>,
    nationality: Option<String>,
    biography: Option<String>,
    photo_url: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct RatingRow {
    id: i64,
    score: f64,
    review: Option<String>,
    reviewer_name: Option<String>,
    source: Option<String>,
    movie_id: i64,
    created_at: String,
    updated_at: String,
}

/// Parses a stored timestamp. Rows written by SQLite defaults are RFC 3339; rows
/// imported by hand may use the plain `YYYY-MM-DD HH:MM:SS` form.
pub(crate) fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.and_utc())
        })
        .with_context(|| format!("invalid timestamp in database: {}", raw))
}

impl TryFrom<MovieRow> for Movie {
    type Error = anyhow::Error;

    fn try_from(row: MovieRow) -> anyhow::Result<Self> {
        Ok(Movie {
            id: row.id,
            title: row.title,
            description: row.description,
            genre: row.genre,
            release_year: row.release_year,
            duration: row.duration,
            poster_url: row.poster_url,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl TryFrom<ActorRow> for Actor {
    type Error = anyhow::Error;

    fn try_from(row: ActorRow) -> anyhow::Result<Self> {
        let date_of_birth = row
            .date_of_birth
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
            .transpose()
            .with_context(|| format!("invalid date_of_birth for actor {}", row.id))?;
        Ok(Actor {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth,
            nationality: row.nationality,
            biography: row.biography,
            photo_url: row.photo_url,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl TryFrom<RatingRow> for Rating {
    type Error = anyhow::Error;

    fn try_from(row: RatingRow) -> anyhow::Result<Self> {
        Ok(Rating {
            id: row.id,
            score: row.score,
            review: row.review,
            reviewer_name: row.reviewer_name,
            source: row.source,
            movie_id: row.movie_id,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

pub(crate) fn convert_rows<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    Ok(rows.into_iter().map(T::try_from).collect::<anyhow::Result<Vec<T>>>()?)
}

/// Removes every rating, cast link, movie and actor.
pub async fn clear_all(db: &SqlitePool) -> AppResult<()> {
    tracing::info!("Clearing catalog...");
    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM ratings").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM movie_actors").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM movies").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM actors").execute(&mut *tx).await?;
    tx.commit().await?;
    tracing::info!("Catalog cleared");
    Ok(())
}
