use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{validation, AppResult};
use crate::featured::{DisplayField, Featurable};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub release_year: Option<i64>,
    /// Runtime in minutes.
    pub duration: Option<i64>,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub biography: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i64,
    /// 0.0 to 10.0, one decimal place.
    pub score: f64,
    pub review: Option<String>,
    pub reviewer_name: Option<String>,
    /// e.g. "IMDb", "Rotten Tomatoes", "User"
    pub source: Option<String>,
    pub movie_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Movie with its cast and ratings, the shape every movie endpoint returns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: Movie,
    pub actors: Vec<Actor>,
    pub ratings: Vec<Rating>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorDetail {
    #[serde(flatten)]
    pub actor: Actor,
    pub movies: Vec<Movie>,
}

/// An actor together with every rating score of every movie they appear in.
#[derive(Debug, Clone)]
pub struct ActorCandidate {
    pub detail: ActorDetail,
    pub scores: Vec<f64>,
}

impl Featurable for MovieDetail {
    fn display_fields(&self) -> Vec<DisplayField<'_>> {
        let m = &self.movie;
        vec![
            DisplayField::Text(Some(m.title.as_str())),
            DisplayField::Text(m.description.as_deref()),
            DisplayField::Text(m.genre.as_deref()),
            DisplayField::Number(m.release_year),
            DisplayField::Text(m.poster_url.as_deref()),
        ]
    }

    fn linked_count(&self) -> usize {
        self.actors.len()
    }

    fn rating_scores(&self) -> Vec<f64> {
        self.ratings.iter().map(|r| r.score).collect()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.movie.created_at
    }
}

impl Featurable for ActorCandidate {
    fn display_fields(&self) -> Vec<DisplayField<'_>> {
        let a = &self.detail.actor;
        vec![
            DisplayField::Text(Some(a.first_name.as_str())),
            DisplayField::Text(Some(a.last_name.as_str())),
            DisplayField::Text(a.biography.as_deref()),
            DisplayField::Text(a.nationality.as_deref()),
            DisplayField::Text(a.photo_url.as_deref()),
        ]
    }

    fn linked_count(&self) -> usize {
        self.detail.movies.len()
    }

    fn rating_scores(&self) -> Vec<f64> {
        self.scores.clone()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.detail.actor.created_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieListResponse {
    pub items: Vec<MovieDetail>,
    /// Same rows as `items`, kept for clients that read the `movies` key.
    pub movies: Vec<MovieDetail>,
    pub total: i64,
    pub has_more: bool,
}

/// Average score of a movie. `average` is `None` when the movie has no ratings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AverageRating {
    pub average: Option<f64>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAllResponse {
    pub movies: Vec<MovieDetail>,
    pub actors: Vec<ActorDetail>,
}

// ---------------- Request DTOs ----------------

/// For PATCH bodies: an absent field stays `None`, an explicit `null` becomes
/// `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMovieRequest {
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub release_year: Option<i64>,
    pub duration: Option<i64>,
    pub poster_url: Option<String>,
    pub actor_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMovieRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub genre: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub release_year: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub duration: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub poster_url: Option<Option<String>>,
    /// Replaces the cast when present; an empty list clears it.
    pub actor_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateActorRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub nationality: Option<String>,
    pub biography: Option<String>,
    pub photo_url: Option<String>,
    pub movie_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateActorRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub date_of_birth: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub nationality: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub biography: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_url: Option<Option<String>>,
    pub movie_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRatingRequest {
    pub score: f64,
    pub review: Option<String>,
    pub reviewer_name: Option<String>,
    pub source: Option<String>,
    pub movie_id: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRatingRequest {
    #[serde(default, deserialize_with = "nullable")]
    pub score: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub review: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reviewer_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub source: Option<Option<String>>,
}

/// The value of a PATCH field that is being set to something other than `null`.
fn set_value<T>(field: &Option<Option<T>>) -> Option<&T> {
    field.as_ref().and_then(Option::as_ref)
}

fn validate_movie_fields(
    title: Option<&str>,
    genre: Option<&str>,
    release_year: Option<i64>,
    duration: Option<i64>,
    poster_url: Option<&str>,
) -> AppResult<()> {
    if let Some(title) = title {
        validation::validate_length(title, "title", 1, 255)?;
    }
    if let Some(genre) = genre {
        validation::validate_length(genre, "genre", 1, 100)?;
    }
    if let Some(year) = release_year {
        let latest = i64::from(Utc::now().year()) + 10;
        validation::validate_range(year, "releaseYear", 1800, latest)?;
    }
    validation::validate_positive_number(duration, "duration")?;
    if let Some(url) = poster_url {
        validation::validate_url(url, "posterUrl")?;
    }
    Ok(())
}

fn validate_actor_fields(
    first_name: Option<&str>,
    last_name: Option<&str>,
    date_of_birth: Option<&str>,
    nationality: Option<&str>,
    photo_url: Option<&str>,
) -> AppResult<()> {
    if let Some(v) = first_name {
        validation::validate_length(v, "firstName", 1, 100)?;
    }
    if let Some(v) = last_name {
        validation::validate_length(v, "lastName", 1, 100)?;
    }
    if let Some(v) = date_of_birth {
        validation::validate_iso_date(v, "dateOfBirth")?;
    }
    if let Some(v) = nationality {
        validation::validate_length(v, "nationality", 1, 100)?;
    }
    if let Some(v) = photo_url {
        validation::validate_url(v, "photoUrl")?;
    }
    Ok(())
}

fn validate_rating_fields(
    score: Option<f64>,
    reviewer_name: Option<&str>,
    source: Option<&str>,
) -> AppResult<()> {
    if let Some(score) = score {
        if !score.is_finite() {
            return Err(crate::error::AppError::ValidationError {
                field: "score".to_string(),
                message: "score must be a number".to_string(),
            });
        }
        validation::validate_range(score, "score", 0.0, 10.0)?;
        validation::validate_one_decimal(score, "score")?;
    }
    if let Some(v) = reviewer_name {
        validation::validate_length(v, "reviewerName", 1, 100)?;
    }
    if let Some(v) = source {
        validation::validate_length(v, "source", 1, 50)?;
    }
    Ok(())
}

impl CreateMovieRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_movie_fields(
            Some(&self.title),
            self.genre.as_deref(),
            self.release_year,
            self.duration,
            self.poster_url.as_deref(),
        )
    }
}

impl UpdateMovieRequest {
    pub fn validate(&self) -> AppResult<()> {
        validation::reject_null(&self.title, "title")?;
        validate_movie_fields(
            set_value(&self.title).map(String::as_str),
            set_value(&self.genre).map(String::as_str),
            set_value(&self.release_year).copied(),
            set_value(&self.duration).copied(),
            set_value(&self.poster_url).map(String::as_str),
        )
    }
}

impl CreateActorRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_actor_fields(
            Some(&self.first_name),
            Some(&self.last_name),
            Some(&self.date_of_birth),
            self.nationality.as_deref(),
            self.photo_url.as_deref(),
        )
    }
}

impl UpdateActorRequest {
    pub fn validate(&self) -> AppResult<()> {
        validation::reject_null(&self.first_name, "firstName")?;
        validation::reject_null(&self.last_name, "lastName")?;
        validate_actor_fields(
            set_value(&self.first_name).map(String::as_str),
            set_value(&self.last_name).map(String::as_str),
            set_value(&self.date_of_birth).map(String::as_str),
            set_value(&self.nationality).map(String::as_str),
            set_value(&self.photo_url).map(String::as_str),
        )
    }
}

impl CreateRatingRequest {
    pub fn validate(&self) -> AppResult<()> {
        validate_rating_fields(
            Some(self.score),
            self.reviewer_name.as_deref(),
            self.source.as_deref(),
        )
    }
}

impl UpdateRatingRequest {
    pub fn validate(&self) -> AppResult<()> {
        validation::reject_null(&self.score, "score")?;
        validate_rating_fields(
            set_value(&self.score).copied(),
            set_value(&self.reviewer_name).map(String::as_str),
            set_value(&self.source).map(String::as_str),
        )
    }
}
