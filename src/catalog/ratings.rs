use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::db::NOW_SQL;
use crate::error::{AppError, AppResult};
use crate::types::{AverageRating, CreateRatingRequest, Rating, UpdateRatingRequest};

use super::{convert_rows, RatingRow, RATING_COLUMNS};

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Rating with ID {} not found", id))
}

async fn fetch_rating(db: &SqlitePool, id: i64) -> AppResult<Option<Rating>> {
    let row: Option<RatingRow> =
        sqlx::query_as(&format!("SELECT {} FROM ratings r WHERE r.id = ?1", RATING_COLUMNS))
            .bind(id)
            .fetch_optional(db)
            .await?;
    Ok(row.map(Rating::try_from).transpose()?)
}

pub async fn create(db: &SqlitePool, req: CreateRatingRequest) -> AppResult<Rating> {
    req.validate()?;
    // A rating for a missing movie is a malformed request, not a missing resource
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM movies WHERE id = ?1)")
        .bind(req.movie_id)
        .fetch_one(db)
        .await?;
    if !exists {
        return Err(AppError::BadRequest(format!("Movie with ID {} not found", req.movie_id)));
    }
    let id = insert(db, &req).await?;
    tracing::info!(
        rating_id = id,
        movie_id = req.movie_id,
        score = req.score,
        "rating created"
    );
    get(db, id).await
}

/// Inserts a rating without checking the movie first; the foreign key still does.
pub(crate) async fn insert<'e, E>(executor: E, req: &CreateRatingRequest) -> AppResult<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let res = sqlx::query(
        "INSERT INTO ratings (score, review, reviewer_name, source, movie_id) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(req.score)
    .bind(&req.review)
    .bind(&req.reviewer_name)
    .bind(&req.source)
    .bind(req.movie_id)
    .execute(executor)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn list(db: &SqlitePool) -> AppResult<Vec<Rating>> {
    let rows: Vec<RatingRow> =
        sqlx::query_as(&format!("SELECT {} FROM ratings r ORDER BY r.id", RATING_COLUMNS))
            .fetch_all(db)
            .await?;
    convert_rows(rows)
}

pub async fn get(db: &SqlitePool, id: i64) -> AppResult<Rating> {
    fetch_rating(db, id).await?.ok_or_else(|| not_found(id))
}

/// Ratings of one movie. An unknown movie simply has none.
pub async fn by_movie(db: &SqlitePool, movie_id: i64) -> AppResult<Vec<Rating>> {
    let rows: Vec<RatingRow> = sqlx::query_as(&format!(
        "SELECT {} FROM ratings r WHERE r.movie_id = ?1 ORDER BY r.id",
        RATING_COLUMNS
    ))
    .bind(movie_id)
    .fetch_all(db)
    .await?;
    convert_rows(rows)
}

pub async fn update(db: &SqlitePool, id: i64, req: UpdateRatingRequest) -> AppResult<Rating> {
    req.validate()?;
    fetch_rating(db, id).await?.ok_or_else(|| not_found(id))?;

    // Some(None) is an explicit null and clears the column
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("UPDATE ratings SET updated_at = {}", NOW_SQL));
    if let Some(Some(v)) = req.score {
        qb.push(", score = ").push_bind(v);
    }
    if let Some(v) = req.review {
        qb.push(", review = ").push_bind(v);
    }
    if let Some(v) = req.reviewer_name {
        qb.push(", reviewer_name = ").push_bind(v);
    }
    if let Some(v) = req.source {
        qb.push(", source = ").push_bind(v);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.build().execute(db).await?;
    tracing::info!(rating_id = id, "rating updated");
    get(db, id).await
}

pub async fn delete(db: &SqlitePool, id: i64) -> AppResult<()> {
    let res = sqlx::query("DELETE FROM ratings WHERE id = ?1").bind(id).execute(db).await?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }
    tracing::info!(rating_id = id, "rating deleted");
    Ok(())
}

/// Rounds to one decimal place.
pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean score of a movie, rounded to one decimal.
pub async fn average(db: &SqlitePool, movie_id: i64) -> AppResult<AverageRating> {
    let (avg, count): (Option<f64>, i64) =
        sqlx::query_as("SELECT AVG(score), COUNT(*) FROM ratings WHERE movie_id = ?1")
            .bind(movie_id)
            .fetch_one(db)
            .await?;
    Ok(AverageRating { average: avg.filter(|_| count > 0).map(round_one_decimal), count })
}
