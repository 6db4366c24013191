use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::NOW_SQL;
use crate::error::{AppError, AppResult, OptionExt};
use crate::featured::select_featured;
use crate::types::{
    Actor, CreateMovieRequest, Movie, MovieDetail, MovieListResponse, Rating, UpdateMovieRequest,
};

use super::search::contains_pattern;
use super::{
    convert_rows, ActorRow, MovieRow, RatingRow, ACTOR_COLUMNS, BIND_CHUNK, MOVIE_COLUMNS,
    RATING_COLUMNS,
};

/// Movies that can become featured: every card field filled in and at least one
/// cast member. Same rules as `Featurable for MovieDetail`; the selector re-checks.
const FEATURED_CANDIDATES: &str = "TRIM(m.title) <> '' \
    AND TRIM(COALESCE(m.description, '')) <> '' \
    AND TRIM(COALESCE(m.genre, '')) <> '' \
    AND m.release_year IS NOT NULL \
    AND TRIM(COALESCE(m.poster_url, '')) <> '' \
    AND EXISTS (SELECT 1 FROM movie_actors ma WHERE ma.movie_id = m.id)";

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Movie with ID {} not found", id))
}

async fn fetch_movie(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Movie>> {
    let row: Option<MovieRow> =
        sqlx::query_as(&format!("SELECT {} FROM movies m WHERE m.id = ?1", MOVIE_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Movie::try_from).transpose()?)
}

pub(crate) async fn title_exists(conn: &mut SqliteConnection, title: &str) -> AppResult<bool> {
    Ok(sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM movies WHERE title = ?1)")
        .bind(title)
        .fetch_one(&mut *conn)
        .await?)
}

#[derive(sqlx::FromRow)]
struct LinkedActorRow {
    link_id: i64,
    #[sqlx(flatten)]
    actor: ActorRow,
}

/// Cast of each of the given movies, keyed by movie id.
async fn actors_by_movie(
    conn: &mut SqliteConnection,
    movie_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<Actor>>> {
    let mut out: HashMap<i64, Vec<Actor>> = HashMap::new();
    for chunk in movie_ids.chunks(BIND_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT ma.movie_id AS link_id, {} FROM movie_actors ma \
             JOIN actors a ON a.id = ma.actor_id WHERE ma.movie_id IN (",
            ACTOR_COLUMNS
        ));
        let mut sep = qb.separated(", ");
        for id in chunk {
            sep.push_bind(*id);
        }
        qb.push(") ORDER BY a.id");

        let rows: Vec<LinkedActorRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
        for row in rows {
            out.entry(row.link_id).or_default().push(Actor::try_from(row.actor)?);
        }
    }
    Ok(out)
}

/// Ratings of each of the given movies, keyed by movie id.
pub(crate) async fn ratings_by_movie(
    conn: &mut SqliteConnection,
    movie_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<Rating>>> {
    let mut out: HashMap<i64, Vec<Rating>> = HashMap::new();
    for chunk in movie_ids.chunks(BIND_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM ratings r WHERE r.movie_id IN (",
            RATING_COLUMNS
        ));
        let mut sep = qb.separated(", ");
        for id in chunk {
            sep.push_bind(*id);
        }
        qb.push(") ORDER BY r.id");

        let rows: Vec<RatingRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
        for rating in convert_rows::<_, Rating>(rows)? {
            out.entry(rating.movie_id).or_default().push(rating);
        }
    }
    Ok(out)
}

/// Attaches cast and ratings to each movie, preserving input order.
async fn hydrate(conn: &mut SqliteConnection, movies: Vec<Movie>) -> AppResult<Vec<MovieDetail>> {
    let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
    let mut actors = actors_by_movie(&mut *conn, &ids).await?;
    let mut ratings = ratings_by_movie(&mut *conn, &ids).await?;
    Ok(movies
        .into_iter()
        .map(|movie| MovieDetail {
            actors: actors.remove(&movie.id).unwrap_or_default(),
            ratings: ratings.remove(&movie.id).unwrap_or_default(),
            movie,
        })
        .collect())
}

async fn link_actors(
    tx: &mut SqliteConnection,
    movie_id: i64,
    actor_ids: &[i64],
) -> AppResult<()> {
    // Unknown actor ids are skipped
    for actor_id in actor_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO movie_actors (movie_id, actor_id) \
             SELECT ?1, id FROM actors WHERE id = ?2",
        )
        .bind(movie_id)
        .bind(*actor_id)
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}

/// Inserts a movie row plus its cast links on an open transaction and returns the new id.
pub(crate) async fn insert(tx: &mut SqliteConnection, req: &CreateMovieRequest) -> AppResult<i64> {
    let res = sqlx::query(
        r#"INSERT INTO movies (title, description, genre, release_year, duration, poster_url)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.genre)
    .bind(req.release_year)
    .bind(req.duration)
    .bind(&req.poster_url)
    .execute(&mut *tx)
    .await?;
    let id = res.last_insert_rowid();
    if let Some(actor_ids) = &req.actor_ids {
        link_actors(&mut *tx, id, actor_ids).await?;
    }
    Ok(id)
}

pub async fn create(db: &SqlitePool, req: CreateMovieRequest) -> AppResult<MovieDetail> {
    req.validate()?;
    let mut tx = db.begin().await?;
    let id = insert(&mut tx, &req).await?;
    tx.commit().await?;
    tracing::info!(movie_id = id, title = %req.title, "movie created");
    get(db, id).await
}

fn push_search_filter(qb: &mut QueryBuilder<'_, Sqlite>, pattern: Option<&str>) {
    if let Some(p) = pattern {
        qb.push(" WHERE (m.title REGEXP ")
            .push_bind(p.to_string())
            .push(" OR COALESCE(m.genre, '') REGEXP ")
            .push_bind(p.to_string())
            .push(" OR COALESCE(m.description, '') REGEXP ")
            .push_bind(p.to_string())
            .push(")");
    }
}

/// One page of movies, newest id first, optionally filtered by a case-insensitive
/// substring of title, genre or description.
pub async fn list(
    db: &SqlitePool,
    page: i64,
    limit: i64,
    search: Option<&str>,
) -> AppResult<MovieListResponse> {
    if page < 1 {
        return Err(AppError::ValidationError {
            field: "page".to_string(),
            message: format!("page must be a positive integer, got {}", page),
        });
    }
    if limit < 1 {
        return Err(AppError::ValidationError {
            field: "limit".to_string(),
            message: format!("limit must be a positive integer, got {}", limit),
        });
    }
    let offset = (page - 1).checked_mul(limit).ok_or_else(|| {
        AppError::InvalidInput("page and limit combination would overflow".to_string())
    })?;

    let pattern = search.map(contains_pattern);

    let mut tx = db.begin().await?;
    let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM movies m");
    push_search_filter(&mut count_qb, pattern.as_deref());
    let total: i64 = count_qb.build_query_scalar().fetch_one(&mut *tx).await?;

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM movies m", MOVIE_COLUMNS));
    push_search_filter(&mut qb, pattern.as_deref());
    qb.push(" ORDER BY m.id DESC LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    let rows: Vec<MovieRow> = qb.build_query_as().fetch_all(&mut *tx).await?;

    let items = hydrate(&mut tx, convert_rows(rows)?).await?;
    tx.commit().await?;

    let has_more = offset + (items.len() as i64) < total;
    Ok(MovieListResponse { movies: items.clone(), items, total, has_more })
}

pub async fn get(db: &SqlitePool, id: i64) -> AppResult<MovieDetail> {
    let mut tx = db.begin().await?;
    let movie = fetch_movie(&mut tx, id).await?.ok_or_else(|| not_found(id))?;
    let detail = hydrate(&mut tx, vec![movie]).await?.pop().ok_or_not_found("Movie")?;
    tx.commit().await?;
    Ok(detail)
}

pub async fn actors_of(db: &SqlitePool, id: i64) -> AppResult<Vec<Actor>> {
    Ok(get(db, id).await?.actors)
}

pub async fn update(db: &SqlitePool, id: i64, req: UpdateMovieRequest) -> AppResult<MovieDetail> {
    req.validate()?;

    let mut tx = db.begin().await?;
    fetch_movie(&mut tx, id).await?.ok_or_else(|| not_found(id))?;

    // Some(None) is an explicit null and clears the column
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("UPDATE movies SET updated_at = {}", NOW_SQL));
    if let Some(Some(v)) = req.title {
        qb.push(", title = ").push_bind(v);
    }
    if let Some(v) = req.description {
        qb.push(", description = ").push_bind(v);
    }
    if let Some(v) = req.genre {
        qb.push(", genre = ").push_bind(v);
    }
    if let Some(v) = req.release_year {
        qb.push(", release_year = ").push_bind(v);
    }
    if let Some(v) = req.duration {
        qb.push(", duration = ").push_bind(v);
    }
    if let Some(v) = req.poster_url {
        qb.push(", poster_url = ").push_bind(v);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.build().execute(&mut *tx).await?;

    if let Some(actor_ids) = &req.actor_ids {
        sqlx::query("DELETE FROM movie_actors WHERE movie_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_actors(&mut tx, id, actor_ids).await?;
    }
    tx.commit().await?;
    tracing::info!(movie_id = id, "movie updated");
    get(db, id).await
}

pub async fn delete(db: &SqlitePool, id: i64) -> AppResult<()> {
    let res = sqlx::query("DELETE FROM movies WHERE id = ?1").bind(id).execute(db).await?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }
    tracing::info!(movie_id = id, "movie deleted");
    Ok(())
}

/// Movies an actor appears in, with their cast and ratings.
pub(crate) async fn by_actor(
    conn: &mut SqliteConnection,
    actor_id: i64,
) -> AppResult<Vec<MovieDetail>> {
    let rows: Vec<MovieRow> = sqlx::query_as(&format!(
        "SELECT {} FROM movies m JOIN movie_actors ma ON ma.movie_id = m.id \
         WHERE ma.actor_id = ?1 ORDER BY m.id",
        MOVIE_COLUMNS
    ))
    .bind(actor_id)
    .fetch_all(&mut *conn)
    .await?;
    hydrate(conn, convert_rows(rows)?).await
}

/// Featured movies: complete, cast, best average rating first.
pub async fn recent(db: &SqlitePool, limit: i64) -> AppResult<Vec<MovieDetail>> {
    let mut tx = db.begin().await?;
    let featured = recent_in(&mut tx, limit).await?;
    tx.commit().await?;
    Ok(featured)
}

/// [`recent`] on a caller-provided connection. Inside a transaction every read
/// of the selection sees the same snapshot.
pub async fn recent_in(conn: &mut SqliteConnection, limit: i64) -> AppResult<Vec<MovieDetail>> {
    let rows: Vec<MovieRow> = sqlx::query_as(&format!(
        "SELECT {} FROM movies m WHERE {} ORDER BY m.id",
        MOVIE_COLUMNS, FEATURED_CANDIDATES
    ))
    .fetch_all(&mut *conn)
    .await?;
    let candidates = hydrate(conn, convert_rows(rows)?).await?;
    Ok(select_featured(candidates, limit)?)
}
