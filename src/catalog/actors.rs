use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::db::NOW_SQL;
use crate::error::{validation, AppError, AppResult, OptionExt};
use crate::featured::select_featured;
use crate::types::{
    Actor, ActorCandidate, ActorDetail, CreateActorRequest, Movie, MovieDetail, UpdateActorRequest,
};

use super::search::contains_pattern;
use super::{convert_rows, movies, ActorRow, MovieRow, ACTOR_COLUMNS, BIND_CHUNK, MOVIE_COLUMNS};

/// Actors that can become featured: complete profile and at least one movie.
const FEATURED_CANDIDATES: &str = "TRIM(a.first_name) <> '' \
    AND TRIM(a.last_name) <> '' \
    AND TRIM(COALESCE(a.biography, '')) <> '' \
    AND TRIM(COALESCE(a.nationality, '')) <> '' \
    AND TRIM(COALESCE(a.photo_url, '')) <> '' \
    AND EXISTS (SELECT 1 FROM movie_actors ma WHERE ma.actor_id = a.id)";

fn not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Actor with ID {} not found", id))
}

async fn fetch_actor(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Actor>> {
    let row: Option<ActorRow> =
        sqlx::query_as(&format!("SELECT {} FROM actors a WHERE a.id = ?1", ACTOR_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(Actor::try_from).transpose()?)
}

/// Id of an actor with exactly this first and last name, if one exists.
pub(crate) async fn find_by_name(
    conn: &mut SqliteConnection,
    first_name: &str,
    last_name: &str,
) -> AppResult<Option<i64>> {
    Ok(sqlx::query_scalar(
        "SELECT id FROM actors WHERE first_name = ?1 AND last_name = ?2 ORDER BY id LIMIT 1",
    )
    .bind(first_name)
    .bind(last_name)
    .fetch_optional(&mut *conn)
    .await?)
}

#[derive(sqlx::FromRow)]
struct LinkedMovieRow {
    link_id: i64,
    #[sqlx(flatten)]
    movie: MovieRow,
}

/// Filmography of each of the given actors, keyed by actor id.
async fn movies_by_actor(
    conn: &mut SqliteConnection,
    actor_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<Movie>>> {
    let mut out: HashMap<i64, Vec<Movie>> = HashMap::new();
    for chunk in actor_ids.chunks(BIND_CHUNK) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT ma.actor_id AS link_id, {} FROM movie_actors ma \
             JOIN movies m ON m.id = ma.movie_id WHERE ma.actor_id IN (",
            MOVIE_COLUMNS
        ));
        let mut sep = qb.separated(", ");
        for id in chunk {
            sep.push_bind(*id);
        }
        qb.push(") ORDER BY m.id");

        let rows: Vec<LinkedMovieRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
        for row in rows {
            out.entry(row.link_id).or_default().push(Movie::try_from(row.movie)?);
        }
    }
    Ok(out)
}

async fn hydrate(conn: &mut SqliteConnection, actors: Vec<Actor>) -> AppResult<Vec<ActorDetail>> {
    let ids: Vec<i64> = actors.iter().map(|a| a.id).collect();
    let mut movies = movies_by_actor(conn, &ids).await?;
    Ok(actors
        .into_iter()
        .map(|actor| ActorDetail { movies: movies.remove(&actor.id).unwrap_or_default(), actor })
        .collect())
}

async fn link_movies(
    tx: &mut SqliteConnection,
    actor_id: i64,
    movie_ids: &[i64],
) -> AppResult<()> {
    // Unknown movie ids are skipped
    for movie_id in movie_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO movie_actors (movie_id, actor_id) \
             SELECT id, ?1 FROM movies WHERE id = ?2",
        )
        .bind(actor_id)
        .bind(*movie_id)
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}

/// Inserts an actor row plus its movie links on an open transaction and returns the new id.
pub(crate) async fn insert(
    tx: &mut SqliteConnection,
    req: &CreateActorRequest,
    date_of_birth: Option<NaiveDate>,
) -> AppResult<i64> {
    let res = sqlx::query(
        "INSERT INTO actors \
         (first_name, last_name, date_of_birth, nationality, biography, photo_url) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&req.nationality)
    .bind(&req.biography)
    .bind(&req.photo_url)
    .execute(&mut *tx)
    .await?;
    let id = res.last_insert_rowid();
    if let Some(movie_ids) = &req.movie_ids {
        link_movies(&mut *tx, id, movie_ids).await?;
    }
    Ok(id)
}

pub async fn create(db: &SqlitePool, req: CreateActorRequest) -> AppResult<ActorDetail> {
    req.validate()?;
    let date_of_birth = validation::validate_iso_date(&req.date_of_birth, "dateOfBirth")?;
    let mut tx = db.begin().await?;
    let id = insert(&mut tx, &req, Some(date_of_birth)).await?;
    tx.commit().await?;
    tracing::info!(actor_id = id, "actor created");
    get(db, id).await
}

/// All actors, optionally filtered by a case-insensitive substring of first name,
/// last name, full name, nationality or biography.
pub async fn list(db: &SqlitePool, search: Option<&str>) -> AppResult<Vec<ActorDetail>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM actors a", ACTOR_COLUMNS));
    if let Some(term) = search {
        let p = contains_pattern(term);
        qb.push(" WHERE (a.first_name REGEXP ")
            .push_bind(p.clone())
            .push(" OR a.last_name REGEXP ")
            .push_bind(p.clone())
            .push(" OR (a.first_name || ' ' || a.last_name) REGEXP ")
            .push_bind(p.clone())
            .push(" OR COALESCE(a.nationality, '') REGEXP ")
            .push_bind(p.clone())
            .push(" OR COALESCE(a.biography, '') REGEXP ")
            .push_bind(p)
            .push(")");
    }
    qb.push(" ORDER BY a.id");

    let mut tx = db.begin().await?;
    let rows: Vec<ActorRow> = qb.build_query_as().fetch_all(&mut *tx).await?;
    let actors = hydrate(&mut tx, convert_rows(rows)?).await?;
    tx.commit().await?;
    Ok(actors)
}

pub async fn get(db: &SqlitePool, id: i64) -> AppResult<ActorDetail> {
    let mut tx = db.begin().await?;
    let actor = fetch_actor(&mut tx, id).await?.ok_or_else(|| not_found(id))?;
    let detail = hydrate(&mut tx, vec![actor]).await?.pop().ok_or_not_found("Actor")?;
    tx.commit().await?;
    Ok(detail)
}

pub async fn movies_of(db: &SqlitePool, id: i64) -> AppResult<Vec<MovieDetail>> {
    let mut tx = db.begin().await?;
    fetch_actor(&mut tx, id).await?.ok_or_else(|| not_found(id))?;
    let filmography = movies::by_actor(&mut tx, id).await?;
    tx.commit().await?;
    Ok(filmography)
}

pub async fn update(db: &SqlitePool, id: i64, req: UpdateActorRequest) -> AppResult<ActorDetail> {
    req.validate()?;
    let date_of_birth = match &req.date_of_birth {
        Some(Some(d)) => Some(Some(validation::validate_iso_date(d, "dateOfBirth")?)),
        Some(None) => Some(None),
        None => None,
    };

    let mut tx = db.begin().await?;
    fetch_actor(&mut tx, id).await?.ok_or_else(|| not_found(id))?;

    // Some(None) is an explicit null and clears the column
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("UPDATE actors SET updated_at = {}", NOW_SQL));
    if let Some(Some(v)) = req.first_name {
        qb.push(", first_name = ").push_bind(v);
    }
    if let Some(Some(v)) = req.last_name {
        qb.push(", last_name = ").push_bind(v);
    }
    if let Some(v) = date_of_birth {
        qb.push(", date_of_birth = ").push_bind(v.map(|d| d.format("%Y-%m-%d").to_string()));
    }
    if let Some(v) = req.nationality {
        qb.push(", nationality = ").push_bind(v);
    }
    if let Some(v) = req.biography {
        qb.push(", biography = ").push_bind(v);
    }
    if let Some(v) = req.photo_url {
        qb.push(", photo_url = ").push_bind(v);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.build().execute(&mut *tx).await?;

    if let Some(movie_ids) = &req.movie_ids {
        sqlx::query("DELETE FROM movie_actors WHERE actor_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_movies(&mut tx, id, movie_ids).await?;
    }
    tx.commit().await?;
    tracing::info!(actor_id = id, "actor updated");
    get(db, id).await
}

pub async fn delete(db: &SqlitePool, id: i64) -> AppResult<()> {
    let res = sqlx::query("DELETE FROM actors WHERE id = ?1").bind(id).execute(db).await?;
    if res.rows_affected() == 0 {
        return Err(not_found(id));
    }
    tracing::info!(actor_id = id, "actor deleted");
    Ok(())
}

/// Featured actors: complete profiles with at least one movie, ranked by the
/// average of all ratings across their movies.
pub async fn recent(db: &SqlitePool, limit: i64) -> AppResult<Vec<ActorDetail>> {
    let mut tx = db.begin().await?;
    let featured = recent_in(&mut tx, limit).await?;
    tx.commit().await?;
    Ok(featured)
}

/// [`recent`] on a caller-provided connection.
pub async fn recent_in(conn: &mut SqliteConnection, limit: i64) -> AppResult<Vec<ActorDetail>> {
    let rows: Vec<ActorRow> = sqlx::query_as(&format!(
        "SELECT {} FROM actors a WHERE {} ORDER BY a.id",
        ACTOR_COLUMNS, FEATURED_CANDIDATES
    ))
    .fetch_all(&mut *conn)
    .await?;
    let details = hydrate(&mut *conn, convert_rows(rows)?).await?;

    let mut movie_ids: Vec<i64> =
        details.iter().flat_map(|d| d.movies.iter().map(|m| m.id)).collect();
    movie_ids.sort_unstable();
    movie_ids.dedup();
    let ratings = movies::ratings_by_movie(conn, &movie_ids).await?;

    let candidates = details.into_iter().map(|detail| {
        let scores = detail
            .movies
            .iter()
            .filter_map(|m| ratings.get(&m.id))
            .flat_map(|rs| rs.iter().map(|r| r.score))
            .collect();
        ActorCandidate { detail, scores }
    });
    Ok(select_featured(candidates, limit)?.into_iter().map(|c| c.detail).collect())
}
