use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;

/// SQLite expression producing an RFC 3339 UTC timestamp with millisecond precision.
pub const NOW_SQL: &str = "strftime('%Y-%m-%dT%H:%M:%fZ','now')";

/// Connection options for every pool of the catalog. `REGEXP` backs the
/// case-insensitive search in [`crate::catalog::search`].
pub fn connect_options(url: &str) -> anyhow::Result<SqliteConnectOptions> {
    Ok(SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(10))
        .with_regexp())
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Rating and cast cleanup rely on cascading deletes
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }

    sqlx::query(&format!(
        r#"CREATE TABLE IF NOT EXISTS movies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NULL,
            genre TEXT NULL,
            release_year INTEGER NULL,
            duration INTEGER NULL,
            poster_url TEXT NULL,
            created_at TEXT NOT NULL DEFAULT ({now}),
            updated_at TEXT NOT NULL DEFAULT ({now})
        )"#,
        now = NOW_SQL
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"CREATE TABLE IF NOT EXISTS actors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            date_of_birth TEXT NULL,
            nationality TEXT NULL,
            biography TEXT NULL,
            photo_url TEXT NULL,
            created_at TEXT NOT NULL DEFAULT ({now}),
            updated_at TEXT NOT NULL DEFAULT ({now})
        )"#,
        now = NOW_SQL
    ))
    .execute(pool)
    .await?;

    // cast links (many-to-many)
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS movie_actors (
            movie_id INTEGER NOT NULL,
            actor_id INTEGER NOT NULL,
            PRIMARY KEY (movie_id, actor_id),
            FOREIGN KEY(movie_id) REFERENCES movies(id) ON DELETE CASCADE,
            FOREIGN KEY(actor_id) REFERENCES actors(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"CREATE TABLE IF NOT EXISTS ratings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            score REAL NOT NULL CHECK (score >= 0.0 AND score <= 10.0),
            review TEXT NULL,
            reviewer_name TEXT NULL,
            source TEXT NULL,
            movie_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT ({now}),
            updated_at TEXT NOT NULL DEFAULT ({now}),
            FOREIGN KEY(movie_id) REFERENCES movies(id) ON DELETE CASCADE
        )"#,
        now = NOW_SQL
    ))
    .execute(pool)
    .await?;

    let indexes = [
        (
            "idx_movie_actors_actor",
            "CREATE INDEX IF NOT EXISTS idx_movie_actors_actor ON movie_actors(actor_id)",
        ),
        ("idx_ratings_movie", "CREATE INDEX IF NOT EXISTS idx_ratings_movie ON ratings(movie_id)"),
        (
            "idx_movies_created",
            "CREATE INDEX IF NOT EXISTS idx_movies_created ON movies(created_at DESC)",
        ),
        (
            "idx_actors_created",
            "CREATE INDEX IF NOT EXISTS idx_actors_created ON actors(created_at DESC)",
        ),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) => {
                    let msg = db_err.message().to_lowercase();
                    if msg.contains("already exists") || msg.contains("duplicate") {
                        tracing::debug!("Index {} already exists, skipping", name);
                    } else {
                        tracing::warn!("Failed to create index {}: {}", name, e);
                    }
                }
                _ => {
                    tracing::warn!("Failed to create index {}: {}", name, e);
                }
            }
        }
    }

    Ok(())
}
