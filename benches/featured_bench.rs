use std::hint::black_box;

use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use filmregal::catalog::movies;
use filmregal::db;
use filmregal::featured::{select_featured, DEFAULT_FEATURED_LIMIT};
use filmregal::types::{Actor, Movie, MovieDetail, Rating};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::runtime::Runtime;

fn candidates(n: usize) -> Vec<MovieDetail> {
    let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let id = i as i64 + 1;
            let created_at = base + Duration::minutes(id);
            let actor = Actor {
                id,
                first_name: "Lead".to_string(),
                last_name: format!("Actor {}", id),
                date_of_birth: None,
                nationality: Some("Canadian".to_string()),
                biography: Some("Bio".to_string()),
                photo_url: Some("https://img.example.org/a.jpg".to_string()),
                created_at,
                updated_at: created_at,
            };
            let ratings = (0..(i % 7))
                .map(|r| Rating {
                    id: id * 10 + r as i64,
                    score: ((i * 13 + r * 7) % 101) as f64 / 10.0,
                    review: None,
                    reviewer_name: None,
                    source: Some("User".to_string()),
                    movie_id: id,
                    created_at,
                    updated_at: created_at,
                })
                .collect();
            MovieDetail {
                movie: Movie {
                    id,
                    title: format!("Movie {}", id),
                    description: Some("Description".to_string()),
                    // every fifth movie misses its genre and is filtered out
                    genre: if i % 5 == 0 { None } else { Some("Drama".to_string()) },
                    release_year: Some(1990 + (i % 30) as i64),
                    duration: Some(110),
                    poster_url: Some("https://img.example.org/p.jpg".to_string()),
                    created_at,
                    updated_at: created_at,
                },
                actors: vec![actor],
                ratings,
            }
        })
        .collect()
}

fn benchmark_select_featured(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_featured");
    for size in [100usize, 1_000, 10_000] {
        let items = candidates(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| black_box(select_featured(items.clone(), DEFAULT_FEATURED_LIMIT).unwrap()))
        });
    }
    group.finish();
}

fn benchmark_recent_movies_query(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let pool = rt.block_on(async {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(db::connect_options("sqlite::memory:").unwrap())
            .await
            .unwrap();
        db::init_db(&pool).await.unwrap();
        sqlx::query("INSERT INTO actors (first_name, last_name) VALUES ('Lead', 'Actor')")
            .execute(&pool)
            .await
            .unwrap();
        for i in 1..=500i64 {
            sqlx::query(
                "INSERT INTO movies (title, description, genre, release_year, poster_url)
                 VALUES (?1, 'Description', 'Drama', 2000, 'https://img.example.org/p.jpg')",
            )
            .bind(format!("Movie {}", i))
            .execute(&pool)
            .await
            .unwrap();
            sqlx::query("INSERT INTO movie_actors (movie_id, actor_id) VALUES (?1, 1)")
                .bind(i)
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO ratings (score, movie_id) VALUES (?1, ?2)")
                .bind((i % 101) as f64 / 10.0)
                .bind(i)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    });

    c.bench_function("recent_movies_500", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(movies::recent(&pool, DEFAULT_FEATURED_LIMIT).await.unwrap())
            })
        })
    });
}

criterion_group!(benches, benchmark_select_featured, benchmark_recent_movies_query);
criterion_main!(benches);
