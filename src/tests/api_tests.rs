use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};

use super::{delete, get, patch, post, send, test_app, test_state, TEST_KEY};

async fn create_actor(app: &Router, first: &str, last: &str, movie_ids: &[i64]) -> i64 {
    let (status, body) = post(
        app,
        "/actors",
        json!({
            "firstName": first,
            "lastName": last,
            "dateOfBirth": "1970-05-17",
            "nationality": "American",
            "biography": format!("{} {} is an actor.", first, last),
            "photoUrl": "https://img.example.org/actor.jpg",
            "movieIds": movie_ids,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn create_movie(app: &Router, title: &str, actor_ids: &[i64]) -> i64 {
    let (status, body) = post(
        app,
        "/movies",
        json!({
            "title": title,
            "description": format!("About {}", title),
            "genre": "Drama",
            "releaseYear": 2001,
            "duration": 120,
            "posterUrl": "https://img.example.org/poster.jpg",
            "actorIds": actor_ids,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_i64().unwrap()
}

async fn rate(app: &Router, movie_id: i64, score: f64) {
    let (status, body) =
        post(app, "/ratings", json!({ "score": score, "movieId": movie_id })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array().unwrap().iter().map(|v| v["id"].as_i64().unwrap()).collect()
}

#[tokio::test]
async fn test_writes_require_api_key() {
    let (app, _) = test_app().await;
    let body = json!({ "title": "Heat" });

    let (status, err) = send(&app, Method::POST, "/movies", Some(body.clone()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"]["message"], "Invalid API key");

    let (status, _) = send(&app, Method::POST, "/movies", Some(body.clone()), Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/movies", Some(body), Some(TEST_KEY)).await;
    assert_eq!(status, StatusCode::CREATED);

    // reads stay open
    let (status, _) = get(&app, "/movies").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_x_api_key_header_is_accepted() {
    let (app, _) = test_app().await;
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/movies")
        .header("content-type", "application/json")
        .header("x-api-key", TEST_KEY)
        .body(axum::body::Body::from(json!({ "title": "Ronin" }).to_string()))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_writes_rejected_without_configured_secret() {
    let app = crate::routes::router(test_state(None).await);
    let body = json!({ "title": "Heat" });
    let (status, _) = send(&app, Method::POST, "/movies", Some(body.clone()), Some("")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::POST, "/movies", Some(body), Some("anything")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_movie_crud_with_cast() {
    let (app, state) = test_app().await;
    let actor = create_actor(&app, "Al", "Pacino", &[]).await;
    // unknown actor ids are skipped
    let movie = create_movie(&app, "Heat", &[actor, 999]).await;

    let (status, body) = get(&app, &format!("/movies/{}", movie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Heat");
    assert_eq!(body["releaseYear"], 2001);
    assert_eq!(ids(&body["actors"]), vec![actor]);
    assert!(body["ratings"].as_array().unwrap().is_empty());

    let (status, cast) = get(&app, &format!("/movies/{}/actors", movie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cast[0]["lastName"], "Pacino");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/movies/{}", movie),
        Some(json!({ "title": "Heat (1995)", "actorIds": [] })),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Heat (1995)");
    assert_eq!(body["genre"], "Drama");
    assert!(body["actors"].as_array().unwrap().is_empty());

    let (status, body) = delete(&app, &format!("/movies/{}", movie)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = get(&app, &format!("/movies/{}", movie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], format!("Movie with ID {} not found", movie));

    let (status, _) = delete(&app, &format!("/movies/{}", movie)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let snap = state.metrics.get_snapshot();
    assert_eq!(snap.movies_created, 1);
    assert_eq!(snap.actors_created, 1);
    assert_eq!(snap.records_deleted, 1);
}

#[tokio::test]
async fn test_movie_list_pagination_and_search() {
    let (app, _) = test_app().await;
    let first = create_movie(&app, "Heat", &[]).await;
    let second = create_movie(&app, "Collateral", &[]).await;
    let third = create_movie(&app, "The Insider", &[]).await;

    let (status, page) = get(&app, "/movies?page=1&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["hasMore"], true);
    assert_eq!(ids(&page["items"]), vec![third, second]);
    assert_eq!(page["items"], page["movies"]);

    let (_, page) = get(&app, "/movies?page=2&limit=2").await;
    assert_eq!(ids(&page["items"]), vec![first]);
    assert_eq!(page["hasMore"], false);

    let (_, page) = get(&app, "/movies?search=COLLAT").await;
    assert_eq!(ids(&page["items"]), vec![second]);
    assert_eq!(page["total"], 1);

    // wildcard and regex characters are matched literally
    let (_, page) = get(&app, "/movies?search=%25").await;
    assert_eq!(page["total"], 0);
    let (_, page) = get(&app, "/movies?search=.").await;
    assert_eq!(page["total"], 0);

    let (status, _) = get(&app, "/movies?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/movies?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_payloads_are_bad_requests() {
    let (app, _) = test_app().await;

    let (status, body) = post(&app, "/movies", json!({ "title": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["field"], "title");

    let (status, _) = post(&app, "/movies", json!({ "title": "Heat", "budget": 60 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        post(&app, "/movies", json!({ "title": "Heat", "posterUrl": "ftp://x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/actors",
        json!({ "firstName": "Val", "lastName": "Kilmer", "dateOfBirth": "31/12/1959" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&app, "/movies/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ratings_and_average() {
    let (app, _) = test_app().await;
    let movie = create_movie(&app, "Heat", &[]).await;
    let unrated = create_movie(&app, "Thief", &[]).await;

    let (status, body) = post(&app, "/ratings", json!({ "score": 8.0, "movieId": 4242 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Movie with ID 4242 not found");

    let (status, _) = post(&app, "/ratings", json!({ "score": 10.5, "movieId": movie })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    rate(&app, movie, 8.0).await;
    rate(&app, movie, 7.5).await;

    let (status, avg) = get(&app, &format!("/ratings/movie/{}/average", movie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(avg, json!({ "average": 7.8, "count": 2 }));

    let (_, avg) = get(&app, &format!("/ratings/movie/{}/average", unrated)).await;
    assert_eq!(avg, json!({ "average": null, "count": 0 }));

    let (_, list) = get(&app, &format!("/ratings/movie/{}", movie)).await;
    let rating_ids = ids(&list);
    assert_eq!(rating_ids.len(), 2);

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &format!("/ratings/{}", rating_ids[0]),
        Some(json!({ "score": 9.0, "review": "Holds up" })),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["score"], 9.0);
    assert_eq!(updated["movieId"], movie);

    // movieId is not updatable
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/ratings/{}", rating_ids[0]),
        Some(json!({ "movieId": unrated })),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = delete(&app, &format!("/ratings/{}", rating_ids[1])).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, all) = get(&app, "/ratings").await;
    assert_eq!(ids(&all), vec![rating_ids[0]]);
}

#[tokio::test]
async fn test_deleting_movie_cascades_ratings() {
    let (app, _) = test_app().await;
    let movie = create_movie(&app, "Heat", &[]).await;
    rate(&app, movie, 9.0).await;

    let (status, _) = delete(&app, &format!("/movies/{}", movie)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = get(&app, &format!("/ratings/movie/{}", movie)).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_recent_movies_ranks_eligible_by_mean() {
    let (app, _) = test_app().await;
    let actor = create_actor(&app, "Robert", "De Niro", &[]).await;
    let a = create_movie(&app, "A", &[actor]).await;
    let b = create_movie(&app, "B", &[actor]).await;
    let c = create_movie(&app, "C", &[actor]).await;
    let uncast = create_movie(&app, "Uncast", &[]).await;

    // C loses its poster and is no longer eligible
    let uri = format!("/movies/{}", c);
    let (status, _) = patch(&app, &uri, json!({ "posterUrl": "https://img.example.org/ " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = patch(&app, &uri, json!({ "description": "   " })).await;
    assert_eq!(status, StatusCode::OK);

    rate(&app, a, 9.0).await;
    rate(&app, b, 7.0).await;
    rate(&app, b, 8.0).await;
    rate(&app, c, 10.0).await;
    rate(&app, uncast, 10.0).await;

    let (status, featured) = get(&app, "/movies/recent?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&featured), vec![a, b]);

    let (_, featured) = get(&app, "/movies/recent").await;
    assert_eq!(ids(&featured), vec![a, b]);

    let (status, body) = get(&app, "/movies/recent?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "limit");
}

#[tokio::test]
async fn test_recent_movies_tie_break_by_creation_time() {
    let (app, state) = test_app().await;
    let actor = create_actor(&app, "Ashley", "Judd", &[]).await;
    let first = create_movie(&app, "First", &[actor]).await;
    let second = create_movie(&app, "Second", &[actor]).await;
    let third = create_movie(&app, "Third", &[actor]).await;
    for (id, ts) in [
        (first, "2024-01-03T00:00:00.000Z"),
        (second, "2024-01-01T00:00:00.000Z"),
        (third, "2024-01-02T00:00:00.000Z"),
    ] {
        sqlx::query("UPDATE movies SET created_at = ?1 WHERE id = ?2")
            .bind(ts)
            .bind(id)
            .execute(&state.db)
            .await
            .unwrap();
    }

    // unrated movies all score 0
    let (_, featured) = get(&app, "/movies/recent?limit=6").await;
    assert_eq!(ids(&featured), vec![first, third, second]);

    rate(&app, second, 0.5).await;
    let (_, featured) = get(&app, "/movies/recent?limit=2").await;
    assert_eq!(ids(&featured), vec![second, first]);
}

#[tokio::test]
async fn test_recent_actors_use_ratings_across_filmography() {
    let (app, state) = test_app().await;
    let strong = create_movie(&app, "Strong", &[]).await;
    let weak = create_movie(&app, "Weak", &[]).await;
    rate(&app, strong, 9.0).await;
    rate(&app, weak, 6.0).await;

    let star = create_actor(&app, "Star", "Player", &[strong]).await;
    let mixed = create_actor(&app, "Mixed", "Bag", &[strong, weak]).await;
    let _idle = create_actor(&app, "No", "Roles", &[]).await;
    let no_photo = create_actor(&app, "No", "Photo", &[strong]).await;
    sqlx::query("UPDATE actors SET photo_url = NULL WHERE id = ?1")
        .bind(no_photo)
        .execute(&state.db)
        .await
        .unwrap();

    let (status, featured) = get(&app, "/actors/recent").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&featured), vec![star, mixed]);
    assert_eq!(ids(&featured[1]["movies"]), vec![strong, weak]);
    assert_eq!(state.metrics.get_snapshot().featured_queries, 1);
}

#[tokio::test]
async fn test_actor_crud_and_filmography() {
    let (app, _) = test_app().await;
    let movie = create_movie(&app, "Heat", &[]).await;
    let actor = create_actor(&app, "Val", "Kilmer", &[movie]).await;

    let (status, body) = get(&app, &format!("/actors/{}", actor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dateOfBirth"], "1970-05-17");
    assert_eq!(ids(&body["movies"]), vec![movie]);

    let (_, films) = get(&app, &format!("/actors/{}/movies", actor)).await;
    assert_eq!(films[0]["title"], "Heat");
    assert_eq!(ids(&films[0]["actors"]), vec![actor]);

    let (_, found) = get(&app, "/actors?search=val%20kil").await;
    assert_eq!(ids(&found), vec![actor]);
    let (_, found) = get(&app, "/actors?search=nobody").await;
    assert!(found.as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/actors/{}", actor),
        Some(json!({ "nationality": "Welsh", "movieIds": [] })),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nationality"], "Welsh");
    assert!(body["movies"].as_array().unwrap().is_empty());

    let (status, _) = delete(&app, &format!("/actors/{}", actor)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = get(&app, &format!("/actors/{}/movies", actor)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_combined_search() {
    let (app, state) = test_app().await;
    let heat = create_movie(&app, "Heat", &[]).await;
    create_movie(&app, "Ronin", &[]).await;
    let actor = create_actor(&app, "Heath", "Ledger", &[]).await;

    let (status, results) = get(&app, "/search?q=heat").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&results["movies"]), vec![heat]);
    assert_eq!(ids(&results["actors"]), vec![actor]);
    assert_eq!(state.metrics.get_snapshot().search_queries, 1);

    let (status, _) = get(&app, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&app, "/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_seeding_clear() {
    let (app, _) = test_app().await;
    let actor = create_actor(&app, "Jon", "Voight", &[]).await;
    let movie = create_movie(&app, "Heat", &[actor]).await;
    rate(&app, movie, 8.0).await;

    let (status, _) = send(&app, Method::DELETE, "/seeding/clear", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::DELETE, "/seeding/clear", None, Some(TEST_KEY)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, page) = get(&app, "/movies").await;
    assert_eq!(page["total"], 0);
    let (_, actors) = get(&app, "/actors").await;
    assert!(actors.as_array().unwrap().is_empty());
    let (_, ratings) = get(&app, "/ratings").await;
    assert!(ratings.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_query_and_path_return_json_errors() {
    let (app, _) = test_app().await;

    for uri in ["/movies?limit=abc", "/movies/recent?limit=abc", "/actors/recent?limit=1.5"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["code"], "BAD_REQUEST", "{}", uri);
        assert_eq!(body["status"], 400);
        assert!(!body["error"]["message"].as_str().unwrap().is_empty(), "{}", body);
    }

    for uri in ["/movies/abc", "/actors/abc/movies", "/ratings/movie/x/average"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["code"], "BAD_REQUEST", "{}", uri);
    }

    let (status, body) = delete(&app, "/ratings/1e3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_patch_null_clears_optional_fields() {
    let (app, _) = test_app().await;
    let movie = create_movie(&app, "Heat", &[]).await;
    let uri = format!("/movies/{}", movie);

    let (status, body) = patch(&app, &uri, json!({ "description": null, "duration": null })).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["description"], Value::Null);
    assert_eq!(body["duration"], Value::Null);
    // absent fields keep their value
    assert_eq!(body["genre"], "Drama");
    assert_eq!(body["releaseYear"], 2001);

    let (status, body) = patch(&app, &uri, json!({ "title": null })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "title");
    let (_, body) = get(&app, &uri).await;
    assert_eq!(body["title"], "Heat");

    let actor = create_actor(&app, "Val", "Kilmer", &[]).await;
    let (status, body) = patch(
        &app,
        &format!("/actors/{}", actor),
        json!({ "dateOfBirth": null, "biography": null, "photoUrl": null }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["dateOfBirth"], Value::Null);
    assert_eq!(body["biography"], Value::Null);
    assert_eq!(body["photoUrl"], Value::Null);
    assert_eq!(body["nationality"], "American");
    let (status, _) = patch(&app, &format!("/actors/{}", actor), json!({ "lastName": null })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    rate(&app, movie, 7.0).await;
    let (_, list) = get(&app, &format!("/ratings/movie/{}", movie)).await;
    let rating_uri = format!("/ratings/{}", ids(&list)[0]);
    let (status, _) = patch(&app, &rating_uri, json!({ "review": "Tense" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = patch(&app, &rating_uri, json!({ "review": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["review"], Value::Null);
    assert_eq!(body["score"], 7.0);
    let (status, _) = patch(&app, &rating_uri, json!({ "score": null })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_folds_case_beyond_ascii() {
    let (app, _) = test_app().await;
    let movie = create_movie(&app, "Élan Vital", &[]).await;
    create_movie(&app, "Elan", &[]).await;
    let actor = create_actor(&app, "Zoë", "Ångström", &[]).await;

    // "Élan" and "élan"
    for term in ["%C3%89lan", "%C3%A9lan", "%C3%89LAN%20VITAL"] {
        let (status, page) = get(&app, &format!("/movies?search={}", term)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 1, "{}", term);
        assert_eq!(ids(&page["items"]), vec![movie]);
    }

    // "ångström"
    let (_, found) = get(&app, "/actors?search=%C3%A5ngstr%C3%B6m").await;
    assert_eq!(ids(&found), vec![actor]);

    // "ZOË"
    let (status, results) = get(&app, "/search?q=ZO%C3%8B").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&results["actors"]), vec![actor]);
}
