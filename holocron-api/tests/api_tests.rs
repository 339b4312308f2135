//! Integration tests for holocron-api endpoints
//!
//! Each test builds the router over a fresh in-memory database seeded
//! through the common query layer.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use holocron_api::{build_router, AppState};
use holocron_common::db::{init_database, species, starships};
use holocron_common::{Category, Lineage, Species, Starship};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

async fn setup_test_db() -> SqlitePool {
    init_database("sqlite::memory:")
        .await
        .expect("Should open in-memory database")
}

fn setup_app(db: SqlitePool) -> axum::Router {
    build_router(AppState::new(db))
}

fn test_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn species_record(slug: &str, name: &str) -> Species {
    Species {
        slug: slug.to_string(),
        name: name.to_string(),
        classification: Some("Mammal".to_string()),
        homeworld: None,
        description: None,
        properties: json!({ "languages": "Basic" }),
        image_url: None,
        created_at: None,
    }
}

async fn seed_starship(db: &SqlitePool, slug: &str, name: &str, category: Category, parent: Option<&str>) {
    let mut ship = Starship::new(slug, name, category);
    if let Some(parent) = parent {
        ship.set_lineage(&Lineage::variant_of(parent));
    }
    starships::upsert_starship(db, &ship, false).await.unwrap();
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(test_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "holocron-api");
    assert!(body["version"].is_string());
}

// =============================================================================
// Species
// =============================================================================

#[tokio::test]
async fn test_list_species_ordered_by_name() {
    let db = setup_test_db().await;
    species::upsert_species(&db, &species_record("wookiee", "Wookiee")).await.unwrap();
    species::upsert_species(&db, &species_record("bothan", "Bothan")).await.unwrap();

    let response = setup_app(db).oneshot(test_request("/species")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["slug"], "bothan");
    assert_eq!(rows[1]["name"], "Wookiee");
    assert_eq!(rows[0]["properties"]["languages"], "Basic");
    assert!(rows[0].get("imageUrl").is_some());
}

#[tokio::test]
async fn test_list_species_capped_at_1000() {
    let db = setup_test_db().await;
    for i in 0..1005 {
        let slug = format!("species-{:04}", i);
        species::upsert_species(&db, &species_record(&slug, &slug)).await.unwrap();
    }

    let response = setup_app(db).oneshot(test_request("/species")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1000);
}

#[tokio::test]
async fn test_get_species_by_slug() {
    let db = setup_test_db().await;
    species::upsert_species(&db, &species_record("twi-lek", "Twi'lek")).await.unwrap();

    let response = setup_app(db).oneshot(test_request("/species/twi-lek")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["name"], "Twi'lek");
    assert_eq!(body["classification"], "Mammal");
}

#[tokio::test]
async fn test_get_species_not_found() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(test_request("/species/unknown-slug")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "error": "not_found" }));
}

#[tokio::test]
async fn test_store_failure_is_opaque_internal_error() {
    let db = setup_test_db().await;
    let app = setup_app(db.clone());
    db.close().await;

    let response = app.oneshot(test_request("/species")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "error": "internal" }));
}

// =============================================================================
// Starships
// =============================================================================

#[tokio::test]
async fn test_list_starships_category_filter() {
    let db = setup_test_db().await;
    seed_starship(&db, "x-wing", "X-Wing", Category::Starfighter, None).await;
    seed_starship(&db, "yt-1300", "YT-1300", Category::Transport, None).await;

    let app = setup_app(db);

    let response = app.clone().oneshot(test_request("/starships?category=transport")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["slug"], "yt-1300");
    assert_eq!(rows[0]["category"], "transport");
    assert_eq!(rows[0]["isVariant"], false);

    let response = app.oneshot(test_request("/starships")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_category_is_bad_request() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(test_request("/starships?category=walker")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "error": "bad_request" }));
}

#[tokio::test]
async fn test_get_starship_and_not_found() {
    let db = setup_test_db().await;
    seed_starship(&db, "tie-interceptor", "TIE Interceptor", Category::Starfighter, Some("TIE Fighter")).await;
    let app = setup_app(db);

    let response = app.clone().oneshot(test_request("/starships/tie-interceptor")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["parent"], "TIE Fighter");
    assert_eq!(body["isVariant"], true);

    let response = app.oneshot(test_request("/starships/tie-phantom")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_families_grouping() {
    let db = setup_test_db().await;
    seed_starship(&db, "tie-fighter", "TIE Fighter", Category::Starfighter, None).await;
    seed_starship(&db, "tie-interceptor", "TIE Interceptor", Category::Starfighter, Some("TIE Fighter")).await;
    seed_starship(&db, "btl-a4-y-wing", "BTL-A4 Y-Wing", Category::Starfighter, Some("Y-Wing")).await;
    seed_starship(&db, "btl-s3-y-wing", "BTL-S3 Y-Wing", Category::Starfighter, Some("Y-Wing")).await;
    seed_starship(&db, "lambda", "Lambda-class Shuttle", Category::Transport, None).await;

    let response = setup_app(db)
        .oneshot(test_request("/starships/families?category=starfighter"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0]["key"], "tie-fighter");
    assert_eq!(entries[0]["synthetic"], false);
    assert_eq!(entries[0]["variants"].as_array().unwrap().len(), 1);

    assert_eq!(entries[1]["key"], "family-y-wing");
    assert_eq!(entries[1]["synthetic"], true);
    assert_eq!(entries[1]["record"]["name"], "Y-Wing");
    assert_eq!(entries[1]["record"]["isVariant"], false);
    assert_eq!(entries[1]["variants"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_families_without_category_group_per_category() {
    let db = setup_test_db().await;
    seed_starship(&db, "lambda", "Lambda", Category::Starfighter, None).await;
    seed_starship(&db, "lambda-t4a", "Lambda T-4a", Category::Transport, Some("Lambda")).await;

    let response = setup_app(db)
        .oneshot(test_request("/starships/families"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    assert_eq!(entries[0]["key"], "lambda");
    assert!(entries[0]["variants"].as_array().unwrap().is_empty());

    assert_eq!(entries[1]["key"], "family-lambda");
    assert_eq!(entries[1]["synthetic"], true);
    assert_eq!(entries[1]["record"]["category"], "transport");
    assert_eq!(entries[1]["variants"][0]["slug"], "lambda-t4a");
}
