use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use server::routes::{self, ApiState};
use service::storage::file::FileStorage;
use service::storage::Storage;

struct TestApp {
    base_url: String,
}

/// Boot the router on an ephemeral port over a file store in a temp path.
async fn start_server() -> anyhow::Result<TestApp> {
    let path = std::env::temp_dir().join(format!("stay_api_flow_{}.json", Uuid::new_v4()));
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(path));
    storage.reload().await?;
    let state = ApiState { storage };

    let app: Router = routes::build_router(CorsLayer::very_permissive(), state);
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}/api/v1", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });

    Ok(TestApp { base_url })
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn timestamp(value: &Value, field: &str) -> chrono::DateTime<chrono::FixedOffset> {
    chrono::DateTime::parse_from_rfc3339(value[field].as_str().expect("timestamp string"))
        .expect("rfc3339 timestamp")
}

#[tokio::test]
async fn status_and_stats() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let res = c.get(format!("{}/status", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "OK");

    let res = c.get(format!("{}/stats", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let stats = res.json::<Value>().await?;
    for key in ["states", "cities", "users", "amenities", "places", "reviews"] {
        assert_eq!(stats[key], 0, "fresh store has no {key}");
    }
    Ok(())
}

#[tokio::test]
async fn state_crud_cycle() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    // body validation comes first
    let res = c.post(format!("{}/states", app.base_url)).json(&json!({})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["message"], "Missing name");

    // create
    let res = c
        .post(format!("{}/states", app.base_url))
        .json(&json!({"name": "California"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let created = res.json::<Value>().await?;
    assert_eq!(created["__class__"], "State");
    assert_eq!(created["name"], "California");
    let id = created["id"].as_str().expect("id").to_string();
    let created_at = timestamp(&created, "created_at");
    let first_updated_at = timestamp(&created, "updated_at");

    // read back, both as a collection and by id
    let res = c.get(format!("{}/states", app.base_url)).send().await?;
    let listed = res.json::<Vec<Value>>().await?;
    assert!(listed.iter().any(|s| s["id"] == created["id"]));

    let res = c.get(format!("{}/states/{}", app.base_url, id)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    // unknown and malformed ids are both 404s
    let res = c.get(format!("{}/states/{}", app.base_url, Uuid::new_v4())).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["error"], "Not Found");
    let res = c.get(format!("{}/states/not-a-uuid", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);

    // update refreshes updated_at
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let res = c
        .put(format!("{}/states/{}", app.base_url, id))
        .json(&json!({"name": "CA"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let updated = res.json::<Value>().await?;
    assert_eq!(updated["name"], "CA");
    assert_eq!(timestamp(&updated, "created_at"), created_at);
    assert!(timestamp(&updated, "updated_at") > first_updated_at);

    // immutable and unknown keys are rejected
    let res = c
        .put(format!("{}/states/{}", app.base_url, id))
        .json(&json!({"id": Uuid::new_v4()}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    let res = c
        .put(format!("{}/states/{}", app.base_url, id))
        .json(&json!({"nickname": "Cali"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);

    // delete, then the record is gone
    let res = c.delete(format!("{}/states/{}", app.base_url, id)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({}));
    let res = c.get(format!("{}/states/{}", app.base_url, id)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);

    // deleting again is a 404, not an error
    let res = c.delete(format!("{}/states/{}", app.base_url, id)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn nested_city_routes_validate_parent() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    // creating under an unknown state is a 404
    let res = c
        .post(format!("{}/states/{}/cities", app.base_url, Uuid::new_v4()))
        .json(&json!({"name": "Fresno"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);

    let state = c
        .post(format!("{}/states", app.base_url))
        .json(&json!({"name": "California"}))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let state_id = state["id"].as_str().expect("state id");

    let res = c
        .post(format!("{}/states/{}/cities", app.base_url, state_id))
        .json(&json!({"name": "Fresno"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let city = res.json::<Value>().await?;
    assert_eq!(city["__class__"], "City");
    assert_eq!(city["state_id"], state["id"]);

    let res = c.get(format!("{}/states/{}/cities", app.base_url, state_id)).send().await?;
    let cities = res.json::<Vec<Value>>().await?;
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0]["name"], "Fresno");
    Ok(())
}

#[tokio::test]
async fn user_creation_requires_credentials() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let res = c
        .post(format!("{}/users", app.base_url))
        .json(&json!({"email": "bob@example.com"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["message"], "Missing password");

    let res = c
        .post(format!("{}/users", app.base_url))
        .json(&json!({"email": "bob@example.com", "password": "pwd", "first_name": "Bob"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let user = res.json::<Value>().await?;
    assert_eq!(user["first_name"], "Bob");

    // email is immutable through updates
    let res = c
        .put(format!("{}/users/{}", app.base_url, user["id"].as_str().expect("id")))
        .json(&json!({"email": "eve@example.com"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn place_amenity_link_flow() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let state = c
        .post(format!("{}/states", app.base_url))
        .json(&json!({"name": "California"}))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let city = c
        .post(format!("{}/states/{}/cities", app.base_url, state["id"].as_str().expect("id")))
        .json(&json!({"name": "Fresno"}))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let user = c
        .post(format!("{}/users", app.base_url))
        .json(&json!({"email": "owner@example.com", "password": "pwd"}))
        .send()
        .await?
        .json::<Value>()
        .await?;

    let res = c
        .post(format!("{}/cities/{}/places", app.base_url, city["id"].as_str().expect("id")))
        .json(&json!({
            "user_id": user["id"],
            "name": "Loft",
            "number_rooms": 2,
            "price_by_night": 120
        }))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let place = res.json::<Value>().await?;
    assert_eq!(place["number_rooms"], 2);
    let place_id = place["id"].as_str().expect("place id");

    let amenity = c
        .post(format!("{}/amenities", app.base_url))
        .json(&json!({"name": "Wifi"}))
        .send()
        .await?
        .json::<Value>()
        .await?;
    let amenity_id = amenity["id"].as_str().expect("amenity id");

    // first link creates, second is an idempotent no-op
    let res = c
        .post(format!("{}/places/{}/amenities/{}", app.base_url, place_id, amenity_id))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    assert_eq!(res.json::<Value>().await?["id"], amenity["id"]);
    let res = c
        .post(format!("{}/places/{}/amenities/{}", app.base_url, place_id, amenity_id))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let res = c.get(format!("{}/places/{}/amenities", app.base_url, place_id)).send().await?;
    let linked = res.json::<Vec<Value>>().await?;
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0]["name"], "Wifi");

    // unlink, then unlinking again is a 404
    let res = c
        .delete(format!("{}/places/{}/amenities/{}", app.base_url, place_id, amenity_id))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let res = c
        .delete(format!("{}/places/{}/amenities/{}", app.base_url, place_id, amenity_id))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);

    // review flow against the same place
    let res = c
        .post(format!("{}/places/{}/reviews", app.base_url, place_id))
        .json(&json!({"user_id": user["id"], "text": "great stay"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);

    // stats reflect everything created above
    let stats = c.get(format!("{}/stats", app.base_url)).send().await?.json::<Value>().await?;
    assert_eq!(stats["states"], 1);
    assert_eq!(stats["cities"], 1);
    assert_eq!(stats["users"], 1);
    assert_eq!(stats["places"], 1);
    assert_eq!(stats["amenities"], 1);
    assert_eq!(stats["reviews"], 1);
    Ok(())
}
