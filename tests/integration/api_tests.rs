//! API integration tests
//!
//! These drive a running server. Start it with a fresh database and
//! LORASHELF_ADMIN_USERNAME=librarian, LORASHELF_ADMIN_EMAIL=librarian@example.com,
//! LORASHELF_ADMIN_PASSWORD=librarian-password, then run:
//! cargo test -- --ignored

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const LIBRARIAN_LOGIN: &str = "librarian";
const LIBRARIAN_PASSWORD: &str = "librarian-password";

async fn login(client: &Client, login: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": login, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn librarian_token(client: &Client) -> String {
    login(client, LIBRARIAN_LOGIN, LIBRARIAN_PASSWORD).await
}

/// Register a fresh patron and return its token
async fn patron_token(client: &Client) -> String {
    let username = format!("patron{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let password = "patron-password";

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password
        }))
        .send()
        .await
        .expect("Failed to register patron");
    assert_eq!(response.status(), StatusCode::CREATED);

    login(client, &username, password).await
}

async fn create_lora(client: &Client, token: &str, title: &str) -> i64 {
    let response = client
        .post(format!("{}/loras", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "title": title, "description": "integration test" }))
        .send()
        .await
        .expect("Failed to create LoRA");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse LoRA");
    body["id"].as_i64().expect("No LoRA id")
}

async fn create_collection(client: &Client, token: &str, visibility: &str) -> i64 {
    let response = client
        .post(format!("{}/collections", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "title": "Integration", "visibility": visibility }))
        .send()
        .await
        .expect("Failed to create collection");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse collection");
    body["id"].as_i64().expect("No collection id")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": LIBRARIAN_LOGIN, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_patron_cannot_create_lora() {
    let client = Client::new();
    let token = patron_token(&client).await;

    let response = client
        .post(format!("{}/loras", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "title": "Nope" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_patron_cannot_create_private_collection() {
    let client = Client::new();
    let token = patron_token(&client).await;

    let response = client
        .post(format!("{}/collections", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "title": "Secret", "visibility": "private" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_private_collection_access_request_flow() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let patron = patron_token(&client).await;

    let collection_id = create_collection(&client, &librarian, "private").await;

    // Patron cannot see the contents yet
    let response = client
        .get(format!("{}/collections/{}", BASE_URL, collection_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Anonymous visitors are refused too
    let response = client
        .get(format!("{}/collections/{}", BASE_URL, collection_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // File a request, a second one conflicts
    let response = client
        .post(format!("{}/collections/{}/access-requests", BASE_URL, collection_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let request: Value = response.json().await.expect("Failed to parse request");
    let request_id = request["id"].as_i64().expect("No request id");

    let response = client
        .post(format!("{}/collections/{}/access-requests", BASE_URL, collection_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Librarian approves
    let response = client
        .post(format!("{}/access-requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Now the patron gets in
    let response = client
        .get(format!("{}/collections/{}", BASE_URL, collection_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Approving again is refused
    let response = client
        .post(format!("{}/access-requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn test_lora_in_private_collection_is_exclusive() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;

    let lora_id = create_lora(&client, &librarian, "Exclusive").await;
    let private_id = create_collection(&client, &librarian, "private").await;
    let public_id = create_collection(&client, &librarian, "public").await;

    let response = client
        .post(format!("{}/collections/{}/loras/{}", BASE_URL, private_id, lora_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .post(format!("{}/collections/{}/loras/{}", BASE_URL, public_id, lora_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Hidden from anonymous LoRA detail
    let response = client
        .get(format!("{}/loras/{}", BASE_URL, lora_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_borrow_lifecycle() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let patron = patron_token(&client).await;

    let lora_id = create_lora(&client, &librarian, "Borrowable").await;

    // A due date in the past is rejected
    let response = client
        .post(format!("{}/loras/{}/borrow", BASE_URL, lora_id))
        .bearer_auth(&patron)
        .json(&json!({ "due_date": Utc::now() - Duration::hours(1) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/loras/{}/borrow", BASE_URL, lora_id))
        .bearer_auth(&patron)
        .json(&json!({ "due_date": Utc::now() + Duration::days(3) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    let request_id = body["request"]["id"].as_i64().expect("No request id");

    // Asking again updates the pending request
    let response = client
        .post(format!("{}/loras/{}/borrow", BASE_URL, lora_id))
        .bearer_auth(&patron)
        .json(&json!({ "due_date": Utc::now() + Duration::days(5) }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["created"], false);
    assert_eq!(body["request"]["id"].as_i64(), Some(request_id));

    // Approve twice: same borrowed record
    let mut borrowed_ids = Vec::new();
    for expected_repeat in [false, true] {
        let response = client
            .post(format!("{}/borrow-requests/{}/approve", BASE_URL, request_id))
            .bearer_auth(&librarian)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["already_approved"], expected_repeat);
        borrowed_ids.push(body["borrowed"]["id"].as_i64().expect("No borrowed id"));
    }
    assert_eq!(borrowed_ids[0], borrowed_ids[1]);
    let borrowed_id = borrowed_ids[0];

    // Denying an approved request is refused
    let response = client
        .post(format!("{}/borrow-requests/{}/deny", BASE_URL, request_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Return twice: second is a no-op
    for expected in ["returned", "already_returned"] {
        let response = client
            .post(format!("{}/borrowed/{}/return", BASE_URL, borrowed_id))
            .bearer_auth(&patron)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["outcome"], expected);
    }

    // LoRA is checked in again
    let response = client
        .get(format!("{}/loras/{}", BASE_URL, lora_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "checked_in");
}

#[tokio::test]
#[ignore]
async fn test_rating_and_like() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let patron = patron_token(&client).await;

    let lora_id = create_lora(&client, &librarian, "Rated").await;

    let response = client
        .post(format!("{}/loras/{}/rate", BASE_URL, lora_id))
        .bearer_auth(&patron)
        .json(&json!({ "rating": 6 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/loras/{}/rate", BASE_URL, lora_id))
        .bearer_auth(&patron)
        .json(&json!({ "rating": 4 }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["average"].as_f64(), Some(4.0));

    let response = client
        .post(format!("{}/loras/{}/like", BASE_URL, lora_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["liked"], true);
    assert_eq!(body["like_count"], 1);
}

#[tokio::test]
#[ignore]
async fn test_collection_with_shared_lora_cannot_turn_private() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;

    let lora_id = create_lora(&client, &librarian, "Shared").await;
    let first = create_collection(&client, &librarian, "public").await;
    let second = create_collection(&client, &librarian, "public").await;

    for collection_id in [first, second] {
        let response = client
            .post(format!("{}/collections/{}/loras/{}", BASE_URL, collection_id, lora_id))
            .bearer_auth(&librarian)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = client
        .put(format!("{}/collections/{}", BASE_URL, first))
        .bearer_auth(&librarian)
        .json(&json!({ "visibility": "private" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Once the LoRA leaves the other collection the switch goes through
    let response = client
        .delete(format!("{}/collections/{}/loras/{}", BASE_URL, second, lora_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .put(format!("{}/collections/{}", BASE_URL, first))
        .bearer_auth(&librarian)
        .json(&json!({ "visibility": "private" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["visibility"], "private");
}

#[tokio::test]
#[ignore]
async fn test_status_is_locked_while_borrowed() {
    let client = Client::new();
    let librarian = librarian_token(&client).await;
    let patron = patron_token(&client).await;

    let lora_id = create_lora(&client, &librarian, "Lent out").await;

    let response = client
        .post(format!("{}/loras/{}/borrow", BASE_URL, lora_id))
        .bearer_auth(&patron)
        .json(&json!({ "due_date": Utc::now() + Duration::days(2) }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let request_id = body["request"]["id"].as_i64().expect("No request id");

    let response = client
        .post(format!("{}/borrow-requests/{}/approve", BASE_URL, request_id))
        .bearer_auth(&librarian)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let borrowed_id = body["borrowed"]["id"].as_i64().expect("No borrowed id");

    let response = client
        .put(format!("{}/loras/{}/status", BASE_URL, lora_id))
        .bearer_auth(&librarian)
        .json(&json!({ "status": "checked_in" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = client
        .post(format!("{}/borrowed/{}/return", BASE_URL, borrowed_id))
        .bearer_auth(&patron)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .put(format!("{}/loras/{}/status", BASE_URL, lora_id))
        .bearer_auth(&librarian)
        .json(&json!({ "status": "being_repaired" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}
