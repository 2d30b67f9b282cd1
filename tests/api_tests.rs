//! API integration tests

mod common;

use common::*;
use reqwest::Client;
use serde_json::{json, Value};

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
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin123"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["access_token"].is_string());
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_register_and_get_current_user() {
    let client = Client::new();
    let (user_id, token) = register_reader(&client).await;

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"].as_i64(), Some(user_id));
    assert_eq!(body["role"], "user");
    // Password hashes never leave the server
    assert!(body.get("hashed_password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_register_duplicate_username_conflicts() {
    let client = Client::new();
    let username = unique("dup");

    let payload = json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "secret1",
    });

    let first = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status(), 201);

    let second = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_books_are_public_but_borrowings_are_not() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/borrowings", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_book_crud() {
    let client = Client::new();
    let token = admin_token(&client).await;

    // Create
    let isbn = unique("978-");
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "The Left Hand of Darkness",
            "author": "Ursula K. Le Guin",
            "isbn": isbn,
            "published_year": 1969,
            "quantity": 3
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse response");
    let book_id = book["id"].as_i64().expect("No book ID");
    assert_eq!(book["available"].as_i64(), Some(3));

    // Duplicate ISBN is refused
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": "Another Edition",
            "author": "Ursula K. Le Guin",
            "isbn": isbn,
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Update
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "quantity": 5 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    let updated: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(updated["quantity"].as_i64(), Some(5));
    assert_eq!(updated["available"].as_i64(), Some(5));

    // Delete
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_create_book_rejects_invalid_payload() {
    let client = Client::new();
    let token = admin_token(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "title": "", "author": "Nobody", "quantity": 0 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_catalog_mutations_require_admin() {
    let client = Client::new();
    let (_, reader) = register_reader(&client).await;
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    // Payload validity does not matter, the role gate comes first
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", reader))
        .json(&json!({ "title": "Smuggled", "author": "Nobody" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader))
        .json(&json!({ "quantity": 99 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_user_management_requires_admin() {
    let client = Client::new();
    let (_, reader) = register_reader(&client).await;

    let response = client
        .get(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let admin = admin_token(&client).await;
    let response = client
        .get(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_deactivated_user_is_rejected() {
    let client = Client::new();
    let (user_id, reader) = register_reader(&client).await;
    let admin = admin_token(&client).await;

    let response = client
        .put(format!("{}/users/{}", BASE_URL, user_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    // Existing token no longer works
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}
