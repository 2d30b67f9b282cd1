//! Shared helpers for integration tests
//!
//! All integration tests run against a live server on localhost:8080 with
//! the bootstrap admin account (admin/admin123) in place:
//!
//!   cargo test -- --ignored

#![allow(dead_code)]

use reqwest::Client;
use serde_json::{json, Value};

pub const BASE_URL: &str = "http://localhost:8080";

/// Unique suffix so repeated test runs do not collide on unique columns
pub fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}{}", prefix, nanos)
}

/// Log in as the bootstrap admin and return a bearer token
pub async fn admin_token(client: &Client) -> String {
    login(client, "admin", "admin123").await
}

/// Log in and return a bearer token
pub async fn login(client: &Client, username: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");

    assert_eq!(response.status(), 200, "login failed for {}", username);
    let body: Value = response.json().await.expect("Failed to parse login response");
    body["access_token"]
        .as_str()
        .expect("No token in response")
        .to_string()
}

/// Register a fresh non-admin user and return (user_id, token)
pub async fn register_reader(client: &Client) -> (i64, String) {
    let username = unique("reader");
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret1",
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);
    let user: Value = response.json().await.expect("Failed to parse register response");
    let user_id = user["id"].as_i64().expect("No user ID");

    let token = login(client, &username, "secret1").await;
    (user_id, token)
}

/// Create a book as admin and return its ID
pub async fn create_book(client: &Client, admin_token: &str, quantity: i64) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&json!({
            "title": unique("Test Book "),
            "author": "Test Author",
            "quantity": quantity,
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse book response");
    book["id"].as_i64().expect("No book ID")
}

/// Fetch a book and return its JSON
pub async fn get_book(client: &Client, id: i64) -> Value {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send get book request");

    assert_eq!(response.status(), 200);
    response.json().await.expect("Failed to parse book response")
}

/// Borrow a book and return the response
pub async fn borrow_book(client: &Client, token: &str, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/borrowings", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "book_id": book_id, "borrow_date": "2025-03-01" }))
        .send()
        .await
        .expect("Failed to send borrow request")
}

/// Return a borrowing and return the response
pub async fn return_borrowing(client: &Client, token: &str, borrowing_id: i64) -> reqwest::Response {
    client
        .put(format!("{}/borrowings/{}", BASE_URL, borrowing_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "status": "returned", "return_date": "2025-03-10" }))
        .send()
        .await
        .expect("Failed to send return request")
}
