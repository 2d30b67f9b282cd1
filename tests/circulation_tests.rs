//! Circulation integration tests: borrowing lifecycle and inventory
//! consistency

mod common;

use common::*;
use reqwest::Client;
use serde_json::{json, Value};

/// Book with two copies: borrow twice, third attempt conflicts and leaves
/// state unchanged.
#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_borrow_until_exhausted() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, reader) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 2).await;

    let response = borrow_book(&client, &reader, book_id).await;
    assert_eq!(response.status(), 201);
    let borrowing: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(borrowing["status"], "borrowed");
    assert!(borrowing["return_date"].is_null());
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(1));

    let response = borrow_book(&client, &reader, book_id).await;
    assert_eq!(response.status(), 201);
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(0));

    let response = borrow_book(&client, &reader, book_id).await;
    assert_eq!(response.status(), 409);
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(0));
}

/// Returning restores availability exactly once; the second return of the
/// same borrowing conflicts.
#[tokio::test]
#[ignore]
async fn test_return_and_double_return() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, reader) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let response = borrow_book(&client, &reader, book_id).await;
    assert_eq!(response.status(), 201);
    let borrowing: Value = response.json().await.expect("Failed to parse response");
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing ID");
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(0));

    let response = return_borrowing(&client, &reader, borrowing_id).await;
    assert_eq!(response.status(), 200);
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["status"], "returned");
    assert_eq!(returned["return_date"], "2025-03-10");
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(1));

    let response = return_borrowing(&client, &reader, borrowing_id).await;
    assert_eq!(response.status(), 409);
    // availability increased exactly once
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(1));
}

/// Status never moves back from returned to borrowed
#[tokio::test]
#[ignore]
async fn test_status_is_monotonic() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, reader) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let borrowing: Value = borrow_book(&client, &reader, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing ID");

    assert_eq!(return_borrowing(&client, &reader, borrowing_id).await.status(), 200);

    let response = client
        .put(format!("{}/borrowings/{}", BASE_URL, borrowing_id))
        .header("Authorization", format!("Bearer {}", reader))
        .json(&json!({ "status": "borrowed" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);
}

/// Two borrow requests race for the last copy: exactly one wins
#[tokio::test]
#[ignore]
async fn test_concurrent_borrow_of_last_copy() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, reader_a) = register_reader(&client).await;
    let (_, reader_b) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let (first, second) = tokio::join!(
        borrow_book(&client, &reader_a, book_id),
        borrow_book(&client, &reader_b, book_id)
    );

    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, [201, 409], "exactly one of the racing borrows must win");
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(0));
}

/// Quantity cannot drop below the outstanding loan count
#[tokio::test]
#[ignore]
async fn test_quantity_below_outstanding_conflicts() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, reader) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 2).await;

    assert_eq!(borrow_book(&client, &reader, book_id).await.status(), 201);

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let book = get_book(&client, book_id).await;
    assert_eq!(book["quantity"].as_i64(), Some(2));
    assert_eq!(book["available"].as_i64(), Some(1));

    // Shrinking down to exactly the outstanding count is allowed
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let book = get_book(&client, book_id).await;
    assert_eq!(book["quantity"].as_i64(), Some(1));
    assert_eq!(book["available"].as_i64(), Some(0));
}

/// Books with copies out on loan cannot be deleted
#[tokio::test]
#[ignore]
async fn test_delete_book_with_open_borrowing_conflicts() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, reader) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let borrowing: Value = borrow_book(&client, &reader, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing ID");

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Once returned, the delete goes through
    assert_eq!(return_borrowing(&client, &reader, borrowing_id).await.status(), 200);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

/// Users may only see and return their own borrowings; admins may act on any
#[tokio::test]
#[ignore]
async fn test_borrowing_ownership() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, owner) = register_reader(&client).await;
    let (_, stranger) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 2).await;

    let borrowing: Value = borrow_book(&client, &owner, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing ID");

    let response = client
        .get(format!("{}/borrowings/{}", BASE_URL, borrowing_id))
        .header("Authorization", format!("Bearer {}", stranger))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let response = return_borrowing(&client, &stranger, borrowing_id).await;
    assert_eq!(response.status(), 403);

    // Admin can return on the borrower's behalf
    let response = return_borrowing(&client, &admin, borrowing_id).await;
    assert_eq!(response.status(), 200);
}

/// Deleting an open borrowing record hands the copy back
#[tokio::test]
#[ignore]
async fn test_delete_open_borrowing_restores_availability() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, reader) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 1).await;

    let borrowing: Value = borrow_book(&client, &reader, book_id)
        .await
        .json()
        .await
        .expect("Failed to parse response");
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing ID");
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(0));

    // Non-admins cannot delete ledger records
    let response = client
        .delete(format!("{}/borrowings/{}", BASE_URL, borrowing_id))
        .header("Authorization", format!("Bearer {}", reader))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    let response = client
        .delete(format!("{}/borrowings/{}", BASE_URL, borrowing_id))
        .header("Authorization", format!("Bearer {}", admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
    assert_eq!(get_book(&client, book_id).await["available"].as_i64(), Some(1));
}

/// Borrowing lists are scoped to the caller unless the caller is an admin
#[tokio::test]
#[ignore]
async fn test_borrowing_list_scoping() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (user_a, reader_a) = register_reader(&client).await;
    let (_, reader_b) = register_reader(&client).await;
    let book_id = create_book(&client, &admin, 2).await;

    assert_eq!(borrow_book(&client, &reader_a, book_id).await.status(), 201);
    assert_eq!(borrow_book(&client, &reader_b, book_id).await.status(), 201);

    let body: Value = client
        .get(format!("{}/borrowings/my", BASE_URL))
        .header("Authorization", format!("Bearer {}", reader_a))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    let mine = body.as_array().expect("expected array");
    assert!(!mine.is_empty());
    assert!(mine.iter().all(|b| b["user_id"].as_i64() == Some(user_a)));
    // List rows carry the joined book details
    assert!(mine[0]["book_title"].is_string());
}
