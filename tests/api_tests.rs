//! API integration tests
//!
//! These run against a live server with a fresh database:
//! `cargo run` in one terminal, then `cargo test -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}@test.example", prefix, nanos)
}

/// Register a throwaway account and return its bearer token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": unique_email("tester"),
            "password": "test-password"
        }))
        .send()
        .await
        .expect("Failed to send register request");

    let body: Value = response.json().await.expect("Failed to parse register response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Create a book and return its id
async fn create_book(client: &Client, token: &str, title: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "title": title,
            "author": "Test Author",
            "copies": copies
        }))
        .send()
        .await
        .expect("Failed to send create book request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book response");
    body["id"].as_i64().expect("No book ID")
}

/// Create a reader and return its id
async fn create_reader(client: &Client, token: &str, name: &str) -> i64 {
    let response = client
        .post(format!("{}/readers", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "name": name,
            "email": unique_email("reader")
        }))
        .send()
        .await
        .expect("Failed to send create reader request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse reader response");
    body["id"].as_i64().expect("No reader ID")
}

async fn get_book_copies(client: &Client, token: &str, book_id: i64) -> i64 {
    let response = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send get book request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse book response");
    body["copies"].as_i64().expect("No copies field")
}

async fn borrow(client: &Client, token: &str, reader_id: i64, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans/borrow", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"reader_id": reader_id, "book_id": book_id}))
        .send()
        .await
        .expect("Failed to send borrow request")
}

async fn return_book(client: &Client, token: &str, reader_id: i64, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans/return", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"reader_id": reader_id, "book_id": book_id}))
        .send()
        .await
        .expect("Failed to send return request")
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
async fn test_register_and_login() {
    let client = Client::new();
    let email = unique_email("login");

    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({"email": email, "password": "test-password"}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({"email": email, "password": "test-password"}))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");

    // The token identifies the account it was issued for
    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", body["token"].as_str().expect("token")))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let me: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(me["email"].as_str(), Some(email.as_str()));
    assert!(me["user_id"].is_i64());
}

#[tokio::test]
#[ignore]
async fn test_register_duplicate_email() {
    let client = Client::new();
    let email = unique_email("dup");

    for expected in [201, 400] {
        let response = client
            .post(format!("{}/auth/register", BASE_URL))
            .json(&json!({"email": email, "password": "test-password"}))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), expected);
    }

    // Email uniqueness ignores case
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({"email": email.to_uppercase(), "password": "test-password"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({"email": unique_email("ghost"), "password": "wrong"}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({"title": "No Auth", "author": "Nobody"}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_public_book_listing() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_round_trip() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token, "Round Trip", 2).await;
    let reader_id = create_reader(&client, &token, "Round Tripper").await;

    let response = borrow(&client, &token, reader_id, book_id).await;
    assert_eq!(response.status(), 201);
    assert_eq!(get_book_copies(&client, &token, book_id).await, 1);

    let response = return_book(&client, &token, reader_id, book_id).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["loan"]["return_date"].is_string());

    // Copies restored, no open loans left for the pair
    assert_eq!(get_book_copies(&client, &token, book_id).await, 2);

    let response = client
        .get(format!("{}/readers/{}/loans", BASE_URL, reader_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let loans: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loans.as_array().expect("array").len(), 0);
}

#[tokio::test]
#[ignore]
async fn test_borrow_no_copies() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token, "Out of Stock", 0).await;
    let reader_id = create_reader(&client, &token, "Hopeful").await;

    let response = borrow(&client, &token, reader_id, book_id).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NoCopiesAvailable");

    // Copies stay at zero
    assert_eq!(get_book_copies(&client, &token, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_borrow_limit() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let reader_id = create_reader(&client, &token, "Avid Reader").await;
    let mut book_ids = Vec::new();
    for i in 0..4 {
        book_ids.push(create_book(&client, &token, &format!("Volume {}", i), 4).await);
    }

    for book_id in &book_ids[..3] {
        let response = borrow(&client, &token, reader_id, *book_id).await;
        assert_eq!(response.status(), 201);
    }

    // Fourth borrow hits the limit regardless of which book
    let response = borrow(&client, &token, reader_id, book_ids[3]).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BorrowLimitExceeded");
}

#[tokio::test]
#[ignore]
async fn test_return_without_open_loan() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token, "Never Borrowed", 1).await;
    let reader_id = create_reader(&client, &token, "Innocent").await;

    let response = return_book(&client, &token, reader_id, book_id).await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "NoOpenLoan");
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrows_single_copy() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token, "The Last Copy", 1).await;
    let mut reader_ids = Vec::new();
    for i in 0..4 {
        reader_ids.push(create_reader(&client, &token, &format!("Racer {}", i)).await);
    }

    let (a, b, c, d) = tokio::join!(
        borrow(&client, &token, reader_ids[0], book_id),
        borrow(&client, &token, reader_ids[1], book_id),
        borrow(&client, &token, reader_ids[2], book_id),
        borrow(&client, &token, reader_ids[3], book_id),
    );

    let statuses = [a.status(), b.status(), c.status(), d.status()];
    let successes = statuses.iter().filter(|s| s.as_u16() == 201).count();
    let rejections = statuses.iter().filter(|s| s.as_u16() == 400).count();

    assert_eq!(successes, 1, "exactly one concurrent borrow may win");
    assert_eq!(rejections, 3);
    assert_eq!(get_book_copies(&client, &token, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_reader_loans_lists_open_only() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let kept = create_book(&client, &token, "Kept Out", 1).await;
    let returned = create_book(&client, &token, "Brought Back", 1).await;
    let reader_id = create_reader(&client, &token, "Lister").await;

    assert_eq!(borrow(&client, &token, reader_id, kept).await.status(), 201);
    assert_eq!(borrow(&client, &token, reader_id, returned).await.status(), 201);
    assert_eq!(return_book(&client, &token, reader_id, returned).await.status(), 200);

    let response = client
        .get(format!("{}/readers/{}/loans", BASE_URL, reader_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    let loans: Value = response.json().await.expect("Failed to parse response");
    let loans = loans.as_array().expect("array");
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["book"]["id"].as_i64(), Some(kept));
    assert!(loans[0]["borrow_date"].is_string());
    // Book data is current, not a snapshot: the kept copy is out
    assert_eq!(loans[0]["book"]["copies"].as_i64(), Some(0));
}

#[tokio::test]
#[ignore]
async fn test_delete_reader_with_open_loans() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token, "Held Hostage", 1).await;
    let reader_id = create_reader(&client, &token, "Keeper").await;
    assert_eq!(borrow(&client, &token, reader_id, book_id).await.status(), 201);

    let response = client
        .delete(format!("{}/readers/{}", BASE_URL, reader_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);

    // After returning, deletion goes through
    assert_eq!(return_book(&client, &token, reader_id, book_id).await.status(), 200);
    let response = client
        .delete(format!("{}/readers/{}", BASE_URL, reader_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);
}

#[tokio::test]
#[ignore]
async fn test_loans_tolerate_deleted_book() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token, "Pulled From Shelves", 1).await;
    let reader_id = create_reader(&client, &token, "Unlucky").await;
    assert_eq!(borrow(&client, &token, reader_id, book_id).await.status(), 201);

    // Book deletion is not guarded by open loans
    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    // The orphaned loan is skipped rather than failing the listing
    let response = client
        .get(format!("{}/readers/{}/loans", BASE_URL, reader_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let loans: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(loans.as_array().expect("array").len(), 0);

    // Returning it surfaces the broken invariant
    let response = return_book(&client, &token, reader_id, book_id).await;
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Inconsistency");
}

#[tokio::test]
#[ignore]
async fn test_duplicate_reader_email_ignores_case() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let email = unique_email("casing");

    let response = client
        .post(format!("{}/readers", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"name": "Original", "email": email}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/readers", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"name": "Copycat", "email": email.to_uppercase()}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_update_copies_below_open_loans() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let book_id = create_book(&client, &token, "Overcommitted", 2).await;
    let r1 = create_reader(&client, &token, "First").await;
    let r2 = create_reader(&client, &token, "Second").await;
    assert_eq!(borrow(&client, &token, r1, book_id).await.status(), 201);
    assert_eq!(borrow(&client, &token, r2, book_id).await.status(), 201);

    // Two loans are open; shrinking copies below that is refused
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"copies": 1}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let isbn = format!("isbn-{}", unique_email("n"));

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"title": "First Edition", "author": "A", "isbn": isbn, "copies": 1}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"title": "Second Edition", "author": "A", "isbn": isbn, "copies": 1}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}
