//! Integration tests for invite code issuance and redemption.
//!
//! Requires a running PostgreSQL instance (see common/mod.rs); each test
//! skips itself when TEST_DATABASE_URL is not usable.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

macro_rules! require_pool {
    () => {
        match common::try_test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: TEST_DATABASE_URL not set or unreachable");
                return;
            }
        }
    };
}

fn redeem_body(code: &str, email: &str) -> serde_json::Value {
    json!({
        "code": code,
        "email": email,
        "display_name": "Invited User"
    })
}

#[tokio::test]
async fn issuance_consumes_quota_then_exhausts() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 2).await;

    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        &format!("/api/v1/beta/profiles/{}/invites", owner_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["invites_used"], 3);
    assert_eq!(body["invite_quota"], 3);
    assert_eq!(body["max_uses"], 1);
    assert!(body["invite_url"].as_str().unwrap().contains("/join/"));

    // Quota is spent; the next issuance fails.
    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        &format!("/api/v1/beta/profiles/{}/invites", owner_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "quota_exhausted");
}

#[tokio::test]
async fn issuance_requires_beta_access() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;

    let profile_id: uuid::Uuid = sqlx::query_scalar(
        "INSERT INTO profiles (email, beta_access, invite_quota) VALUES ('nobeta@example.com', FALSE, 3) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let (status, _) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        &format!("/api/v1/beta/profiles/{}/invites", profile_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn redemption_activates_profile_and_consumes_capacity() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;
    common::seed_invite_code(&pool, owner_id, "ABC-DEF-GHJ", 1, 30).await;

    // The redeemer has a pending application on file.
    common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/applications",
        Some(common::low_score_body("invited@example.com")),
    )
    .await;

    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        // Codes are normalized before lookup.
        Some(redeem_body("  abc-def-ghj ", "invited@example.com")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_approved"], false);

    let beta_access: bool =
        sqlx::query_scalar("SELECT beta_access FROM profiles WHERE email = $1")
            .bind("invited@example.com")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(beta_access);

    let uses: i32 = sqlx::query_scalar("SELECT uses FROM invite_codes WHERE code = $1")
        .bind("ABC-DEF-GHJ")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(uses, 1);

    // The pending application was approved by the redemption.
    let app_status: String =
        sqlx::query_scalar("SELECT status::text FROM applications WHERE email = $1")
            .bind("invited@example.com")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(app_status, "approved");

    let (_, approved) = common::pool_counts(&pool).await;
    assert_eq!(approved, 1);
}

#[tokio::test]
async fn redemption_rejects_unknown_inactive_and_expired_codes() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;

    // Unknown code.
    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("ZZZ-ZZZ-ZZZ", "a@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");

    // Expired code.
    common::seed_invite_code(&pool, owner_id, "OLD-OLD-OLD", 1, -1).await;
    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("OLD-OLD-OLD", "b@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");

    // Revoked code.
    common::seed_invite_code(&pool, owner_id, "REV-REV-REV", 1, 30).await;
    sqlx::query("UPDATE invite_codes SET is_active = FALSE WHERE code = 'REV-REV-REV'")
        .execute(&pool)
        .await
        .unwrap();
    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("REV-REV-REV", "c@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");

    // Nothing was consumed along the way.
    let (_, approved) = common::pool_counts(&pool).await;
    assert_eq!(approved, 0);
}

#[tokio::test]
async fn redemption_is_idempotent_for_approved_redeemer() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;
    common::seed_invite_code(&pool, owner_id, "ABC-DEF-GHJ", 5, 30).await;

    let first = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("ABC-DEF-GHJ", "repeat@example.com")),
    )
    .await;
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(first.1["already_approved"], false);

    let second = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("ABC-DEF-GHJ", "repeat@example.com")),
    )
    .await;
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(second.1["already_approved"], true);

    // The retry consumed neither a use nor a slot.
    let uses: i32 = sqlx::query_scalar("SELECT uses FROM invite_codes WHERE code = $1")
        .bind("ABC-DEF-GHJ")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(uses, 1);

    let (_, approved) = common::pool_counts(&pool).await;
    assert_eq!(approved, 1);
}

#[tokio::test]
async fn concurrent_redemption_of_single_use_code_grants_once() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;
    common::seed_invite_code(&pool, owner_id, "ONE-USE-NLY", 1, 30).await;

    let app = common::test_app(pool.clone());
    let first = common::send_json(
        app.clone(),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("ONE-USE-NLY", "alpha@example.com")),
    );
    let second = common::send_json(
        app,
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("ONE-USE-NLY", "beta@example.com")),
    );

    let (res_a, res_b) = tokio::join!(first, second);
    let outcomes = [res_a.0, res_b.0];
    let successes = outcomes.iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1, "a single-use code grants exactly once");

    let loser = if res_a.0 == StatusCode::OK { &res_b.1 } else { &res_a.1 };
    let error = loser["error"].as_str().unwrap();
    assert!(
        error == "code_exhausted" || error == "at_capacity",
        "unexpected loser error: {}",
        error
    );

    let uses: i32 = sqlx::query_scalar("SELECT uses FROM invite_codes WHERE code = $1")
        .bind("ONE-USE-NLY")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(uses, 1);

    let (_, approved) = common::pool_counts(&pool).await;
    assert_eq!(approved, 1);
}

#[tokio::test]
async fn redemption_at_capacity_rolls_back_the_use() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;
    common::seed_invite_code(&pool, owner_id, "ABC-DEF-GHJ", 1, 30).await;
    common::set_pool_counts(&pool, 150, 150).await;

    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("ABC-DEF-GHJ", "late@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "at_capacity");

    // The use-increment rolled back with the denied reservation.
    let uses: i32 = sqlx::query_scalar("SELECT uses FROM invite_codes WHERE code = $1")
        .bind("ABC-DEF-GHJ")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(uses, 0);

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM profiles WHERE email = $1)")
            .bind("late@example.com")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!exists);
}

#[tokio::test]
async fn preview_reports_validity_without_consuming() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;
    common::seed_invite_code(&pool, owner_id, "ABC-DEF-GHJ", 2, 30).await;

    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::GET,
        "/api/v1/beta/invites/ABC-DEF-GHJ",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["uses_remaining"], 2);

    let (status, _) = common::send_json(
        common::test_app(pool.clone()),
        Method::GET,
        "/api/v1/beta/invites/NOP-NOP-NOP",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revoked_code_stops_redeeming() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;
    common::seed_invite_code(&pool, owner_id, "ABC-DEF-GHJ", 1, 30).await;

    let (status, _) = common::send_json(
        common::test_app(pool.clone()),
        Method::DELETE,
        &format!("/api/v1/beta/profiles/{}/invites/ABC-DEF-GHJ", owner_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/invites/redeem",
        Some(redeem_body("ABC-DEF-GHJ", "late@example.com")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_code");
}

#[tokio::test]
async fn submission_with_invite_code_bypasses_threshold() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 3, 0).await;
    common::seed_invite_code(&pool, owner_id, "ABC-DEF-GHJ", 1, 30).await;

    // Low score, but carrying a valid invite code.
    let mut body = common::low_score_body("lucky@example.com");
    body["invite_code"] = json!("ABC-DEF-GHJ");

    let (status, response) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/applications",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "approved");

    // An unusable code falls back to the score path.
    let mut body = common::low_score_body("unlucky@example.com");
    body["invite_code"] = json!("ABC-DEF-GHJ"); // now exhausted

    let (status, response) = common::send_json(
        common::test_app(pool.clone()),
        Method::POST,
        "/api/v1/beta/applications",
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "pending");
}

#[tokio::test]
async fn listing_shows_only_live_codes() {
    let pool = require_pool!();
    common::reset_database(&pool, 150).await;
    let owner_id = common::seed_approved_profile(&pool, "owner@example.com", 5, 0).await;
    common::seed_invite_code(&pool, owner_id, "AAA-AAA-AAA", 1, 30).await;
    common::seed_invite_code(&pool, owner_id, "BBB-BBB-BBB", 1, -1).await; // expired
    common::seed_invite_code(&pool, owner_id, "CCC-CCC-CCC", 1, 30).await;
    sqlx::query("UPDATE invite_codes SET is_active = FALSE WHERE code = 'CCC-CCC-CCC'")
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = common::send_json(
        common::test_app(pool.clone()),
        Method::GET,
        &format!("/api/v1/beta/profiles/{}/invites", owner_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["code"], "AAA-AAA-AAA");
}
