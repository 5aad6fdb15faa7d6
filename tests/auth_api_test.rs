mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn register_login_and_profile_flow() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Pat Doe",
                "email": "Pat@Example.com",
                "password": "Password123!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "success");
    // Email is normalized, role defaults to Staff, password never leaks.
    assert_eq!(body["data"]["user"]["email"], "pat@example.com");
    assert_eq!(body["data"]["user"]["role"], "Staff");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "pat@example.com", "password": "Password123!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "Pat Doe");
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;
    app.register_user("Pat", "pat@example.com", "Staff").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Other Pat",
                "email": "pat@example.com",
                "password": "Password123!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn bad_credentials_and_missing_tokens_are_unauthorized() {
    let app = TestApp::new().await;
    app.register_user("Pat", "pat@example.com", "Staff").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "pat@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "Password123!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/auth/me", Some("not-a-real-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_rotates_credentials() {
    let app = TestApp::new().await;
    let (token, _) = app.register_user("Pat", "pat@example.com", "Staff").await;

    // Wrong current password is rejected.
    let (status, _) = app
        .request(
            Method::PUT,
            "/api/auth/update-password",
            Some(&token),
            Some(json!({
                "current_password": "not-my-password",
                "new_password": "NewPassword456!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/auth/update-password",
            Some(&token),
            Some(json!({
                "current_password": "Password123!",
                "new_password": "NewPassword456!",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let fresh_token = body["data"]["token"].as_str().unwrap().to_string();

    // Old password no longer works, the new one does.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "pat@example.com", "password": "Password123!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "pat@example.com", "password": "NewPassword456!" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::GET, "/api/auth/me", Some(&fresh_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::new().await;
    let (admin_token, admin_id) = app.register_user("Ada", "ada@example.com", "Admin").await;
    let (staff_token, staff_id) = app.register_user("Sam", "sam@example.com", "Staff").await;

    let (status, _) = app
        .request(Method::GET, "/api/auth/users", Some(&staff_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::GET, "/api/auth/users", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["pagination"]["total"], 2);

    // Promote the staff user.
    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/auth/users/{staff_id}"),
            Some(&admin_token),
            Some(json!({ "role": "Manager" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], "Manager");

    // Self-deletion is refused.
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/auth/users/{admin_id}"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Soft-deleting another user revokes their access immediately.
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/auth/users/{staff_id}"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::GET, "/api/auth/me", Some(&staff_token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "sam@example.com", "password": "Password123!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
}
