mod common;

use assetdesk::db::NewUser;
use assetdesk::db::repositories::user::{HashScheme, detect_scheme, legacy_hash};
use assetdesk::domain::Role;
use assetdesk::services::AuthService;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn test_legacy_hash_is_upgraded_on_login() {
    let app = spawn_app().await;
    let store = app.state.store();

    let user = store
        .create_user(NewUser {
            username: "veteran".to_string(),
            full_name: "Veteran Tech".to_string(),
            role: Role::Technician,
            phone: None,
            email: None,
            unit_id: None,
            password_hash: legacy_hash("oldsecret", "a1b2c3"),
        })
        .await
        .unwrap();

    let before = store.get_user_password_hash(user.id).await.unwrap().unwrap();
    assert_eq!(detect_scheme(&before), HashScheme::LegacySha256);

    let token = app.login("veteran", "oldsecret").await;
    assert!(!token.is_empty());

    let after = store.get_user_password_hash(user.id).await.unwrap().unwrap();
    assert_eq!(detect_scheme(&after), HashScheme::Argon2);

    // Same password keeps working against the new hash.
    app.login("veteran", "oldsecret").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "veteran", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_user_and_bad_password_look_alike() {
    let app = spawn_app().await;

    let (status_unknown, body_unknown) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "ghost", "password": "whatever" })),
        )
        .await;

    let (status_wrong, body_wrong) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "whatever" })),
        )
        .await;

    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(body_unknown["error"], body_wrong["error"]);
}

#[tokio::test]
async fn test_token_carries_role_and_unit() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let unit_id = app.create_unit(&admin, "Helpdesk").await;
    let (user_id, token) = app
        .create_user(&admin, "scoped", "manager", Some(unit_id))
        .await;

    let identity = app.state.auth_service().verify_token(&token).unwrap();

    assert_eq!(i64::from(identity.user_id), user_id);
    assert_eq!(identity.role, Role::Manager);
    assert_eq!(identity.unit_id.map(i64::from), Some(unit_id));
}

#[tokio::test]
async fn test_deleted_user_token_no_longer_resolves_profile() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (user_id, token) = app.create_user(&admin, "leaver", "technician", None).await;

    let (status, _) = app.delete(&format!("/api/users/{user_id}"), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/api/auth/me", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
