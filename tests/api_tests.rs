mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let (status, body) = app.request(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = spawn_app().await;

    let (status, body) = app.request(Method::GET, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/items", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = spawn_app().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_me_returns_profile_without_hash() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let (status, body) = app.get("/api/auth/me", &token).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["role"], "admin");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_unit_crud_and_duplicate_name() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let unit_id = app.create_unit(&token, "Informatics").await;

    let (status, _) = app
        .post("/api/units", &token, json!({ "name": "Informatics" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.post("/api/units", &token, json!({ "name": "IT" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(
            &format!("/api/units/{unit_id}"),
            &token,
            json!({ "name": "Informatics Dept", "campus": "North" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Informatics Dept");
    assert_eq!(body["data"]["campus"], "North");

    let (status, _) = app.delete(&format!("/api/units/{unit_id}"), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/units/{unit_id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unit_referenced_by_item_cannot_be_deleted() {
    let app = spawn_app().await;
    let token = app.admin_token().await;

    let unit_id = app.create_unit(&token, "Warehouse").await;
    app.create_item(&token, unit_id, "HDMI cable", 4).await;

    let (status, _) = app.delete(&format!("/api/units/{unit_id}"), &token).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_item_crud() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let unit_id = app.create_unit(&token, "Storage").await;

    let item_id = app.create_item(&token, unit_id, "Network switch", 3).await;

    let (status, body) = app
        .get(&format!("/api/items?unit_id={unit_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["unit_name"], "Storage");

    let (status, body) = app
        .put(
            &format!("/api/items/{item_id}"),
            &token,
            json!({
                "description": "Managed switch",
                "unit_of_measure": "un",
                "quantity": 8,
                "unit_price": 120.0,
                "unit_id": unit_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Managed switch");
    assert_eq!(body["data"]["quantity"], 8);

    let (status, _) = app
        .post(
            "/api/items",
            &token,
            json!({
                "description": "Broken",
                "unit_of_measure": "un",
                "quantity": -1,
                "unit_id": unit_id,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&format!("/api/items/{item_id}"), &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/items/{item_id}"), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_capability_gating() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let unit_id = app.create_unit(&admin, "Library").await;
    let item_id = app.create_item(&admin, unit_id, "Mouse", 10).await;

    let (manager_id, manager) = app
        .create_user(&admin, "manager1", "manager", Some(unit_id))
        .await;

    // Managers may not open requisitions.
    let (status, _) = app
        .post(
            "/api/requisitions",
            &manager,
            json!({
                "technician_id": manager_id,
                "unit_id": unit_id,
                "items": [{ "item_id": item_id, "quantity": 1 }],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nor manage units or users, although they can list users.
    let (status, _) = app.get("/api/units", &manager).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/users",
            &manager,
            json!({
                "username": "intruder",
                "full_name": "Intruder",
                "role": "admin",
                "password": "secret123",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/users", &manager).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/reports/global-stats", &manager).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, technician) = app
        .create_user(&admin, "tech1", "technician", Some(unit_id))
        .await;

    let (status, _) = app.delete(&format!("/api/items/{item_id}"), &technician).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(
            "/api/maintenance/1/start",
            &technician,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_management() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .post(
            "/api/users",
            &admin,
            json!({
                "username": "bad",
                "full_name": "Bad Role",
                "role": "overlord",
                "password": "secret123",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (tech_id, _) = app
        .create_user(&admin, "printer.tech", "printer_technician", None)
        .await;
    app.create_user(&admin, "elec.tech", "electronics_technician", None)
        .await;
    app.create_user(&admin, "boss", "manager", None).await;

    let (status, _) = app
        .post(
            "/api/users",
            &admin,
            json!({
                "username": "printer.tech",
                "full_name": "Duplicate",
                "role": "technician",
                "password": "secret123",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/api/users?role_type=technician", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/users?role=manager", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["username"], "boss");

    let (status, _) = app
        .put(
            "/api/users/reset-password",
            &admin,
            json!({ "username": "printer.tech", "new_password": "brandnew1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    app.login("printer.tech", "brandnew1").await;

    let (status, _) = app.delete(&format!("/api/users/{tech_id}"), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, me) = app.get("/api/auth/me", &admin).await;
    let admin_id = me["data"]["id"].as_i64().unwrap();
    let (status, _) = app.delete(&format!("/api/users/{admin_id}"), &admin).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_change_password() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (_, token) = app.create_user(&admin, "changer", "technician", None).await;

    let (status, _) = app
        .put(
            "/api/auth/change-password",
            &token,
            json!({ "current_password": "nope", "new_password": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(
            "/api/auth/change-password",
            &token,
            json!({ "current_password": "secret123", "new_password": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.login("changer", "another1").await;
}

#[tokio::test]
async fn test_maintenance_workflow() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let (tech_id, tech) = app
        .create_user(&admin, "elec", "electronics_technician", None)
        .await;

    let (status, body) = app
        .post(
            "/api/maintenance",
            &tech,
            json!({
                "equipment": "Projector",
                "problem_description": "Does not power on",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["technician_id"], tech_id);
    assert_eq!(body["data"]["status"], "pending");
    let ticket_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = app
        .patch(&format!("/api/maintenance/{ticket_id}/start"), &tech, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_progress");

    let (status, _) = app
        .patch(
            &format!("/api/maintenance/{ticket_id}/finish"),
            &tech,
            json!({ "report": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .patch(
            &format!("/api/maintenance/{ticket_id}/finish"),
            &tech,
            json!({ "report": "Replaced power supply" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "done");
    assert_eq!(body["data"]["report"], "Replaced power supply");

    let (status, _) = app
        .patch(
            &format!("/api/maintenance/{ticket_id}/status"),
            &tech,
            json!({ "status": "exploded" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .patch("/api/maintenance/9999/start", &tech, json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = spawn_app().await;

    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        app.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    };

    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_malformed_requests_answer_400_in_the_envelope() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let unit_id = app.create_unit(&admin, "Informatics").await;
    let item_id = app.create_item(&admin, unit_id, "Mouse", 3).await;
    let (_, tech) = app
        .create_user(&admin, "tech", "technician", Some(unit_id))
        .await;

    // Missing technician_id and unit_id.
    let (status, body) = app
        .post(
            "/api/requisitions",
            &tech,
            json!({ "items": [{ "item_id": item_id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("technician_id"));

    let (status, body) = app.post("/api/units", &admin, json!({ "nome": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = app
        .put(
            &format!("/api/items/{item_id}"),
            &admin,
            json!({ "description": "Mouse", "unit_of_measure": "un", "quantity": "lots", "unit_id": unit_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        app.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/units")
                    .header("Authorization", format!("Bearer {admin}"))
                    .header("Content-Type", "application/json")
                    .body(Body::from("{\"name\": "))
                    .unwrap(),
            )
            .await
            .unwrap()
    };
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/api/items/abc", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.get("/api/items?unit_id=north", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    assert_eq!(app.item_quantity(&admin, item_id).await, 3);
}
