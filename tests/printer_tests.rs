mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::spawn_app;

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_printer_search_matches_partially() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let fourth = app
        .create_printer(&admin, "Fourth floor", "SN-ABC-0001", "10.0.4.20", None)
        .await;
    let fourth_b = app
        .create_printer(&admin, "Fourth floor B", "SN-ABC-0002", "10.0.4.21", None)
        .await;
    let lobby = app
        .create_printer(&admin, "Lobby", "XK-9", "192.168.1.5", None)
        .await;

    let (status, body) = app.get("/api/printers/printers?ip=10.0.4", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![fourth, fourth_b]);

    // Case does not matter for the serial number.
    let (_, body) = app
        .get("/api/printers/printers?serial_number=abc-0002", &admin)
        .await;
    assert_eq!(ids(&body), vec![fourth_b]);

    let (status, body) = app
        .put(
            &format!("/api/printers/printers/{lobby}"),
            &admin,
            json!({
                "name": "Lobby",
                "serial_number": "XK-9",
                "ip": "192.168.1.5",
                "policies_applied": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app
        .get("/api/printers/printers?policies_applied=true", &admin)
        .await;
    assert_eq!(ids(&body), vec![lobby]);

    let (_, body) = app
        .get("/api/printers/printers?policies_applied=false", &admin)
        .await;
    assert_eq!(ids(&body).len(), 2);
}

#[tokio::test]
async fn test_deleted_printer_leaves_the_list() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let printer = app
        .create_printer(&admin, "Old inkjet", "OLD-1", "10.1.1.1", None)
        .await;

    let (status, _) = app
        .delete(&format!("/api/printers/printers/{printer}"), &admin)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.get("/api/printers/printers", &admin).await;
    assert!(ids(&body).is_empty());

    let (status, _) = app
        .delete(&format!("/api/printers/printers/{printer}"), &admin)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_printer_and_supply_lists_follow_the_callers_unit() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let north = app.create_unit(&admin, "North wing").await;
    let south = app.create_unit(&admin, "South wing").await;

    let north_printer = app
        .create_printer(&admin, "North laser", "N-1", "10.2.0.1", Some(north))
        .await;
    let south_printer = app
        .create_printer(&admin, "South laser", "S-1", "10.3.0.1", Some(south))
        .await;

    let (_, north_manager) = app
        .create_user(&admin, "north.boss", "manager", Some(north))
        .await;
    let (_, drifter) = app.create_user(&admin, "drifter", "technician", None).await;

    let (status, _) = app
        .put("/api/printers/stock", &admin, json!({ "black_toner": 10 }))
        .await;
    assert_eq!(status, StatusCode::OK);

    for printer_id in [north_printer, south_printer] {
        let (status, body) = app
            .post(
                "/api/printers/supplies",
                &admin,
                json!({ "printer_id": printer_id, "black_toner": 1 }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (_, body) = app.get("/api/printers/printers", &admin).await;
    assert_eq!(ids(&body).len(), 2);

    // Asking for another unit does not widen a manager's view.
    let (_, body) = app
        .get(&format!("/api/printers/printers?unit_id={south}"), &north_manager)
        .await;
    assert_eq!(ids(&body), vec![north_printer]);

    let (_, body) = app.get("/api/printers/supplies", &north_manager).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["printer_id"], north_printer);

    let (_, body) = app.get("/api/printers/supplies", &admin).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = app.get("/api/printers/printers", &drifter).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());

    let (status, body) = app.get("/api/printers/supplies", &drifter).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_service_records() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let unit_id = app.create_unit(&admin, "Print room").await;
    let (tech_id, tech) = app
        .create_user(&admin, "printer.tech", "printer_technician", Some(unit_id))
        .await;
    let printer = app
        .create_printer(&admin, "Copier", "CP-7", "10.4.0.7", Some(unit_id))
        .await;
    let other = app
        .create_printer(&admin, "Plotter", "PL-1", "10.4.0.8", Some(unit_id))
        .await;

    let (status, body) = app
        .post(
            "/api/printers/services",
            &tech,
            json!({ "printer_id": printer, "description": "Replaced fuser" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["printer_name"], "Copier");
    assert_eq!(body["data"]["technician_id"], tech_id);
    assert_eq!(body["data"]["unit_id"], unit_id);

    app.post(
        "/api/printers/services",
        &tech,
        json!({ "printer_id": other, "description": "Cleaned rollers" }),
    )
    .await;

    let (_, body) = app
        .get(&format!("/api/printers/services?printer_id={printer}"), &tech)
        .await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["description"], "Replaced fuser");

    let (_, body) = app.get("/api/printers/services", &tech).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .post(
            "/api/printers/services",
            &tech,
            json!({ "printer_id": printer, "description": "   " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.delete(&format!("/api/printers/printers/{other}"), &admin)
        .await;
    let (status, _) = app
        .post(
            "/api/printers/services",
            &tech,
            json!({ "printer_id": other, "description": "Too late" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_restock_past_counter_limit_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .put(
            "/api/printers/stock",
            &admin,
            json!({ "black_toner": i32::MAX }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .put(
            "/api/printers/stock",
            &admin,
            json!({ "black_toner": 1, "cyan_toner": 4 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["error"].as_str().unwrap().contains("black_toner"));

    let (_, body) = app.get("/api/printers/stock", &admin).await;
    assert_eq!(body["data"]["black_toner"], i32::MAX);
    assert_eq!(body["data"]["cyan_toner"], 0);
}

#[tokio::test]
async fn test_consumption_by_deleted_account_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let printer = app
        .create_printer(&admin, "Front desk", "FD-1", "10.5.0.1", None)
        .await;
    let (leaver_id, leaver) = app.create_user(&admin, "leaver", "technician", None).await;

    app.put("/api/printers/stock", &admin, json!({ "imaging_units": 2 }))
        .await;

    let (status, _) = app.delete(&format!("/api/users/{leaver_id}"), &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .post(
            "/api/printers/supplies",
            &leaver,
            json!({ "printer_id": printer, "imaging_units": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (_, body) = app.get("/api/printers/stock", &admin).await;
    assert_eq!(body["data"]["imaging_units"], 2);
}
