mod common;

use axum::http::StatusCode;
use common::{parse_body, TestApp};
use seating_backend::domain::services::broadcaster::Subscriber;
use serde_json::{json, Value};

async fn guest_id(app: &TestApp, event_id: &str, name: &str) -> String {
    let body = parse_body(
        app.admin_get(&format!("/api/v1/admin/events/{}/guests?search={}", event_id, name)).await,
    ).await;
    body["guests"][0]["id"].as_str().unwrap().to_string()
}

fn full_table(table: &str) -> Vec<(String, String, f64, String)> {
    (1..=12)
        .map(|i| (format!("{} Guest {}", table, i), table.to_string(), i as f64, "none".to_string()))
        .collect()
}

#[tokio::test]
async fn test_search_and_pagination() {
    let app = TestApp::new().await;
    let event = app.seeded_event(&[
        ("Jane Smith", "A1", 1.0, "none"),
        ("John Smith", "A1", 2.0, "none"),
        ("Mary Major", "B1", 1.0, "none"),
    ]).await;
    let id = event["id"].as_str().unwrap();

    let body = parse_body(app.admin_get(&format!("/api/v1/admin/events/{}/guests?search=smith", id)).await).await;
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["guests"].as_array().unwrap().len(), 2);

    let page = parse_body(app.admin_get(&format!("/api/v1/admin/events/{}/guests?page=2&per_page=2", id)).await).await;
    assert_eq!(page["pagination"], json!({"page": 2, "per_page": 2, "total": 3, "pages": 2}));
    assert_eq!(page["guests"].as_array().unwrap().len(), 1);
    assert_eq!(page["guests"][0]["name"], "Mary Major");

    let too_big = app.admin_get(&format!("/api/v1/admin/events/{}/guests?per_page=101", id)).await;
    assert_eq!(too_big.status(), StatusCode::BAD_REQUEST);

    let huge_page = app.admin_get(&format!("/api/v1/admin/events/{}/guests?page={}&per_page=100", id, i64::MAX)).await;
    assert_eq!(huge_page.status(), StatusCode::BAD_REQUEST);
    assert_eq!(parse_body(huge_page).await["error"], "page is out of range");

    let beyond_last_page = app.admin_get(&format!("/api/v1/admin/events/{}/guests?page=1000&per_page=100", id)).await;
    assert_eq!(beyond_last_page.status(), StatusCode::OK);
    assert!(parse_body(beyond_last_page).await["guests"].as_array().unwrap().is_empty());

    let unknown = app.admin_get("/api/v1/admin/events/nope/guests").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_guest_fields() {
    let app = TestApp::new().await;
    let event = app.seeded_event(&[("Jane Smith", "A1", 1.0, "none")]).await;
    let id = event["id"].as_str().unwrap();
    let gid = guest_id(&app, id, "jane").await;

    let response = app.admin_json(
        "PATCH",
        &format!("/api/v1/admin/events/{}/guests/{}", id, gid),
        json!({"name": "Jane Doe", "table_name": "B2", "seat_no": 4, "dietary": "Shellfish Allergy", "checked_in": true}),
    ).await;
    assert_eq!(response.status(), StatusCode::OK);

    let guest = parse_body(response).await;
    assert_eq!(guest["name"], "Jane Doe");
    assert_eq!(guest["table_name"], "B2");
    assert_eq!(guest["seat_no"], 4);
    assert_eq!(guest["dietary"], "allergies:shellfish allergy");
    assert_eq!(guest["checked_in"], true);
}

#[tokio::test]
async fn test_update_guest_rejects_taken_seat_and_full_table() {
    let app = TestApp::new().await;

    let mut rows = full_table("A1");
    rows.push(("Mover".into(), "B1".into(), 1.0, "none".into()));
    rows.push(("Neighbour".into(), "B1".into(), 2.0, "none".into()));
    let borrowed: Vec<(&str, &str, f64, &str)> = rows
        .iter()
        .map(|(n, t, s, d)| (n.as_str(), t.as_str(), *s, d.as_str()))
        .collect();

    let event = app.seeded_event(&borrowed).await;
    let id = event["id"].as_str().unwrap();
    let gid = guest_id(&app, id, "mover").await;
    let uri = format!("/api/v1/admin/events/{}/guests/{}", id, gid);

    let taken = app.admin_json("PATCH", &uri, json!({"seat_no": 2})).await;
    assert_eq!(taken.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = parse_body(taken).await;
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"], json!(["Seat 2 is already taken in table 'B1'"]));

    let full = app.admin_json("PATCH", &uri, json!({"table_name": "A1", "seat_no": 5})).await;
    assert_eq!(full.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let details: Vec<Value> = parse_body(full).await["details"].as_array().unwrap().clone();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0], "Table 'A1' would exceed maximum capacity of 12 guests");
    assert_eq!(details[1], "Seat 5 is already taken in table 'A1'");

    let same_seat = app.admin_json("PATCH", &uri, json!({"seat_no": 1, "name": "Mover Renamed"})).await;
    assert_eq!(same_seat.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_unknown_guest() {
    let app = TestApp::new().await;
    let event = app.create_event("Wedding").await;

    let response = app.admin_json(
        "PATCH",
        &format!("/api/v1/admin/events/{}/guests/missing", event["id"].as_str().unwrap()),
        json!({"name": "X"}),
    ).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_broadcasts_guest_snapshot() {
    let app = TestApp::new().await;
    let event = app.seeded_event(&[("Jane Smith", "A1", 1.0, "none")]).await;
    let id = event["id"].as_str().unwrap();
    let gid = guest_id(&app, id, "jane").await;

    let (subscriber, mut rx) = Subscriber::channel();
    app.state.broadcaster.register(subscriber, event["public_code"].as_str().unwrap());

    app.admin_json(
        "PATCH",
        &format!("/api/v1/admin/events/{}/guests/{}", id, gid),
        json!({"seat_no": 7}),
    ).await;

    let msg: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
    assert_eq!(msg["type"], "guest_updated");
    assert_eq!(
        msg["guest"],
        json!({"name": "Jane Smith", "table_name": "A1", "seat_no": 7, "dietary": "none", "checked_in": false})
    );
}
