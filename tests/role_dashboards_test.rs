//! Commander, logistics and military dashboards, plus the status endpoint.

mod common;

use axum::http::Method;
use common::{commander_nav, response_json, TestApp};
use mams_portal::{auth::NavigationState, store::Table};
use serde_json::json;

fn commander_uri(path: &str) -> String {
    format!("{path}?{}", commander_nav().to_query())
}

#[tokio::test]
async fn commander_sees_other_bases_as_destinations() {
    let app = TestApp::new();
    let response = app
        .request(Method::GET, &commander_uri("/commander-dashboard"), None)
        .await;
    assert_eq!(response.status(), 200);

    let data = response_json(response).await["data"].clone();
    let destinations: Vec<_> = data["destinations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(destinations, ["HQ", "SEN", "FAL"]);
    assert_eq!(data["inventory"].as_array().map(Vec::len), Some(3));
    assert!(data["officers"]
        .as_array()
        .unwrap()
        .iter()
        .all(|u| u["role"] != "Base Commander"));
}

#[tokio::test]
async fn commander_creates_an_assigned_consignment() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::POST,
            &commander_uri("/commander-dashboard/consignments"),
            Some(json!({ "to_base": "3", "assigned_to": "LO-0220", "purchase_orders": 4 })),
        )
        .await;
    assert_eq!(response.status(), 201);

    let data = response_json(response).await["data"].clone();
    assert_eq!(data["message"], "Consignment created successfully!");
    assert_eq!(data["ticket"]["ticket_id"], "1003");
    assert_eq!(data["ticket"]["from_base"], "2");
    assert_eq!(data["ticket"]["authorized_by"], "BC-0107");
    assert_eq!(data["ticket"]["status"], "assigned");
    assert_eq!(app.store.rows(Table::Consignment).await.len(), 3);
}

#[tokio::test]
async fn incomplete_consignment_is_rejected_without_a_write() {
    let app = TestApp::new();
    for form in [
        json!({ "to_base": "", "assigned_to": "LO-0220", "purchase_orders": 4 }),
        json!({ "to_base": "3", "assigned_to": "LO-0220", "purchase_orders": 0 }),
        json!({ "to_base": "3", "assigned_to": "LO-0220", "purchase_orders": -2 }),
    ] {
        let response = app
            .request(
                Method::POST,
                &commander_uri("/commander-dashboard/consignments"),
                Some(form),
            )
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(
            response_json(response).await["message"],
            "Validation error: Please fill all fields correctly."
        );
    }
    assert_eq!(app.store.rows(Table::Consignment).await.len(), 2);
}

#[tokio::test]
async fn logistics_officer_sees_outgoing_tickets_only() {
    let app = TestApp::new();
    let nav = NavigationState {
        service_id: Some("LO-0215".into()),
        role: Some("Logistics Officer".into()),
        base_id: Some("4".into()),
        name: Some("O. Saleh".into()),
    };
    let response = app
        .request(
            Method::GET,
            &format!("/logistics-dashboard?{}", nav.to_query()),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let data = response_json(response).await["data"].clone();
    assert_eq!(data["item_count"], 2);
    assert_eq!(data["ticket_count"], 1);
    assert_eq!(data["consignments"][0]["ticket_id"], "1001");
    assert_eq!(data["inventory"][0]["display_stock"], 45);
}

#[tokio::test]
async fn personnel_see_their_base_card_and_shelf() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::GET,
            "/military-dashboard?service_id=MP-0342&base_id=3&name=L.%20Park",
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let data = response_json(response).await["data"].clone();
    assert_eq!(data["name"], "L. Park");
    assert_eq!(data["base"]["code"], "SEN");
    assert_eq!(data["base"]["location"], "Coastal Sector");
    assert_eq!(
        data["inventory"][0],
        json!({ "category": "Vehicle", "model": "LAV-25", "stock": 6 })
    );
}

#[tokio::test]
async fn dashboards_without_a_base_render_empty() {
    let app = TestApp::new();
    let response = app.request(Method::GET, "/logistics-dashboard", None).await;
    assert_eq!(response.status(), 200);
    let data = response_json(response).await["data"].clone();
    assert_eq!(data["item_count"], 0);
    assert!(data["name"].is_null());
}

#[tokio::test]
async fn status_reports_backend_and_request_id() {
    let app = TestApp::new();
    let response = app.request(Method::GET, "/status", None).await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let body = response_json(response).await;
    assert_eq!(body["data"]["service"], "mams-portal");
    assert_eq!(body["data"]["store_backend"], "in-memory");
}
