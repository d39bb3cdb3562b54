//! System admin dashboard: tabs, base creation, inline edits and
//! reconciliation of derived stock.

mod common;

use axum::http::Method;
use common::{admin_nav, response_json, TestApp};
use mams_portal::store::Table;
use serde_json::{json, Value};

fn admin_uri(path: &str) -> String {
    format!("{path}?{}", admin_nav().to_query())
}

async fn inventory_tab(app: &TestApp) -> Vec<Value> {
    let response = app
        .request(Method::GET, &(admin_uri("/admin-dashboard") + "&tab=inventory"), None)
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["data"]["inventory"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

#[tokio::test]
async fn opening_the_dashboard_shows_the_bases_tab() {
    let app = TestApp::new();
    let response = app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["data"]["tab"], "bases");
    assert_eq!(body["data"]["base"], "Defense HQ");
    assert_eq!(body["data"]["bases"].as_array().map(Vec::len), Some(4));
    assert!(body["data"].get("users").is_none());
    assert!(body["data"].get("load_error").is_none());
}

#[tokio::test]
async fn users_tab_resolves_base_names() {
    let app = TestApp::new();
    let response = app
        .request(Method::GET, &(admin_uri("/admin-dashboard") + "&tab=users"), None)
        .await;
    let body = response_json(response).await;

    let users = body["data"]["users"].as_array().unwrap();
    let okafor = users.iter().find(|u| u["service_id"] == "LO-0220").unwrap();
    assert_eq!(okafor["base"], "Base Ironclad");
}

#[tokio::test]
async fn created_base_is_appended_once() {
    let app = TestApp::new();
    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;

    let response = app
        .request(
            Method::POST,
            &admin_uri("/admin-dashboard/bases"),
            Some(json!({ "name": "Alpha", "code": "A1" })),
        )
        .await;
    assert_eq!(response.status(), 201);
    assert_eq!(response_json(response).await["data"]["name"], "Alpha");

    let response = app
        .request(Method::GET, &(admin_uri("/admin-dashboard") + "&tab=bases"), None)
        .await;
    let bases = response_json(response).await["data"]["bases"].clone();
    let names: Vec<_> = bases
        .as_array()
        .unwrap()
        .iter()
        .filter(|b| b["name"] == "Alpha")
        .collect();
    assert_eq!(names.len(), 1);
    assert_eq!(bases.as_array().map(Vec::len), Some(5));
    assert_eq!(app.store.rows(Table::Bases).await.len(), 5);
}

#[tokio::test]
async fn base_without_code_is_rejected() {
    let app = TestApp::new();
    let response = app
        .request(
            Method::POST,
            &admin_uri("/admin-dashboard/bases"),
            Some(json!({ "name": "Alpha", "code": "" })),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(app.store.rows(Table::Bases).await.len(), 4);
}

#[tokio::test]
async fn saved_transfers_reconcile_into_current_stock() {
    let app = TestApp::new();
    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;
    app.settle_admin(&admin_nav()).await;
    let order_before: Vec<Value> = inventory_tab(&app)
        .await
        .iter()
        .map(|r| r["id"].clone())
        .collect();

    let response = app
        .request(Method::POST, &admin_uri("/admin-dashboard/inventory/4/edit"), None)
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["mode"], "editing");

    let response = app
        .request(
            Method::PATCH,
            &admin_uri("/admin-dashboard/inventory/4/edit"),
            Some(json!({ "stock": "10", "transfer_in": 5, "transfer_out": 2 })),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["edit"]["stock"], 10);

    let response = app
        .request(Method::POST, &admin_uri("/admin-dashboard/inventory/4/save"), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["saved"], true);
    assert_eq!(body["data"]["row"]["mode"], "viewing");

    app.settle_admin(&admin_nav()).await;

    let rows = inventory_tab(&app).await;
    let order_after: Vec<Value> = rows.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(order_before, order_after);
    let saved = rows.iter().find(|r| r["id"] == "4").unwrap();
    assert_eq!(saved["current_stock"], 13);
    assert_eq!(saved["net_movement"], 3);
}

#[tokio::test]
async fn saving_a_row_that_is_not_editing_changes_nothing() {
    let app = TestApp::new();
    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;

    let response = app
        .request(Method::POST, &admin_uri("/admin-dashboard/inventory/1/save"), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["saved"], false);
    assert!(body["data"]["row"].is_null());
}

#[tokio::test]
async fn patching_before_edit_is_a_bad_request() {
    let app = TestApp::new();
    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;

    let response = app
        .request(
            Method::PATCH,
            &admin_uri("/admin-dashboard/inventory/1/edit"),
            Some(json!({ "stock": 1 })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn consignment_save_records_the_admin_as_editor() {
    let app = TestApp::new();
    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;

    app.request(Method::POST, &admin_uri("/admin-dashboard/consignment/1001/edit"), None)
        .await;
    app.request(
        Method::PATCH,
        &admin_uri("/admin-dashboard/consignment/1001/edit"),
        Some(json!({ "status": "delivered" })),
    )
    .await;
    let response = app
        .request(Method::POST, &admin_uri("/admin-dashboard/consignment/1001/save"), None)
        .await;
    assert_eq!(response.status(), 200);

    let row = response_json(response).await["data"]["row"].clone();
    assert_eq!(row["status"], "delivered");
    assert_eq!(row["updated_by"], "R. Hale");
    assert_eq!(row["updated_by_name"], "R. Hale");
    assert_eq!(row["purchase_orders"], 3);
    assert_eq!(row["to_base_name"], "Base Ironclad");

    let stored = app.store.rows(Table::Consignment).await;
    assert_eq!(stored[0]["updated_by"], "R. Hale");
    assert_eq!(stored[0]["assigned_to"], "LO-0215");
}

#[tokio::test]
async fn rejected_save_keeps_the_row_editing() {
    let app = TestApp::new();
    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;
    app.settle_admin(&admin_nav()).await;
    app.store.reject_writes(Table::Inventory).await;

    app.request(Method::POST, &admin_uri("/admin-dashboard/inventory/2/edit"), None)
        .await;
    let response = app
        .request(Method::POST, &admin_uri("/admin-dashboard/inventory/2/save"), None)
        .await;
    assert_eq!(response.status(), 502);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to save changes"));

    let rows = inventory_tab(&app).await;
    let row = rows.iter().find(|r| r["id"] == "2").unwrap();
    assert_eq!(row["mode"], "editing");
}

#[tokio::test]
async fn reopening_discards_unsaved_edits() {
    let app = TestApp::new();
    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;
    app.request(Method::POST, &admin_uri("/admin-dashboard/inventory/3/edit"), None)
        .await;

    app.request(Method::GET, &admin_uri("/admin-dashboard"), None).await;
    let rows = inventory_tab(&app).await;
    assert!(rows.iter().all(|r| r["mode"] == "viewing"));
}
