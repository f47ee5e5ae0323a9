//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tally_core::db::Database;
use tower::ServiceExt;

const BOUNDARY: &str = "----tally-test-boundary";

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    db.ensure_default_household().unwrap();
    let app = create_router(db.clone(), ServerConfig::default());
    (app, db)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a multipart upload body with a statement file and an account id
fn multipart_upload(filename: &str, content: &str, account_id: i64) -> Request<Body> {
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {content}\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"account_id\"\r\n\r\n\
         {account_id}\r\n\
         --{b}--\r\n",
        b = BOUNDARY,
    );

    Request::builder()
        .method("POST")
        .uri("/api/imports")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create_test_account(app: &Router, name: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/accounts",
            serde_json::json!({ "name": name }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    get_body_json(response).await["id"].as_i64().unwrap()
}

// ========== Accounts ==========

#[tokio::test]
async fn test_create_and_list_accounts() {
    let (app, _db) = setup_test_app();

    let account_id = create_test_account(&app, "Checking").await;
    assert!(account_id > 0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/accounts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let accounts = json.as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["name"], "Checking");
    assert_eq!(accounts[0]["balance"], 0.0);
}

#[tokio::test]
async fn test_account_not_visible_across_households() {
    let (app, db) = setup_test_app();
    db.create_household("other").unwrap();

    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/accounts/{}", account_id))
                .header(HOUSEHOLD_HEADER, "2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Categories ==========

#[tokio::test]
async fn test_category_delete_guard() {
    let (app, db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            serde_json::json!({ "name": "Groceries", "kind": "expense" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let category_id = get_body_json(response).await["id"].as_i64().unwrap();

    db.insert_transaction(
        1,
        &tally_core::models::NewTransaction {
            account_id,
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            amount: 12.0,
            kind: tally_core::models::TransactionKind::Expense,
            description: "MARKET".to_string(),
            payee: None,
            category_id: Some(category_id),
            external_id: None,
        },
    )
    .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/categories/{}", category_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Imports ==========

const TEST_CSV: &str = "Date,Amount,Type,Check,Description\n\
    01/15/2024,-42.50,*,*,AMAZON.COM*ABC123\n\
    01/16/2024,1200.00,*,*,PAYROLL ACME CORP\n\
    garbage-line\n";

#[tokio::test]
async fn test_upload_csv_stages_rows() {
    let (app, _db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(multipart_upload("jan.csv", TEST_CSV, account_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["batch"]["total_rows"], 2);
    assert_eq!(json["batch"]["format"], "csv");
    assert_eq!(json["batch"]["finalized"], false);
    assert_eq!(json["duplicates"], 0);

    // Rows are staged, nothing hit the ledger yet
    let batch_id = json["batch"]["id"].as_i64().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/imports/{}/rows", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let rows = get_body_json(response).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["status"], "pending");
    assert_eq!(rows[0]["amount"], -42.5);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_upload_rejects_unknown_extension() {
    let (app, _db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(multipart_upload("statement.pdf", "whatever", account_id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_unknown_account_is_not_found() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(multipart_upload("jan.csv", TEST_CSV, 999))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_applies_rules() {
    let (app, _db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            serde_json::json!({ "name": "Shopping", "kind": "expense" }),
        ))
        .await
        .unwrap();
    let category_id = get_body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rules",
            serde_json::json!({
                "pattern": "AMAZON",
                "match_type": "contains",
                "category_id": category_id,
                "payee": "Amazon",
                "priority": 10
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(multipart_upload("jan.csv", TEST_CSV, account_id))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["auto_matched"], 1);

    let batch_id = json["batch"]["id"].as_i64().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/imports/{}/rows", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let rows = get_body_json(response).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows[0]["status"], "auto_matched");
    assert_eq!(rows[0]["suggested_category_id"], category_id);
    assert_eq!(rows[0]["payee"], "Amazon");
    assert_eq!(rows[1]["status"], "pending");
}

#[tokio::test]
async fn test_confirm_flow_updates_ledger_and_balance() {
    let (app, _db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(multipart_upload("jan.csv", TEST_CSV, account_id))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let batch_id = json["batch"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/imports/{}/rows", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let rows = get_body_json(response).await;
    let decisions: Vec<serde_json::Value> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| serde_json::json!({ "row_id": r["id"], "skip": false }))
        .collect();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/imports/{}/confirm", batch_id),
            serde_json::json!({ "decisions": decisions }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let batch = get_body_json(response).await;
    assert_eq!(batch["finalized"], true);
    assert_eq!(batch["imported_count"], 2);
    assert_eq!(batch["skipped_count"], 0);

    // Balance moved by the signed sum: -42.50 + 1200.00
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/accounts/{}", account_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let account = get_body_json(response).await;
    assert_eq!(account["balance"], 1157.5);

    // Ledger now holds both transactions with inferred kinds
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total"], 2);
    let kinds: Vec<&str> = json["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"income"));
    assert!(kinds.contains(&"expense"));

    // A second confirm is rejected
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/imports/{}/confirm", batch_id),
            serde_json::json!({ "decisions": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reimport_flags_duplicates() {
    let (app, _db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let ofx = "<BANKTRANLIST>\n\
        <STMTTRN>\n<DTPOSTED>20240115\n<TRNAMT>-42.50\n<FITID>F1\n<NAME>AMAZON.COM\n</STMTTRN>\n\
        </BANKTRANLIST>";

    // First upload and confirm
    let response = app
        .clone()
        .oneshot(multipart_upload("jan.ofx", ofx, account_id))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let batch_id = json["batch"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/imports/{}/rows", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let rows = get_body_json(response).await;
    let row_id = rows.as_array().unwrap()[0]["id"].as_i64().unwrap();

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/imports/{}/confirm", batch_id),
            serde_json::json!({ "decisions": [{ "row_id": row_id, "skip": false }] }),
        ))
        .await
        .unwrap();

    // Second upload of the identical file: tier-1 duplicate
    let response = app
        .clone()
        .oneshot(multipart_upload("jan-again.ofx", ofx, account_id))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["duplicates"], 1);
    assert_eq!(json["batch"]["duplicate_count"], 1);
}

#[tokio::test]
async fn test_cancel_import() {
    let (app, _db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(multipart_upload("jan.csv", TEST_CSV, account_id))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let batch_id = json["batch"]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/imports/{}/cancel", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/imports/{}", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Rules ==========

#[tokio::test]
async fn test_rules_test_endpoint() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            serde_json::json!({ "name": "Dining", "kind": "expense" }),
        ))
        .await
        .unwrap();
    let category_id = get_body_json(response).await["id"].as_i64().unwrap();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/rules",
            serde_json::json!({
                "pattern": "^DOORDASH",
                "match_type": "regex",
                "category_id": category_id,
                "priority": 10
            }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rules/test",
            serde_json::json!({ "description": "DoorDash*Thai Palace" }),
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["matched"], true);
    assert_eq!(json["category_id"], category_id);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/rules/test",
            serde_json::json!({ "description": "GRUBHUB ORDER" }),
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["matched"], false);
}

// ========== Recurring ==========

#[tokio::test]
async fn test_recurring_lifecycle() {
    let (app, _db) = setup_test_app();
    let account_id = create_test_account(&app, "Checking").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/recurring",
            serde_json::json!({
                "account_id": account_id,
                "description": "RENT",
                "amount": 1500.0,
                "kind": "expense",
                "frequency": "monthly",
                "interval": 1,
                "day_of_period": 31,
                "start_date": "2024-01-01"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let rec_id = json["id"].as_i64().unwrap();
    // Day 31 clamped into February of a leap year
    assert_eq!(json["next_occurrence"], "2024-02-29");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/recurring/{}/process", rec_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["next_occurrence"], "2024-03-31");

    // The occurrence landed in the ledger and moved the balance
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/accounts/{}", account_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let account = get_body_json(response).await;
    assert_eq!(account["balance"], -1500.0);
}
