use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use billmanager_api::{router, AppState, ErrorDetails};
use billmanager_core::{services, CreationFailurePolicy, ImportOptions};
use billmanager_repository::InMemoryRepository;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "billmanager-test-boundary";
const HEADER: &str = "ID,Due Date,Payment Date,Amount,Description,User Email";

fn app_with(options: ImportOptions) -> Router {
    let bills = services(Arc::new(InMemoryRepository::new()));
    router(AppState::new(bills).with_import_options(options))
}

fn app() -> Router {
    app_with(ImportOptions::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

fn multipart_request(field: &str, content_type: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"bills.csv\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri("/api/bill/csv/import")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn register(app: &Router, email: &str) {
    let (status, _) = send_json(
        app,
        Method::POST,
        "/api/users/register",
        json!({ "email": email }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

fn bill_body(description: &str) -> Value {
    json!({
        "dueDate": "2099-12-05",
        "paymentDate": "2099-12-01",
        "amount": "100.00",
        "description": description,
        "user": { "email": "teste@gmail.com" }
    })
}

#[tokio::test]
async fn register_and_create_bill() {
    let app = app();

    let (status, user) = send_json(
        &app,
        Method::POST,
        "/api/users/register",
        json!({ "email": "teste@gmail.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "teste@gmail.com");

    let (status, error) = send_json(
        &app,
        Method::POST,
        "/api/users/register",
        json!({ "email": "teste@gmail.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["message"], "User with email teste@gmail.com already exist.");

    let (status, bill) = send_json(&app, Method::POST, "/api/bill/create", bill_body("Electricity")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bill["billStatus"], "PENDING");
    assert_eq!(bill["dueDate"], "2099-12-05");
    assert_eq!(bill["user"]["email"], "teste@gmail.com");

    let (status, body) = get(&app, &format!("/api/bill/{}", bill["id"])).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched, bill);
}

#[tokio::test]
async fn errors_use_the_error_details_shape() {
    let app = app();

    let (status, body) = get(&app, "/api/bill/41").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: ErrorDetails = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.message, "Bill with id 41 not exist.");
    assert_eq!(error.details, "uri=/api/bill/41");

    let (status, error) = send_json(&app, Method::POST, "/api/bill/create", bill_body("Water")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["message"], "User with email teste@gmail.com not exist.");

    let (status, error) = send_json(
        &app,
        Method::POST,
        "/api/bill/create",
        json!({ "dueDate": "2099-12-05", "paymentDate": "2099-12-01", "amount": "0.05", "description": "x", "user": { "email": "a@b.com" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["message"],
        "The field 'amount' must have a value greater than 0.1"
    );

    let mut past = bill_body("Water");
    past["dueDate"] = json!("2000-01-02");
    let (status, error) = send_json(&app, Method::POST, "/api/bill/create", past).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["message"],
        "The field 'dueDate' must be a date in the future"
    );
}

#[tokio::test]
async fn non_numeric_ids_use_the_error_details_shape() {
    let app = app();

    let (status, body) = get(&app, "/api/bill/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorDetails = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.details, "uri=/api/bill/abc");

    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/api/bill/status/abc/PAID")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorDetails = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.details, "uri=/api/bill/status/abc/PAID");

    let (status, error) =
        send_json(&app, Method::PUT, "/api/bill/update/abc", bill_body("Gas")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"], "uri=/api/bill/update/abc");
}

#[tokio::test]
async fn status_changes_follow_bill_rules() {
    let app = app();
    register(&app, "teste@gmail.com").await;
    let (_, bill) = send_json(&app, Method::POST, "/api/bill/create", bill_body("Gas")).await;
    let id = bill["id"].as_i64().unwrap();

    let patch = |status: &str| {
        Request::builder()
            .method(Method::PATCH)
            .uri(format!("/api/bill/status/{id}/{status}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app, patch("UPDATED")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["message"], "Value invalid to enum BillStatus: UPDATED");

    let (status, body) = send(&app, patch("paid")).await;
    assert_eq!(status, StatusCode::OK);
    let paid: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(paid["billStatus"], "PAID");

    let (status, _) = send(&app, patch("PENDING")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut update = bill_body("Gas");
    update["billStatus"] = json!("PENDING");
    let (status, error) = send_json(&app, Method::PUT, &format!("/api/bill/update/{id}"), update).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["message"],
        "This bill already paid, you can't modify the status of this bill."
    );
}

#[tokio::test]
async fn search_and_period_total() {
    let app = app();
    register(&app, "teste@gmail.com").await;
    for description in ["Electricity", "electricity bill", "Water"] {
        let (status, _) = send_json(&app, Method::POST, "/api/bill/create", bill_body(description)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get(
        &app,
        "/api/bill/search-bills?dueDate=2025-01-01&description=ELECTRIC&size=1",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(page["totalElements"], 2);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["pageNumber"], 0);
    assert_eq!(page["content"].as_array().unwrap().len(), 1);

    let (status, _) = get(&app, "/api/bill/search-bills?dueDate=2025-01-01&description=rent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/api/bill/search-bills?description=rent").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(
        &app,
        "/api/bill/amount-by-period?startDate=2099-12-01&endDate=2099-12-31",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "Total amount between 2099-12-01 and 2099-12-31 : 300.00"
    );
}

#[tokio::test]
async fn csv_import_returns_summary() {
    let app = app();
    register(&app, "teste@gmail.com").await;
    let content = format!(
        "{HEADER}\n\
         1,2024-12-05,2024-12-01,100.00,Electricity,teste@gmail.com\n\
         2,2024-12-05,2024-12-01,,Water,teste@gmail.com\n\
         3,2024-12-05,2024-12-01,10.00,Gas,nobody@gmail.com\n"
    );

    let (status, body) = send(&app, multipart_request("file", "text/csv", &content)).await;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["totalElements"], 1);
    assert_eq!(summary["pageSize"], 1);
    assert_eq!(summary["pageNumber"], 1);
    assert_eq!(summary["totalPages"], 1);
    assert_eq!(
        summary["message"],
        "Check the log, some csv records have errors and have not been imported."
    );
    assert_eq!(summary["content"][0]["description"], "Electricity");
}

#[tokio::test]
async fn csv_import_rejects_bad_uploads() {
    let app = app();
    let content = format!("{HEADER}\n1,2024-12-05,2024-12-01,100.00,Electricity,teste@gmail.com\n");

    let (status, body) = send(&app, multipart_request("file", "application/json", &content)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["message"].as_str().unwrap().starts_with("The file must be a CSV"));

    let (status, body) = send(&app, multipart_request("upload", "text/csv", &content)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["message"], "Required part 'file' is not present.");
}

#[tokio::test]
async fn csv_import_abort_policy_maps_to_unprocessable() {
    let app = app_with(ImportOptions {
        on_failure: CreationFailurePolicy::Abort,
    });
    register(&app, "teste@gmail.com").await;
    let content = format!(
        "{HEADER}\n\
         1,2024-12-05,2024-12-01,100.00,Electricity,teste@gmail.com\n\
         2,2024-12-05,2024-12-01,10.00,Gas,nobody@gmail.com\n"
    );

    let (status, body) = send(&app, multipart_request("file", "text/csv", &content)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error["message"],
        "CSV import stopped at row 2: User with email nobody@gmail.com not exist."
    );

    let (status, _) = get(&app, "/api/bill/1").await;
    assert_eq!(status, StatusCode::OK);
}
