#![cfg(feature = "web")]

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use dashboard::app::{AppState, router};
use dashboard::auth::Credentials;
use dashboard::merge::Database;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

// "user:pass"
const BASIC: &str = "Basic dXNlcjpwYXNz";

fn app() -> Router {
    let dir = common::fixture();
    let facts = Database::load(dir.path()).unwrap().merge();
    let credentials = Credentials::new("user", "pass").unwrap();
    router(Arc::new(AppState::new(facts, credentials)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authed(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, BASIC)
        .body(Body::empty())
        .unwrap()
}

async fn json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn api_requires_authentication() {
    let response = app().oneshot(get("/api/revenue")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Basic realm=\"dashboard\""
    );
}

#[tokio::test]
async fn pages_redirect_to_login() {
    let response = app().oneshot(get("/")).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let login = app().oneshot(get("/login")).await.unwrap();
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_basic_credentials_are_rejected() {
    let request = Request::builder()
        .uri("/api/countries")
        // "user:nope"
        .header(header::AUTHORIZATION, "Basic dXNlcjpub3Bl")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_cookie_opens_the_dashboard() {
    let app = app();
    let login = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=user&password=pass"))
        .unwrap();
    let response = app.clone().oneshot(login).await.unwrap();

    assert!(response.status().is_redirection());
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let page = Request::builder()
        .uri("/")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(page).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn bad_login_is_unauthorized() {
    let login = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=user&password=wrong"))
        .unwrap();
    let response = app().oneshot(login).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn tabs_describe_their_controls() {
    let app = app();

    let global = json(app.clone().oneshot(authed("/api/tabs/global")).await.unwrap()).await;
    assert_eq!(global["date_range"]["start"], "2013-01-07");
    assert_eq!(global["date_range"]["end"], "2014-02-10");
    assert_eq!(global["charts"], serde_json::json!(["revenue", "countries"]));

    let channels = json(app.clone().oneshot(authed("/api/tabs/channels")).await.unwrap()).await;
    assert_eq!(channels["default"], "e-Shop");
    assert_eq!(channels["options"].as_array().unwrap().len(), 3);

    let unknown = app.oneshot(authed("/api/tabs/finance")).await.unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revenue_honours_the_date_filter() {
    let app = app();

    let all = json(app.clone().oneshot(authed("/api/revenue")).await.unwrap()).await;
    assert_eq!(all["months"], serde_json::json!(["2013-01-31", "2014-02-28"]));

    let filtered = json(
        app.oneshot(authed("/api/revenue?start=2014-01-01&end=2014-12-31"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(filtered["months"], serde_json::json!(["2014-02-28"]));
}

#[tokio::test]
async fn malformed_or_inverted_dates_are_bad_requests() {
    let app = app();

    let malformed = app
        .clone()
        .oneshot(authed("/api/countries?start=07-01-2013"))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let body = json(malformed).await;
    assert_eq!(body["status"], "error");

    let inverted = app
        .oneshot(authed("/api/countries?start=2014-01-01&end=2013-01-01"))
        .await
        .unwrap();
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_reports_default_to_the_first_store() {
    let app = app();

    let weekdays = json(app.clone().oneshot(authed("/api/weekdays")).await.unwrap()).await;
    assert_eq!(weekdays["best_day"], 0);
    assert_eq!(weekdays["days"][1]["transactions"], 2);

    let segments = json(
        app.oneshot(authed("/api/segments?store=TeleShop"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(segments[0]["country"], "Germany");
}

#[tokio::test]
async fn products_tab_and_subcategory_pivot() {
    let app = app();

    let products = json(app.clone().oneshot(authed("/api/tabs/products")).await.unwrap()).await;
    assert_eq!(products["default"], "Books");
    assert_eq!(
        products["options"],
        serde_json::json!(["Books", "Electronics", "Clothing"])
    );
    assert_eq!(products["charts"], serde_json::json!(["subcategories"]));

    let books = json(
        app.clone()
            .oneshot(authed("/api/subcategories?category=Books"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(books.as_array().unwrap().len(), 1);
    assert_eq!(books[0]["subcategory"], "Fiction");
    assert_eq!(books[0]["female"], Value::Null);
    assert_eq!(books[0]["male"], 221.0);
    assert_eq!(books[0]["total"], Value::Null);

    let electronics = json(
        app.oneshot(authed("/api/subcategories?category=Electronics"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(electronics[0]["subcategory"], "Mobiles");
    assert_eq!(electronics[0]["female"], 55.25);
}

#[tokio::test]
async fn charts_are_served_as_png() {
    let response = app()
        .oneshot(authed("/charts/weekdays.png?store=e-Shop"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[tokio::test]
async fn unknown_chart_is_not_found() {
    let app = app();

    let response = app.clone().oneshot(authed("/charts/pie.png")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(authed("/charts/revenue.svg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csv_export_contains_every_transaction() {
    let response = app().oneshot(authed("/api/export.csv")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("transaction_id,cust_id,tran_date"));
    assert_eq!(lines.count(), 6);
}

#[tokio::test]
async fn xlsx_export_is_a_zip_archive() {
    let response = app()
        .oneshot(authed("/api/export.xlsx?start=2013-01-01&end=2013-12-31"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"PK"));
}
