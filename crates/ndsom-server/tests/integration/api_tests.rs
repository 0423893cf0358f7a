use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::integration::common::{raw, setup_test_app};

/// 10:00 IST.
fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 4, 4, 30, 0).unwrap()
}

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn securities_lists_distinct_sorted() {
    let app = setup_test_app().await;
    app.seed(&[raw("B", "1", "10"), raw("A", "2", "20")], morning())
        .await;

    let (status, json) = get_json(app.router, "/v1/securities").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["securities"], serde_json::json!(["A", "B"]));
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn rows_are_oldest_first() {
    let app = setup_test_app().await;
    app.seed(&[raw("7.26% GS 2033", "5", "10")], morning()).await;
    app.seed(
        &[raw("7.26% GS 2033", "8", "12")],
        morning() + Duration::days(1),
    )
    .await;

    let (status, json) = get_json(app.router, "/v1/securities/7.26%25%20GS%202033/rows").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["security"], "7.26% GS 2033");
    assert_eq!(json["total"], 2);
    assert_eq!(json["rows"][0]["trades"], 5);
    assert_eq!(json["rows"][1]["trades"], 8);
}

#[tokio::test]
async fn daily_totals_group_by_market_day() {
    let app = setup_test_app().await;
    app.seed(&[raw("A", "5", "10.5")], morning()).await;
    app.seed(&[raw("A", "7", "4")], morning() + Duration::days(1))
        .await;

    let (status, json) = get_json(app.router, "/v1/securities/A/daily").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!([
            {"date": "2025-07-04", "trades": 5, "tta": 10.5},
            {"date": "2025-07-05", "trades": 7, "tta": 4.0},
        ])
    );
}

#[tokio::test]
async fn unknown_security_returns_404() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router, "/v1/securities/missing/rows").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let app = setup_test_app().await;

    let (status, json) = get_json(app.router, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/v1/securities"].is_object());
    assert!(json["paths"]["/v1/securities/{security}/daily"].is_object());
}
