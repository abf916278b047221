use actix_web::{http::StatusCode, test::TestRequest};
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType, Points},
    traits::{AccrualSettlement, OrderManagement},
};
use serde_json::Value;
use tokio::sync::mpsc;

use super::helpers::{as_user, call, new_test_db, send};

fn upload(number: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/user/orders")
        .insert_header(("Content-Type", "text/plain"))
        .set_payload(number.to_string())
}

#[actix_web::test]
async fn requests_without_a_user_are_unauthorized() {
    let db = new_test_db().await;
    let (status, body) = call(&db, upload("12345678903")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("X-User-Id"));
    let req = upload("12345678903").insert_header(("X-User-Id", "bob"));
    let (status, _) = call(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&db, TestRequest::get().uri("/api/user/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let number = OrderNumber::parse("12345678903").unwrap();
    assert!(db.fetch_order_by_number(&number).await.unwrap().is_none());
}

#[actix_web::test]
async fn upload_status_codes() {
    let db = new_test_db().await;
    let (status, body) = call(&db, as_user(upload("12345678903"), 1)).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    let (status, _) = call(&db, as_user(upload("12345678903\n"), 1)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&db, as_user(upload("12345678903"), 2)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("another user"));
    let (status, _) = call(&db, as_user(upload("12345678904"), 1)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(&db, as_user(upload("12a45"), 1)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(&db, as_user(upload("  "), 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let number = OrderNumber::parse("12345678903").unwrap();
    let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();
    assert_eq!(order.user_id, 1);
    assert_eq!(order.status, OrderStatusType::New);
}

#[actix_web::test]
async fn accepted_uploads_are_queued_for_accrual() {
    let db = new_test_db().await;
    let (tx, mut rx) = mpsc::channel(4);
    let (status, _) = send(&db, tx.clone(), as_user(upload("79927398713"), 5)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let queued = rx.try_recv().expect("order was not queued");
    assert_eq!(queued.number.as_str(), "79927398713");
    // A repeat upload is not queued again
    let (status, _) = send(&db, tx, as_user(upload("79927398713"), 5)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(rx.try_recv().is_err());
}

#[actix_web::test]
async fn listing_orders() {
    let db = new_test_db().await;
    let (status, body) = call(&db, as_user(TestRequest::get().uri("/api/user/orders"), 1)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    call(&db, as_user(upload("12345678903"), 1)).await;
    let (status, body) = call(&db, as_user(TestRequest::get().uri("/api/user/orders"), 1)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders[0]["number"], "12345678903");
    assert_eq!(orders[0]["status"], "NEW");
    assert!(orders[0].get("accrual").is_none());
    assert!(orders[0]["uploaded_at"].as_str().unwrap().ends_with('Z'));

    let number = OrderNumber::parse("12345678903").unwrap();
    let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();
    db.settle_processed(&order, Points::from(72998)).await.unwrap();
    let (_, body) = call(&db, as_user(TestRequest::get().uri("/api/user/orders"), 1)).await;
    let orders: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders[0]["status"], "PROCESSED");
    assert_eq!(orders[0]["accrual"], 729.98);

    // Other users see nothing
    let (status, _) = call(&db, as_user(TestRequest::get().uri("/api/user/orders"), 2)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
