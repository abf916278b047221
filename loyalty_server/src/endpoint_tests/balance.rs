use actix_web::{http::StatusCode, test::TestRequest};
use loyalty_engine::{
    db_types::{OrderNumber, Points},
    traits::BalanceLedger,
};
use serde_json::{json, Value};

use super::helpers::{as_user, call, new_test_db};

fn withdraw(order: &str, sum: f64) -> TestRequest {
    TestRequest::post().uri("/api/user/balance/withdraw").set_json(json!({"order": order, "sum": sum}))
}

async fn balance_of(db: &loyalty_engine::SqliteDatabase, user_id: i64) -> Value {
    let (status, body) = call(db, as_user(TestRequest::get().uri("/api/user/balance"), user_id)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_str(&body).unwrap()
}

#[actix_web::test]
async fn new_users_have_a_zero_balance() {
    let db = new_test_db().await;
    assert_eq!(balance_of(&db, 7).await, json!({"current": 0, "withdrawn": 0}));
    let (status, _) = call(&db, as_user(TestRequest::get().uri("/api/user/withdrawals"), 7)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn withdrawing_points() {
    let db = new_test_db().await;
    let purchase = OrderNumber::parse("12345678903").unwrap();
    db.credit(1, Points::from(72998), &purchase).await.unwrap();
    assert_eq!(balance_of(&db, 1).await, json!({"current": 729.98, "withdrawn": 0}));

    let (status, body) = call(&db, as_user(withdraw("2377225624", 500.0), 1)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let op: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(op["order"], "2377225624");
    assert_eq!(op["sum"], 500);
    assert_eq!(balance_of(&db, 1).await, json!({"current": 229.98, "withdrawn": 500}));

    let (status, _) = call(&db, as_user(withdraw("2377225624", 229.99), 1)).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    let (status, _) = call(&db, as_user(withdraw("2377225625", 1.0), 1)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(&db, as_user(withdraw("2377225624", 0.0), 1)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(&db, as_user(withdraw("2377225624", -5.0), 1)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(&db, withdraw("2377225624", 1.0)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(balance_of(&db, 1).await, json!({"current": 229.98, "withdrawn": 500}));

    let (status, _) = call(&db, as_user(withdraw("2377225624", 229.98), 1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance_of(&db, 1).await, json!({"current": 0, "withdrawn": 729.98}));

    let (status, body) = call(&db, as_user(TestRequest::get().uri("/api/user/withdrawals"), 1)).await;
    assert_eq!(status, StatusCode::OK);
    let withdrawals: Value = serde_json::from_str(&body).unwrap();
    let withdrawals = withdrawals.as_array().unwrap();
    assert_eq!(withdrawals.len(), 2);
    let total: f64 = withdrawals.iter().map(|w| w["sum"].as_f64().unwrap()).sum();
    assert!((total - 729.98).abs() < 1e-9);
    assert!(withdrawals.iter().all(|w| w["order"] == "2377225624"));
}
