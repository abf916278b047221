use log::*;
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType, Points},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{OrderManagement, OrderStoreError, VerdictOutcome},
    OrderApi,
    OrderApiError,
    UploadResult,
};

fn number(s: &str) -> OrderNumber {
    OrderNumber::parse(s).unwrap()
}

#[tokio::test]
async fn uploads_are_idempotent_per_owner() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());

    let first = api.upload_order(1, "12345678903").await.unwrap();
    let UploadResult::Accepted(order) = first else {
        panic!("Expected the first upload to be accepted");
    };
    assert_eq!(order.status, OrderStatusType::New);
    assert_eq!(order.accrual, Points::default());
    assert_eq!(order.user_id, 1);

    let second = api.upload_order(1, "12345678903").await.unwrap();
    assert_eq!(second, UploadResult::AlreadyUploaded(order.clone()));

    let err = api.upload_order(2, "12345678903").await.unwrap_err();
    assert!(matches!(err, OrderApiError::UploadedByOther(_)));

    assert_eq!(api.orders_for_user(1).await.unwrap(), vec![order]);
    assert!(api.orders_for_user(2).await.unwrap().is_empty());
    info!("🚀️ Upload idempotency test complete");
}

#[tokio::test]
async fn orders_failing_the_checksum_are_not_stored() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = OrderApi::new(db.clone());
    let err = api.upload_order(1, "1234").await.unwrap_err();
    assert!(matches!(err, OrderApiError::InvalidFormat(_)));
    assert!(db.fetch_orders_for_user(1).await.unwrap().is_empty());
    assert!(db.fetch_pending_orders(10).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_of_one_number_create_one_order() {
    let db = prepare_test_env(&random_db_path()).await;
    let tasks = (1..=10)
        .map(|user_id| {
            let db = db.clone();
            tokio::spawn(async move { db.create_order(&number("79927398713"), user_id).await })
        })
        .collect::<Vec<_>>();
    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(OrderStoreError::UploadedByOther(_)) => conflicts += 1,
            Err(e) => panic!("Unexpected error: {e}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 9);
    let order = db.fetch_order_by_number(&number("79927398713")).await.unwrap().unwrap();
    assert_eq!(db.fetch_orders_for_user(order.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn pending_orders_are_oldest_first_and_bounded() {
    let db = prepare_test_env(&random_db_path()).await;
    let numbers = ["12345678903", "79927398713", "4561261212345467", "2377225624"];
    let mut orders = vec![];
    for n in numbers {
        orders.push(db.create_order(&number(n), 1).await.unwrap());
    }
    db.apply_verdict(orders[0].id, OrderStatusType::Processed, Points::from_points(5)).await.unwrap();
    db.apply_verdict(orders[1].id, OrderStatusType::Processing, Points::default()).await.unwrap();

    let pending = db.fetch_pending_orders(10).await.unwrap();
    let pending = pending.iter().map(|o| o.number.as_str()).collect::<Vec<_>>();
    assert_eq!(pending, vec!["79927398713", "4561261212345467", "2377225624"]);

    let bounded = db.fetch_pending_orders(2).await.unwrap();
    assert_eq!(bounded.len(), 2);
    assert_eq!(bounded[0].number.as_str(), "79927398713");
}

#[tokio::test]
async fn terminal_orders_ignore_later_verdicts() {
    let db = prepare_test_env(&random_db_path()).await;
    let order = db.create_order(&number("12345678903"), 1).await.unwrap();

    let outcome = db.apply_verdict(order.id, OrderStatusType::Processing, Points::default()).await.unwrap();
    assert!(outcome.is_applied());
    assert_eq!(outcome.order().status, OrderStatusType::Processing);

    let outcome = db.apply_verdict(order.id, OrderStatusType::Invalid, Points::default()).await.unwrap();
    assert_eq!(outcome.order().status, OrderStatusType::Invalid);

    for (status, accrual) in [
        (OrderStatusType::Processed, Points::from_points(100)),
        (OrderStatusType::Processing, Points::default()),
        (OrderStatusType::New, Points::default()),
    ] {
        match db.apply_verdict(order.id, status, accrual).await.unwrap() {
            VerdictOutcome::AlreadyTerminal(o) => {
                assert_eq!(o.status, OrderStatusType::Invalid);
                assert_eq!(o.accrual, Points::default());
            },
            VerdictOutcome::Applied(o) => panic!("Terminal order was modified: {o:?}"),
        }
    }

    let err = db.apply_verdict(9999, OrderStatusType::Processing, Points::default()).await.unwrap_err();
    assert!(matches!(err, OrderStoreError::OrderNotFound(9999)));
}
