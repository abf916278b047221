use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use loyalty_engine::{
    db_types::Order,
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    BalanceApi,
    OrderApi,
    SqliteDatabase,
    WithdrawalApi,
};
use tokio::sync::mpsc;

use crate::{
    identity::USER_ID_HEADER,
    routes::{MyBalanceRoute, MyOrdersRoute, MyWithdrawalsRoute, UploadOrderRoute, WithdrawRoute},
};

pub async fn new_test_db() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

/// Sends `req` to a freshly built app backed by `db`. Accepted uploads land on `jobs`.
pub async fn send(db: &SqliteDatabase, jobs: mpsc::Sender<Order>, req: TestRequest) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(OrderApi::new(db.clone()).with_job_queue(jobs)))
        .app_data(web::Data::new(BalanceApi::new(db.clone())))
        .app_data(web::Data::new(WithdrawalApi::new(db.clone(), EventProducers::default())))
        .service(
            web::scope("/api")
                .service(UploadOrderRoute::<SqliteDatabase>::new())
                .service(MyOrdersRoute::<SqliteDatabase>::new())
                .service(MyBalanceRoute::<SqliteDatabase>::new())
                .service(WithdrawRoute::<SqliteDatabase>::new())
                .service(MyWithdrawalsRoute::<SqliteDatabase>::new()),
        );
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// Like [`send`], but nobody is listening on the job queue.
pub async fn call(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, String) {
    let (jobs, _rx) = mpsc::channel(8);
    send(db, jobs, req).await
}

pub fn as_user(req: TestRequest, user_id: i64) -> TestRequest {
    req.insert_header((USER_ID_HEADER, user_id.to_string()))
}
