use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use loyalty_engine::{
    db_types::Order,
    events::{EventHandlers, EventHooks, EventProducers},
    BalanceApi,
    OrderApi,
    SqliteDatabase,
    WithdrawalApi,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    accrual_worker::start_accrual_worker,
    config::ServerConfig,
    errors::ServerError,
    routes::{health, MyBalanceRoute, MyOrdersRoute, MyWithdrawalsRoute, UploadOrderRoute, WithdrawRoute},
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    if config.database_url.is_empty() {
        return Err(ServerError::ConfigurationError("LPS_DATABASE_URL must be set".into()));
    }
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();

    let shutdown = CancellationToken::new();
    let accrual = start_accrual_worker(db.clone(), &config.accrual, producers.clone(), shutdown.clone())?;
    let srv = create_server_instance(&config, db, accrual.job_sender(), producers)?;
    let result = srv.await.map_err(ServerError::from);
    info!("🚀️ HTTP server stopped. Shutting down the accrual workers");
    accrual.stop().await;
    result
}

pub fn create_server_instance(
    config: &ServerConfig,
    db: SqliteDatabase,
    jobs: mpsc::Sender<Order>,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let orders_api = OrderApi::new(db.clone()).with_job_queue(jobs.clone());
        let balance_api = BalanceApi::new(db.clone());
        let withdrawal_api = WithdrawalApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("lps::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(balance_api))
            .app_data(web::Data::new(withdrawal_api))
            .service(health)
            .service(
                web::scope("/api")
                    .service(UploadOrderRoute::<SqliteDatabase>::new())
                    .service(MyOrdersRoute::<SqliteDatabase>::new())
                    .service(MyBalanceRoute::<SqliteDatabase>::new())
                    .service(WithdrawRoute::<SqliteDatabase>::new())
                    .service(MyWithdrawalsRoute::<SqliteDatabase>::new()),
            )
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Event hooks that write every resolution and withdrawal to the log.
fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_resolved(|ev| {
            Box::pin(async move {
                match ev.credit {
                    Some(op) => info!("📬️ Order {} was processed. {} points credited", ev.order.number, op.amount),
                    None => info!("📬️ Order {} was resolved as {}", ev.order.number, ev.order.status),
                }
            })
        })
        .on_withdrawal(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ User {} withdrew {} points against order {}",
                    ev.operation.user_id, ev.operation.amount, ev.operation.order_reference
                );
            })
        });
    hooks
}
