use log::*;
use loyalty_engine::{
    accrual::AccrualSubsystem,
    events::EventProducers,
    AccrualConfig,
    HttpAccrualGateway,
    SqliteDatabase,
};
use tokio_util::sync::CancellationToken;

use crate::errors::ServerError;

/// Starts the order scanner and the accrual worker pool. They keep running until `shutdown` is cancelled; then
/// `AccrualSubsystem::join` waits for them to wind down.
pub fn start_accrual_worker(
    db: SqliteDatabase,
    config: &AccrualConfig,
    producers: EventProducers,
    shutdown: CancellationToken,
) -> Result<AccrualSubsystem, ServerError> {
    let gateway = HttpAccrualGateway::new(config).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!(
        "🕰️ Starting {} accrual worker(s). Scanning every {:?} for up to {} orders",
        config.workers, config.scan_interval, config.batch_size
    );
    Ok(AccrualSubsystem::start(db, gateway, config, producers, shutdown))
}
