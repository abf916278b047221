//! # Order accrual reconciliation
//!
//! Orders start life as NEW and wait for the external accrual service to decide how many points they are worth. This
//! module runs the machinery that gets them a verdict:
//!
//! ```text
//!  OrderScanner --(job channel)--> AccrualWorkerPool --> AccrualGateway --> OrderManagement / BalanceLedger
//! ```
//!
//! * The [`OrderScanner`] periodically loads orders that are NEW or PROCESSING and pushes them onto a bounded channel.
//! * Each [`AccrualWorker`] takes an order, asks the accrual service about it and applies the answer.
//! * A single [`RateLimitGate`] pauses the entire pool when the service answers 429.
//!
//! Nothing is kept in memory between scans. Any job that fails, for whatever reason, is simply dropped; the order is
//! still pending in the store and the next scan picks it up again. Duplicate deliveries are harmless because terminal
//! orders cannot change and each order can be credited at most once.
mod config;
mod gateway;
mod rate_gate;
mod scanner;
mod worker_pool;

pub use config::AccrualConfig;
pub use gateway::{
    interpret,
    AccrualGateway,
    AccrualResponse,
    AccrualVerdict,
    ExternalStatus,
    GatewayError,
    GatewayOutcome,
    HttpAccrualGateway,
    CONNECT_RETRY_SCHEDULE,
};
use log::*;
pub use rate_gate::{RateLimitGate, MAX_COOLDOWN};
pub use scanner::{OrderScanner, ScanResult};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
pub use worker_pool::{AccrualWorker, AccrualWorkerPool, JobOutcome, SharedJobReceiver};

use crate::{db_types::Order, events::EventProducers, traits::AccrualSettlement};

/// A running scanner and worker pool.
pub struct AccrualSubsystem {
    jobs: mpsc::Sender<Order>,
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl AccrualSubsystem {
    /// Creates the job channel, then spawns the scanner and `config.workers` workers. Everything stops when `shutdown`
    /// is cancelled.
    pub fn start<B, G>(
        db: B,
        gateway: G,
        config: &AccrualConfig,
        producers: EventProducers,
        shutdown: CancellationToken,
    ) -> Self
    where
        B: AccrualSettlement + Send + Sync + 'static,
        G: AccrualGateway + Send + Sync + 'static,
    {
        let (jobs, receiver) = mpsc::channel(config.queue_size.max(1));
        let pool = AccrualWorkerPool::new(db.clone(), gateway, config, producers);
        let mut handles = pool.spawn(receiver, shutdown.clone());
        handles.push(OrderScanner::new(db, jobs.clone(), config).spawn(shutdown.clone()));
        info!("🕰️ Accrual subsystem started");
        Self { jobs, handles, shutdown }
    }

    /// A sender for pushing orders straight to the workers, e.g. right after an upload.
    pub fn job_sender(&self) -> mpsc::Sender<Order> {
        self.jobs.clone()
    }

    /// Cancels every task and waits for them all to finish.
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.join().await;
    }

    /// Waits for every task to finish. Only returns once the shutdown token has been cancelled.
    pub async fn join(self) {
        drop(self.jobs);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("🕰️ An accrual task ended abnormally: {e}");
            }
        }
        info!("🕰️ Accrual subsystem stopped");
    }
}

/// Pushes `order` onto the job channel if there is room. Returns false if it was not queued.
pub fn try_enqueue(jobs: &mpsc::Sender<Order>, order: Order) -> bool {
    match jobs.try_send(order) {
        Ok(()) => true,
        Err(TrySendError::Full(order)) => {
            debug!("🕰️ Job queue is full. Order {} will be picked up by the scanner", order.number);
            false
        },
        Err(TrySendError::Closed(order)) => {
            warn!("🕰️ Job queue is closed. Order {} was not queued", order.number);
            false
        },
    }
}
