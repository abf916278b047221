use std::time::Duration;

use log::*;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    accrual::{config::MIN_SCAN_INTERVAL, AccrualConfig},
    db_types::Order,
    traits::OrderManagement,
};

/// What happened on a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// This many orders were handed to the workers.
    Dispatched(usize),
    /// The store could not be read. The next tick will try again.
    StoreUnavailable,
    /// Shutdown was requested, or the workers have gone away. The scanner should stop.
    Stopped,
}

/// Periodically feeds orders that are awaiting a verdict into the job channel.
///
/// The scanner holds no state between ticks. An order that a worker drops (for any reason) is still pending in the
/// store and will be picked up again on a later tick.
pub struct OrderScanner<B> {
    db: B,
    jobs: mpsc::Sender<Order>,
    scan_interval: Duration,
    batch_size: u32,
}

impl<B> OrderScanner<B>
where B: OrderManagement + Send + Sync + 'static
{
    pub fn new(db: B, jobs: mpsc::Sender<Order>, config: &AccrualConfig) -> Self {
        Self { db, jobs, scan_interval: config.scan_interval.max(MIN_SCAN_INTERVAL), batch_size: config.batch_size }
    }

    /// Runs the scanner on its own task until `shutdown` fires or the job channel closes.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut timer = interval(self.scan_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Order scanner started. Scanning every {}ms", self.scan_interval.as_millis());
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            if self.scan_once(&shutdown).await == ScanResult::Stopped {
                break;
            }
        }
        info!("🕰️ Order scanner stopped");
    }

    /// Fetches one batch of pending orders and pushes each onto the job channel.
    ///
    /// A full channel blocks the scan, which is what keeps the scanner from outrunning the workers. Every push races
    /// against `shutdown`.
    pub async fn scan_once(&self, shutdown: &CancellationToken) -> ScanResult {
        let orders = match self.db.fetch_pending_orders(self.batch_size).await {
            Ok(orders) => orders,
            Err(e) => {
                error!("🕰️ Could not fetch pending orders: {e}");
                return ScanResult::StoreUnavailable;
            },
        };
        if orders.is_empty() {
            trace!("🕰️ No orders awaiting a verdict");
            return ScanResult::Dispatched(0);
        }
        debug!("🕰️ {} order(s) awaiting a verdict", orders.len());
        let mut dispatched = 0;
        for order in orders {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("🕰️ Shutdown requested. Abandoning the rest of this scan");
                    return ScanResult::Stopped;
                },
                sent = self.jobs.send(order) => {
                    if sent.is_err() {
                        warn!("🕰️ The job channel has closed. No workers are listening.");
                        return ScanResult::Stopped;
                    }
                    dispatched += 1;
                },
            }
        }
        ScanResult::Dispatched(dispatched)
    }
}
