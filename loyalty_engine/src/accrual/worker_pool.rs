use std::{sync::Arc, time::Duration};

use log::*;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    accrual::{
        gateway::{interpret, AccrualGateway, AccrualVerdict, ExternalStatus, GatewayError, GatewayOutcome},
        AccrualConfig,
        RateLimitGate,
    },
    db_types::{BalanceOperation, Order, OrderStatusType, Points},
    events::{EventProducers, OrderResolvedEvent},
    traits::{AccrualSettlement, Settlement, VerdictOutcome},
};

/// The receiving half of the job channel, shared by every worker in the pool.
pub type SharedJobReceiver = Arc<Mutex<mpsc::Receiver<Order>>>;

/// What a worker did with one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// No accrual system is configured. Nothing was attempted.
    Skipped,
    /// The service has registered the order but has no verdict yet.
    Unchanged,
    /// The order's status was updated (PROCESSING or INVALID, or PROCESSED with nothing to credit).
    Updated(Order),
    /// The order is PROCESSED and its accrual has been credited.
    Credited { order: Order, operation: BalanceOperation },
    /// A verdict arrived for an order that was already final. Nothing changed.
    AlreadyTerminal(Order),
    /// The service asked us to back off. The whole pool pauses for this long.
    RateLimited(Duration),
    /// The job was abandoned. The order is untouched and will be picked up by a later scan.
    Dropped(String),
    /// Shutdown was requested before the job completed.
    Cancelled,
}

/// Resolves a single order against the accrual service. Cheap to clone: every worker in a pool holds its own copy.
#[derive(Clone)]
pub struct AccrualWorker<B, G> {
    db: B,
    gateway: G,
    gate: Arc<RateLimitGate>,
    default_retry_after: Duration,
    producers: EventProducers,
}

impl<B, G> AccrualWorker<B, G>
where
    B: AccrualSettlement + Send + Sync + 'static,
    G: AccrualGateway + Send + Sync + 'static,
{
    pub fn new(
        db: B,
        gateway: G,
        gate: Arc<RateLimitGate>,
        default_retry_after: Duration,
        producers: EventProducers,
    ) -> Self {
        Self { db, gateway, gate, default_retry_after, producers }
    }

    /// Runs the full procedure for one order. Never fails: anything that goes wrong is logged, and the order is left
    /// for the next scan.
    pub async fn process(&self, order: &Order, shutdown: &CancellationToken) -> JobOutcome {
        if !self.gate.wait_until_open(shutdown).await {
            return JobOutcome::Cancelled;
        }
        let response = tokio::select! {
            _ = shutdown.cancelled() => return JobOutcome::Cancelled,
            response = self.gateway.lookup(&order.number) => response,
        };
        let response = match response {
            Ok(r) => r,
            Err(GatewayError::NotConfigured) => {
                debug!("🕰️ No accrual system configured. Skipping order {}", order.number);
                return JobOutcome::Skipped;
            },
            Err(e) => return dropped(order, e.to_string()),
        };
        match interpret(&order.number, &response, self.default_retry_after) {
            GatewayOutcome::Verdict(verdict) => self.apply(order, verdict).await,
            GatewayOutcome::RateLimited(cooldown) => {
                self.gate.pause_for(cooldown);
                warn!(
                    "🕰️ The accrual system is rate limiting us. All lookups paused for {}s. Order {} will be retried",
                    cooldown.as_secs(),
                    order.number
                );
                JobOutcome::RateLimited(cooldown)
            },
            GatewayOutcome::Unregistered => dropped(order, "Order is not registered with the accrual system".into()),
            GatewayOutcome::ServiceUnavailable(status) => {
                dropped(order, format!("The accrual system is unavailable ({status})"))
            },
            GatewayOutcome::UnexpectedStatus(status) => {
                dropped(order, format!("Unexpected response status {status} from the accrual system"))
            },
            GatewayOutcome::UnknownStatus(status) => {
                error!("🕰️ Protocol error. The accrual system reported an unknown status {status:?}");
                dropped(order, format!("Unknown order status {status}"))
            },
            GatewayOutcome::Malformed(reason) => dropped(order, format!("Malformed response. {reason}")),
        }
    }

    async fn apply(&self, order: &Order, verdict: AccrualVerdict) -> JobOutcome {
        match verdict.status {
            ExternalStatus::Registered => {
                trace!("🕰️ Order {} is registered, but has no verdict yet", order.number);
                JobOutcome::Unchanged
            },
            ExternalStatus::Processing => self.apply_status(order, OrderStatusType::Processing).await,
            ExternalStatus::Invalid => self.apply_status(order, OrderStatusType::Invalid).await,
            ExternalStatus::Processed => self.settle(order, verdict.accrual).await,
        }
    }

    async fn apply_status(&self, order: &Order, status: OrderStatusType) -> JobOutcome {
        match self.db.apply_verdict(order.id, status, Points::default()).await {
            Ok(VerdictOutcome::Applied(updated)) => {
                debug!("🕰️ Order {} is now {status}", updated.number);
                if status.is_terminal() {
                    self.producers.try_publish_order_resolved(OrderResolvedEvent::new(updated.clone(), None));
                }
                JobOutcome::Updated(updated)
            },
            Ok(VerdictOutcome::AlreadyTerminal(current)) => {
                debug!("🕰️ Ignoring {status} for order {}. It is already {}", current.number, current.status);
                JobOutcome::AlreadyTerminal(current)
            },
            Err(e) => dropped(order, e.to_string()),
        }
    }

    async fn settle(&self, order: &Order, accrual: Points) -> JobOutcome {
        match self.db.settle_processed(order, accrual).await {
            Ok(Settlement::Credited { order, operation }) => {
                info!("🕰️ Order {} processed. {} credited to user {}", order.number, operation.amount, order.user_id);
                let event = OrderResolvedEvent::new(order.clone(), Some(operation.clone()));
                self.producers.try_publish_order_resolved(event);
                JobOutcome::Credited { order, operation }
            },
            Ok(Settlement::NothingToCredit(order)) => {
                info!("🕰️ Order {} processed with no accrual", order.number);
                self.producers.try_publish_order_resolved(OrderResolvedEvent::new(order.clone(), None));
                JobOutcome::Updated(order)
            },
            Ok(Settlement::AlreadyCredited(order)) => {
                warn!("🕰️ Order {} moved to PROCESSED, but the ledger already held its accrual", order.number);
                self.producers.try_publish_order_resolved(OrderResolvedEvent::new(order.clone(), None));
                JobOutcome::Updated(order)
            },
            Ok(Settlement::AlreadyTerminal(current)) => {
                debug!("🕰️ Ignoring PROCESSED for order {}. It is already {}", current.number, current.status);
                JobOutcome::AlreadyTerminal(current)
            },
            Err(e) => dropped(order, e.to_string()),
        }
    }

    /// Takes jobs off the shared channel until it closes or `shutdown` fires.
    pub async fn run(self, id: usize, jobs: SharedJobReceiver, shutdown: CancellationToken) {
        debug!("🕰️ Accrual worker {id} started");
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => None,
                order = async { jobs.lock().await.recv().await } => order,
            };
            let Some(order) = next else {
                break;
            };
            let outcome = self.process(&order, &shutdown).await;
            trace!("🕰️ Worker {id}: order {} -> {outcome:?}", order.number);
            if outcome == JobOutcome::Cancelled {
                break;
            }
        }
        debug!("🕰️ Accrual worker {id} stopped");
    }
}

fn dropped(order: &Order, reason: String) -> JobOutcome {
    warn!("🕰️ Dropping order {} for now. {reason}", order.number);
    JobOutcome::Dropped(reason)
}

/// A fixed-size pool of [`AccrualWorker`]s sharing one job channel and one [`RateLimitGate`].
pub struct AccrualWorkerPool<B, G> {
    worker: AccrualWorker<B, G>,
    size: usize,
}

impl<B, G> AccrualWorkerPool<B, G>
where
    B: AccrualSettlement + Send + Sync + 'static,
    G: AccrualGateway + Send + Sync + 'static,
{
    pub fn new(db: B, gateway: G, config: &AccrualConfig, producers: EventProducers) -> Self {
        let gate = Arc::new(RateLimitGate::new());
        let worker = AccrualWorker::new(db, gateway, gate, config.default_retry_after, producers);
        Self { worker, size: config.workers.max(1) }
    }

    pub fn gate(&self) -> Arc<RateLimitGate> {
        Arc::clone(&self.worker.gate)
    }

    pub fn worker(&self) -> &AccrualWorker<B, G> {
        &self.worker
    }

    /// Spawns every worker. They stop when `shutdown` fires or every sender of the job channel has been dropped.
    pub fn spawn(self, jobs: mpsc::Receiver<Order>, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let jobs: SharedJobReceiver = Arc::new(Mutex::new(jobs));
        info!("🕰️ Starting {} accrual worker(s)", self.size);
        (0..self.size)
            .map(|id| {
                let worker = self.worker.clone();
                tokio::spawn(worker.run(id, Arc::clone(&jobs), shutdown.clone()))
            })
            .collect()
    }
}
