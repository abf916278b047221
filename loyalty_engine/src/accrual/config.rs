use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5);
/// Shortest allowed gap between scans. A zero period would make the scanner's interval timer panic.
pub const MIN_SCAN_INTERVAL: Duration = Duration::from_millis(1);
pub const DEFAULT_BATCH_SIZE: u32 = 10;
pub const DEFAULT_QUEUE_SIZE: usize = 64;
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for the accrual subsystem. Passed explicitly to every component that needs them.
#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Base URL of the external accrual service, e.g. `http://localhost:8081`. When `None`, workers skip every job.
    pub accrual_system_address: Option<String>,
    /// The number of concurrent workers calling the accrual service.
    pub workers: usize,
    /// How often the scanner looks for orders awaiting a verdict.
    pub scan_interval: Duration,
    /// The maximum number of pending orders fetched per scan.
    pub batch_size: u32,
    /// Capacity of the job channel between the scanner and the workers. A full channel blocks the scanner.
    pub queue_size: usize,
    /// Cooldown applied when the service answers 429 without a usable `Retry-After` header.
    pub default_retry_after: Duration,
    pub request_timeout: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            accrual_system_address: None,
            workers: DEFAULT_WORKERS,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_size: DEFAULT_QUEUE_SIZE,
            default_retry_after: DEFAULT_RETRY_AFTER,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl AccrualConfig {
    pub fn new(accrual_system_address: Option<String>) -> Self {
        Self { accrual_system_address, ..Default::default() }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_scan_interval(mut self, scan_interval: Duration) -> Self {
        self.scan_interval = scan_interval.max(MIN_SCAN_INTERVAL);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    pub fn with_default_retry_after(mut self, default_retry_after: Duration) -> Self {
        self.default_retry_after = default_retry_after;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn setters_clamp_degenerate_values() {
        let config = AccrualConfig::default()
            .with_workers(0)
            .with_scan_interval(Duration::ZERO)
            .with_batch_size(0)
            .with_queue_size(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.scan_interval, MIN_SCAN_INTERVAL);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.queue_size, 1);
        let config = AccrualConfig::default().with_scan_interval(Duration::from_millis(250));
        assert_eq!(config.scan_interval, Duration::from_millis(250));
    }
}
