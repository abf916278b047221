//! Server configuration
//!
//! Everything is read from `LPS_*` environment variables. Bad values are logged and replaced by the default, so a typo
//! never stops the server from starting. The one exception is `LPS_DATABASE_URL`, which has no sensible default.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use loyalty_common::helpers::{parse_boolean_flag, parse_seconds};
use loyalty_engine::AccrualConfig;

const DEFAULT_LPS_HOST: &str = "127.0.0.1";
const DEFAULT_LPS_PORT: u16 = 8080;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the schema is migrated before the server starts accepting requests.
    pub run_migrations: bool,
    /// Settings handed to the accrual scanner and workers.
    pub accrual: AccrualConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_LPS_HOST.to_string(),
            port: DEFAULT_LPS_PORT,
            database_url: String::default(),
            run_migrations: true,
            accrual: AccrualConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("LPS_HOST").ok().unwrap_or_else(|| DEFAULT_LPS_HOST.into());
        let port = env_or("LPS_PORT", DEFAULT_LPS_PORT);
        let database_url = env::var("LPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LPS_DATABASE_URL is not set. Please set it to the URL for the loyalty database.");
            String::default()
        });
        let run_migrations = parse_boolean_flag(env::var("LPS_RUN_MIGRATIONS").ok(), true);
        let accrual = accrual_config_from_env();
        Self { host, port, database_url, run_migrations, accrual }
    }
}

fn accrual_config_from_env() -> AccrualConfig {
    let address = env::var("LPS_ACCRUAL_SYSTEM_ADDRESS").ok().filter(|s| !s.trim().is_empty());
    match &address {
        Some(a) => info!("🪛️ Accrual service address: {a}"),
        None => warn!(
            "🪛️ LPS_ACCRUAL_SYSTEM_ADDRESS is not set. Orders will be accepted, but will stay NEW until the accrual \
             service is configured."
        ),
    }
    let defaults = AccrualConfig::default();
    AccrualConfig::new(address)
        .with_workers(env_or("LPS_ACCRUAL_WORKERS", defaults.workers))
        .with_scan_interval(seconds_or("LPS_SCAN_INTERVAL_SECS", defaults.scan_interval))
        .with_batch_size(env_or("LPS_SCAN_BATCH_SIZE", defaults.batch_size))
        .with_queue_size(env_or("LPS_JOB_QUEUE_SIZE", defaults.queue_size))
        .with_default_retry_after(seconds_or("LPS_DEFAULT_RETRY_AFTER_SECS", defaults.default_retry_after))
}

/// Reads and parses `name`, falling back to `default` if it is missing or invalid.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

fn seconds_or(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(s) => match parse_seconds(&s) {
            Some(d) if !d.is_zero() => d,
            _ => {
                error!("🪛️ {s} is not a valid number of seconds for {name}. Using the default, {default:?}, instead.");
                default
            },
        },
        Err(_) => default,
    }
}
