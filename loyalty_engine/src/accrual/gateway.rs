//! Client for the external accrual service, and the rules for reading its answers.
//!
//! The service exposes a single endpoint, `GET /api/orders/{number}`, which replies with
//! * `200` and a body of `{"order": "...", "status": "...", "accrual": 12.5}`,
//! * `204` if the order is unknown to the service,
//! * `429` with a `Retry-After` header (in seconds) when the caller is being rate limited,
//! * `500` on internal failures.
use std::{future::Future, sync::Arc, time::Duration};

use log::*;
use loyalty_common::helpers::parse_seconds;
use reqwest::{header::RETRY_AFTER, Client};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    accrual::{rate_gate::MAX_COOLDOWN, AccrualConfig},
    db_types::{OrderNumber, Points},
};

/// Delays before each connection attempt. A request that cannot connect after the last attempt is surfaced as
/// [`GatewayError::Connection`].
pub const CONNECT_RETRY_SCHEDULE: [Duration; 4] =
    [Duration::from_secs(0), Duration::from_secs(1), Duration::from_secs(3), Duration::from_secs(5)];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("The accrual system address is not configured")]
    NotConfigured,
    #[error("Could not initialize the accrual client: {0}")]
    Initialization(String),
    #[error("Could not reach the accrual system after {attempts} attempts. {reason}")]
    Connection { attempts: usize, reason: String },
    #[error("Request to the accrual system failed: {0}")]
    Request(String),
}

/// The raw answer from the accrual service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

impl AccrualResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, retry_after: None, body: body.into() }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }
}

pub trait AccrualGateway: Clone {
    /// Asks the accrual service about a single order.
    ///
    /// Connection failures are retried internally on [`CONNECT_RETRY_SCHEDULE`]. Any HTTP response, whatever its
    /// status, is returned as-is for the caller to [`interpret`].
    fn lookup(&self, number: &OrderNumber) -> impl Future<Output = Result<AccrualResponse, GatewayError>> + Send;
}

//--------------------------------------  HttpAccrualGateway  ---------------------------------------------------------
#[derive(Clone)]
pub struct HttpAccrualGateway {
    base_url: Option<String>,
    client: Arc<Client>,
    retry_schedule: Vec<Duration>,
}

impl HttpAccrualGateway {
    pub fn new(config: &AccrualConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        let base_url = config.accrual_system_address.as_deref().map(normalize_base_url);
        if base_url.is_none() {
            warn!("🕰️ No accrual system address is configured. Orders will not be reconciled.");
        }
        Ok(Self { base_url, client: Arc::new(client), retry_schedule: CONNECT_RETRY_SCHEDULE.to_vec() })
    }

    /// Replaces the connection retry delays.
    pub fn with_retry_schedule(mut self, schedule: Vec<Duration>) -> Self {
        self.retry_schedule = schedule;
        self
    }

    pub fn order_url(&self, number: &OrderNumber) -> Result<String, GatewayError> {
        let base = self.base_url.as_ref().ok_or(GatewayError::NotConfigured)?;
        Ok(format!("{base}/api/orders/{}", number.as_str()))
    }

    async fn read_response(response: reqwest::Response) -> Result<AccrualResponse, GatewayError> {
        let status = response.status().as_u16();
        let retry_after = response.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()).map(String::from);
        let body = response.text().await.map_err(|e| GatewayError::Request(e.to_string()))?;
        Ok(AccrualResponse { status, retry_after, body })
    }
}

impl AccrualGateway for HttpAccrualGateway {
    async fn lookup(&self, number: &OrderNumber) -> Result<AccrualResponse, GatewayError> {
        let url = self.order_url(number)?;
        let mut last_error = String::default();
        for (attempt, delay) in self.retry_schedule.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }
            trace!("🕰️ GET {url} (attempt {})", attempt + 1);
            match self.client.get(&url).send().await {
                Ok(response) => return Self::read_response(response).await,
                Err(e) if e.is_connect() => {
                    debug!("🕰️ Could not connect to the accrual system (attempt {}): {e}", attempt + 1);
                    last_error = e.to_string();
                },
                Err(e) => return Err(GatewayError::Request(e.to_string())),
            }
        }
        Err(GatewayError::Connection { attempts: self.retry_schedule.len(), reason: last_error })
    }
}

fn normalize_base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

//--------------------------------------  Response handling   ---------------------------------------------------------
/// The order status as reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStatus {
    /// The service knows about the order but has not started on it.
    Registered,
    Processing,
    Invalid,
    Processed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccrualVerdict {
    pub status: ExternalStatus,
    /// Zero unless `status` is PROCESSED.
    pub accrual: Points,
}

/// What the accrual service said, in terms the worker can act on.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome {
    Verdict(AccrualVerdict),
    /// 429. All calls to the service must pause for this long.
    RateLimited(Duration),
    /// 204. The service does not know the order (yet).
    Unregistered,
    /// 5xx.
    ServiceUnavailable(u16),
    UnexpectedStatus(u16),
    /// The body decoded, but the status is not one we know about.
    UnknownStatus(String),
    /// The body could not be used. Nothing may be applied from it.
    Malformed(String),
}

#[derive(Deserialize)]
struct RawVerdict {
    order: String,
    status: String,
    accrual: Option<f64>,
}

/// Classifies a response to a lookup of `number`.
pub fn interpret(number: &OrderNumber, response: &AccrualResponse, default_retry_after: Duration) -> GatewayOutcome {
    match response.status {
        200 => interpret_verdict(number, &response.body),
        204 => GatewayOutcome::Unregistered,
        429 => {
            let cooldown = response.retry_after.as_deref().and_then(parse_seconds).unwrap_or_else(|| {
                warn!(
                    "🕰️ Rate limited without a usable Retry-After header ({:?}). Backing off for {}s",
                    response.retry_after,
                    default_retry_after.as_secs()
                );
                default_retry_after
            });
            if cooldown > MAX_COOLDOWN {
                warn!(
                    "🕰️ Retry-After of {}s is excessive. Backing off for {}s",
                    cooldown.as_secs(),
                    MAX_COOLDOWN.as_secs()
                );
            }
            GatewayOutcome::RateLimited(cooldown.min(MAX_COOLDOWN))
        },
        s @ 500..=599 => GatewayOutcome::ServiceUnavailable(s),
        s => GatewayOutcome::UnexpectedStatus(s),
    }
}

fn interpret_verdict(number: &OrderNumber, body: &str) -> GatewayOutcome {
    let raw: RawVerdict = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return GatewayOutcome::Malformed(format!("Could not decode verdict: {e}")),
    };
    if raw.order != number.as_str() {
        return GatewayOutcome::Malformed(format!("Asked about {number} but the verdict is for #{}", raw.order));
    }
    let status = match raw.status.as_str() {
        "REGISTERED" => ExternalStatus::Registered,
        "PROCESSING" => ExternalStatus::Processing,
        "INVALID" => ExternalStatus::Invalid,
        "PROCESSED" => ExternalStatus::Processed,
        _ => return GatewayOutcome::UnknownStatus(raw.status),
    };
    let accrual = match (status, raw.accrual) {
        (ExternalStatus::Processed, Some(value)) if value < 0.0 => {
            return GatewayOutcome::Malformed(format!("Negative accrual {value}"));
        },
        (ExternalStatus::Processed, Some(value)) => match Points::try_from(value) {
            Ok(points) => points,
            Err(e) => return GatewayOutcome::Malformed(e.to_string()),
        },
        _ => Points::default(),
    };
    GatewayOutcome::Verdict(AccrualVerdict { status, accrual })
}

#[cfg(test)]
mod test {
    use super::*;

    const DEFAULT_WAIT: Duration = Duration::from_secs(60);

    fn number() -> OrderNumber {
        OrderNumber::parse("12345678903").unwrap()
    }

    fn ok(body: &str) -> GatewayOutcome {
        interpret(&number(), &AccrualResponse::new(200, body), DEFAULT_WAIT)
    }

    #[test]
    fn verdicts() {
        assert_eq!(
            ok(r#"{"order":"12345678903","status":"PROCESSED","accrual":729.98}"#),
            GatewayOutcome::Verdict(AccrualVerdict { status: ExternalStatus::Processed, accrual: Points::from(72998) })
        );
        assert_eq!(
            ok(r#"{"order":"12345678903","status":"PROCESSING"}"#),
            GatewayOutcome::Verdict(AccrualVerdict { status: ExternalStatus::Processing, accrual: Points::default() })
        );
        assert_eq!(
            ok(r#"{"order":"12345678903","status":"REGISTERED"}"#),
            GatewayOutcome::Verdict(AccrualVerdict { status: ExternalStatus::Registered, accrual: Points::default() })
        );
        // An accrual on a non-final status is ignored
        assert_eq!(
            ok(r#"{"order":"12345678903","status":"INVALID","accrual":10}"#),
            GatewayOutcome::Verdict(AccrualVerdict { status: ExternalStatus::Invalid, accrual: Points::default() })
        );
    }

    #[test]
    fn bad_bodies() {
        assert!(matches!(ok("not json"), GatewayOutcome::Malformed(_)));
        assert!(matches!(ok(r#"{"status":"PROCESSED"}"#), GatewayOutcome::Malformed(_)));
        assert!(matches!(ok(r#"{"order":"79927398713","status":"PROCESSED","accrual":5}"#), GatewayOutcome::Malformed(_)));
        assert!(matches!(ok(r#"{"order":"12345678903","status":"PROCESSED","accrual":-5}"#), GatewayOutcome::Malformed(_)));
        assert_eq!(
            ok(r#"{"order":"12345678903","status":"REJECTED"}"#),
            GatewayOutcome::UnknownStatus("REJECTED".into())
        );
    }

    #[test]
    fn status_codes() {
        let n = number();
        let rate_limited = AccrualResponse::new(429, "No more than N requests per minute allowed").with_retry_after("5");
        assert_eq!(interpret(&n, &rate_limited, DEFAULT_WAIT), GatewayOutcome::RateLimited(Duration::from_secs(5)));
        let no_header = AccrualResponse::new(429, "");
        assert_eq!(interpret(&n, &no_header, DEFAULT_WAIT), GatewayOutcome::RateLimited(DEFAULT_WAIT));
        let bad_header = AccrualResponse::new(429, "").with_retry_after("soon");
        assert_eq!(interpret(&n, &bad_header, DEFAULT_WAIT), GatewayOutcome::RateLimited(DEFAULT_WAIT));
        let huge = AccrualResponse::new(429, "").with_retry_after(u64::MAX.to_string());
        assert_eq!(interpret(&n, &huge, DEFAULT_WAIT), GatewayOutcome::RateLimited(MAX_COOLDOWN));
        assert_eq!(interpret(&n, &AccrualResponse::new(204, ""), DEFAULT_WAIT), GatewayOutcome::Unregistered);
        assert_eq!(
            interpret(&n, &AccrualResponse::new(500, "oops"), DEFAULT_WAIT),
            GatewayOutcome::ServiceUnavailable(500)
        );
        assert_eq!(
            interpret(&n, &AccrualResponse::new(404, ""), DEFAULT_WAIT),
            GatewayOutcome::UnexpectedStatus(404)
        );
    }

    #[test]
    fn order_urls() {
        let gateway = HttpAccrualGateway::new(&AccrualConfig::new(Some("localhost:8081/".into()))).unwrap();
        assert_eq!(gateway.order_url(&number()).unwrap(), "http://localhost:8081/api/orders/12345678903");
        let gateway = HttpAccrualGateway::new(&AccrualConfig::new(Some("https://accrual.example".into()))).unwrap();
        assert_eq!(gateway.order_url(&number()).unwrap(), "https://accrual.example/api/orders/12345678903");
        let gateway = HttpAccrualGateway::new(&AccrualConfig::default()).unwrap();
        assert_eq!(gateway.order_url(&number()), Err(GatewayError::NotConfigured));
    }

    #[tokio::test]
    async fn connection_failures_are_retried_then_surfaced() {
        // Nothing listens on port 1
        let config = AccrualConfig::new(Some("http://127.0.0.1:1".into()));
        let gateway = HttpAccrualGateway::new(&config).unwrap().with_retry_schedule(vec![Duration::ZERO; 3]);
        let err = gateway.lookup(&number()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Connection { attempts: 3, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unconfigured_lookup() {
        let gateway = HttpAccrualGateway::new(&AccrualConfig::default()).unwrap();
        assert_eq!(gateway.lookup(&number()).await, Err(GatewayError::NotConfigured));
    }
}
