use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    accrual::{AccrualGateway, AccrualResponse, GatewayError},
    db_types::OrderNumber,
};

/// An [`AccrualGateway`] that replays canned answers.
///
/// Responses are queued per order number and handed out in order. Once an order's queue is empty, lookups for it
/// answer 204. Every call is recorded with the (tokio) instant it was made.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    inner: Arc<Mutex<Script>>,
    latency: Duration,
}

#[derive(Default)]
struct Script {
    responses: HashMap<String, VecDeque<Result<AccrualResponse, GatewayError>>>,
    calls: Vec<(String, Instant)>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup sleeps for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_response(&self, number: &str, response: AccrualResponse) -> &Self {
        self.script().responses.entry(number.to_string()).or_default().push_back(Ok(response));
        self
    }

    pub fn push_error(&self, number: &str, error: GatewayError) -> &Self {
        self.script().responses.entry(number.to_string()).or_default().push_back(Err(error));
        self
    }

    /// Queues a 200 answer with the given status and optional accrual.
    pub fn push_verdict(&self, number: &str, status: &str, accrual: Option<f64>) -> &Self {
        let body = match accrual {
            Some(a) => format!(r#"{{"order":"{number}","status":"{status}","accrual":{a}}}"#),
            None => format!(r#"{{"order":"{number}","status":"{status}"}}"#),
        };
        self.push_response(number, AccrualResponse::new(200, body))
    }

    pub fn push_rate_limit(&self, number: &str, retry_after_secs: u64) -> &Self {
        let response = AccrualResponse::new(429, "No more than N requests per minute allowed")
            .with_retry_after(retry_after_secs.to_string());
        self.push_response(number, response)
    }

    /// Each recorded lookup, as (order number, instant of the call).
    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.script().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script().calls.len()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AccrualGateway for ScriptedGateway {
    async fn lookup(&self, number: &OrderNumber) -> Result<AccrualResponse, GatewayError> {
        let key = number.as_str().to_string();
        self.script().calls.push((key.clone(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.script()
            .responses
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(AccrualResponse::new(204, "")))
    }
}
