//! Blocking client for the tracker API.
//!
//! # Design
//! `Client` owns its resolved `Settings` and one `Transport`; nothing else
//! survives between calls. `execute` runs the whole pipeline for a single
//! descriptor:
//!
//! 1. build the request (base URL, default headers, encoded body),
//! 2. sleep the fixed client-side throttle,
//! 3. send, retrying 429/5xx, timeouts and connection failures with
//!    exponential backoff until the retry budget is spent (a POST only
//!    retries failed connections),
//! 4. classify the last outcome into a decoded body or a typed `Error`.
//!
//! Calls block the current thread. A client can be shared by reference,
//! but the transport's pool is the only shared state, so concurrent callers
//! should prefer one client per worker.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::http::{build_request, classify_response, HttpMethod};
use crate::operations;
use crate::retry::RetryPolicy;
use crate::transport::{Transport, TransportError, UreqTransport};
use crate::types::{Args, RequestDescriptor};

pub struct Client {
    settings: Settings,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
}

/// Outcome of `Client::health_check`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub credits_remaining: Option<Value>,
    pub error: Option<String>,
    /// Unix seconds.
    pub checked_at: u64,
}

impl Client {
    pub fn new(settings: Settings) -> Self {
        let transport = UreqTransport::new(&settings);
        Self::with_transport(settings, transport)
    }

    pub fn with_transport(settings: Settings, transport: impl Transport + 'static) -> Self {
        info!(base_url = settings.base_url(), "tracker client initialized");
        Self {
            retry: RetryPolicy::from_settings(&settings),
            settings,
            transport: Box::new(transport),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.execute(&RequestDescriptor::get(path))
    }

    pub fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.execute(&RequestDescriptor::post(path, body))
    }

    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        self.execute(&RequestDescriptor {
            method,
            path: path.to_owned(),
            query,
            body,
            timeout,
        })
    }

    /// Run a registry operation by name.
    pub fn invoke(&self, operation: &str, args: &Args) -> Result<Value> {
        let descriptor = operations::find(operation)?.descriptor(args)?;
        self.execute(&descriptor)
    }

    pub fn execute(&self, descriptor: &RequestDescriptor) -> Result<Value> {
        let request = build_request(&self.settings, descriptor)?;
        let timeout = descriptor.timeout.unwrap_or_else(|| self.settings.timeout());

        let delay = self.settings.rate_limit_delay();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut schedule = self.retry.schedule();
        let mut attempt = 1u32;
        loop {
            debug!(
                method = request.method.as_str(),
                url = %request.url,
                attempt,
                "sending request"
            );
            let outcome = self.transport.send(&request, timeout);

            let idempotent = RetryPolicy::is_idempotent(request.method);
            let retryable = match &outcome {
                Ok(response) => idempotent && RetryPolicy::is_retryable_status(response.status),
                Err(TransportError::Timeout) => idempotent,
                Err(TransportError::Connect(_)) => true,
                Err(TransportError::Other(_)) => false,
            };
            if retryable {
                if let Some(wait) = schedule.next_delay() {
                    let reason = match &outcome {
                        Ok(response) => format!("status {}", response.status),
                        Err(e) => e.to_string(),
                    };
                    warn!(
                        url = %request.url,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        %reason,
                        "retrying request"
                    );
                    thread::sleep(wait);
                    attempt += 1;
                    continue;
                }
            }

            return match outcome {
                Ok(response) => {
                    debug!(
                        url = %request.url,
                        status = response.status,
                        body_len = response.body.len(),
                        "response received"
                    );
                    classify_response(response)
                }
                Err(e) => Err(transport_failure(e, timeout)),
            };
        }
    }

    /// Probe the `credits` endpoint. Failures are reported, never returned.
    pub fn health_check(&self) -> HealthReport {
        let checked_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        match self.invoke("get_credits", &Args::new()) {
            Ok(credits) => HealthReport {
                healthy: true,
                credits_remaining: credits.get("credits").cloned(),
                error: None,
                checked_at,
            },
            Err(e) => HealthReport {
                healthy: false,
                credits_remaining: None,
                error: Some(e.to_string()),
                checked_at,
            },
        }
    }
}

fn transport_failure(err: TransportError, timeout: Duration) -> Error {
    match err {
        TransportError::Timeout => Error::api(format!(
            "request timeout after {} seconds",
            timeout.as_secs_f64()
        )),
        TransportError::Connect(detail) => {
            Error::api(format!("connection error - unable to reach API: {detail}"))
        }
        TransportError::Other(detail) => Error::api(format!("request failed: {detail}")),
    }
}
