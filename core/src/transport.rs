//! The network seam of the executor.
//!
//! # Design
//! `Transport` performs exactly one HTTP exchange and reports either the
//! response, whatever its status, or a transport-level failure. Retries,
//! throttling and status interpretation all live above it in the client, so
//! tests can substitute a scripted transport without a socket.
//!
//! `UreqTransport` keeps a single blocking `ureq::Agent` for the life of the
//! client; the agent pools connections, so sequential calls reuse them.
//! Response bodies are read without a size cap; bulk endpoints routinely
//! exceed ureq's default limit.

use std::io::ErrorKind;
use std::time::Duration;

use ureq::tls::TlsConfig;

use crate::config::Settings;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(settings: &Settings) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(settings.timeout()))
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!settings.verify_ssl())
                    .build(),
            )
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => prepare(self.agent.get(url), request, timeout).call(),
            (HttpMethod::Post, Some(body)) => {
                prepare(self.agent.post(url), request, timeout).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => prepare(self.agent.post(url), request, timeout).send_empty(),
        };
        let mut response = result.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(map_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn prepare<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
    timeout: Duration,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (name, value) in &request.query {
        builder = builder.query(name, value);
    }
    builder.config().timeout_global(Some(timeout)).build()
}

fn map_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        e @ (ureq::Error::HostNotFound | ureq::Error::ConnectionFailed) => {
            TransportError::Connect(e.to_string())
        }
        ureq::Error::Io(io) => match io.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout,
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::AddrNotAvailable => TransportError::Connect(io.to_string()),
            _ => TransportError::Other(io.to_string()),
        },
        other => TransportError::Other(other.to_string()),
    }
}
