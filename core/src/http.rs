//! HTTP exchange types and the pure halves of the executor.
//!
//! # Design
//! Requests and responses are plain data. `build_request` turns a
//! `RequestDescriptor` into an `HttpRequest` carrying the default headers,
//! and `classify_response` maps a final `HttpResponse` to the decoded body or
//! a typed error. Neither touches the network, so both are tested directly;
//! the I/O in between belongs to a `Transport`.

use serde_json::{json, Value};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::types::RequestDescriptor;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Wait used when a 429 arrives without a usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Attach the base URL and default headers to a descriptor.
pub fn build_request(settings: &Settings, descriptor: &RequestDescriptor) -> Result<HttpRequest> {
    let body = descriptor
        .body
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| Error::api(format!("serialize request body: {e}")))?;

    Ok(HttpRequest {
        method: descriptor.method,
        url: format!(
            "{}{}",
            settings.base_url().trim_end_matches('/'),
            descriptor.path
        ),
        headers: vec![
            (API_KEY_HEADER.to_string(), settings.api_key().to_string()),
            ("user-agent".to_string(), settings.user_agent().to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ],
        query: descriptor.query.clone(),
        body,
    })
}

/// Map the final response of a call to its outcome.
pub fn classify_response(response: HttpResponse) -> Result<Value> {
    match response.status {
        200 => serde_json::from_str(&response.body).map_err(|e| Error::Api {
            message: format!("invalid JSON in response body: {e}"),
            status: Some(200),
            body: Some(raw_body(response.body)),
        }),
        401 => Err(Error::Authentication("invalid API key".to_string())),
        429 => Err(Error::RateLimit {
            retry_after: retry_after_secs(&response),
        }),
        status => {
            let body = match serde_json::from_str(&response.body) {
                Ok(body) => body,
                Err(_) => raw_body(response.body),
            };
            Err(Error::Api {
                message: format!("API request failed with status {status}: {body}"),
                status: Some(status),
                body: Some(body),
            })
        }
    }
}

/// Undecodable bodies are carried as `{"error": <raw text>}` whatever the status.
fn raw_body(text: String) -> Value {
    json!({ "error": text })
}

/// `Retry-After` as whole seconds. HTTP-date values fall back to the default.
pub fn retry_after_secs(response: &HttpResponse) -> u64 {
    response
        .header(RETRY_AFTER_HEADER)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
