//! Blocking client core for the Solana Tracker REST API.
//!
//! # Overview
//! Every endpoint goes through one pipeline: arguments are validated, a
//! `RequestDescriptor` is built, and the `Client` executes it with a fixed
//! client-side throttle, transport-level retries for transient failures,
//! and a status-to-error mapping on the final response.
//!
//! # Design
//! - `Settings` are resolved once from defaults, a JSON file, environment
//!   variables and explicit overrides, then owned by the client.
//! - Endpoints are rows in `operations::OPERATIONS`, not methods; callers
//!   use `Client::invoke` with a name and `Args`.
//! - The network sits behind the `Transport` trait; `build_request` and
//!   `classify_response` stay pure so the pipeline is testable without I/O.
//! - The library emits `tracing` events and never installs a subscriber.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod operations;
pub mod retry;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::{Client, HealthReport};
pub use config::{Overrides, Settings};
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{Args, RequestDescriptor};
pub use validate::{validate_token_address, validate_wallet_address};
