//! Layered client settings.
//!
//! # Design
//! Settings are resolved once from four layers, lowest priority first:
//! built-in defaults, an optional flat JSON file, `SOLANA_TRACKER_*`
//! environment variables, and explicit `Overrides`. Every layer is reduced
//! to a JSON object and merged key by key, so a layer only replaces the keys
//! it actually sets. The merged object is then deserialized and validated;
//! a missing API key is the one hard failure. Deserializing `Settings`
//! directly takes the same path.
//!
//! Keys the client does not know about are kept in `extra` so that a file
//! loaded, tweaked with `set`, and written back with `save` loses nothing.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.solanatracker.io";
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_RATE_LIMIT_DELAY_SECS: f64 = 0.1;
pub const DEFAULT_USER_AGENT: &str = "SolanaDetective/1.0.0";

pub const ENV_API_KEY: &str = "SOLANA_TRACKER_API_KEY";
pub const ENV_BASE_URL: &str = "SOLANA_TRACKER_BASE_URL";
pub const ENV_TIMEOUT: &str = "SOLANA_TRACKER_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "SOLANA_TRACKER_MAX_RETRIES";

/// Fully resolved client settings.
///
/// Deserializing goes through the same defaults and validation as `resolve`,
/// so every `Settings` value has a key and usable durations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Settings {
    base_url: String,
    /// Per-attempt timeout in seconds.
    timeout: f64,
    max_retries: u32,
    /// Backoff factor in seconds for transport retries.
    retry_delay: f64,
    /// Fixed sleep before every outbound call, in seconds.
    rate_limit_delay: f64,
    user_agent: String,
    verify_ssl: bool,
    api_key: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Explicit caller-supplied values. These win over every other layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Overrides {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }
}

impl Settings {
    /// Resolve settings against the process environment.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        Self::resolve(file, |name| std::env::var(name).ok(), overrides)
    }

    /// Load a settings file, optionally supplying the API key explicitly.
    pub fn from_file(path: impl AsRef<Path>, api_key: Option<&str>) -> Result<Self> {
        let overrides = Overrides {
            api_key: api_key.map(str::to_owned),
            ..Overrides::default()
        };
        Self::load(Some(path.as_ref()), overrides)
    }

    /// Merge all four layers. `env` looks up a variable by name.
    pub fn resolve<F>(file: Option<&Path>, env: F, overrides: Overrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = defaults();
        if let Some(path) = file {
            merged.extend(file_layer(path)?);
        }
        merged.extend(env_layer(env)?);
        match serde_json::to_value(overrides) {
            Ok(Value::Object(layer)) => merged.extend(layer),
            Ok(_) => {}
            Err(e) => return Err(Error::Config(format!("invalid overrides: {e}"))),
        }
        Self::from_map(merged)
    }

    fn from_map(map: Map<String, Value>) -> Result<Self> {
        let mut merged = defaults();
        merged.extend(map);
        let map = merged;

        let has_key = map
            .get("api_key")
            .and_then(Value::as_str)
            .is_some_and(|key| !key.is_empty());
        if !has_key {
            return Err(Error::Config(format!(
                "API key is required: pass it explicitly or set {ENV_API_KEY}"
            )));
        }

        let raw: RawSettings = serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::Config(format!("invalid settings: {e}")))?;
        let settings = Settings {
            base_url: raw.base_url,
            timeout: raw.timeout,
            max_retries: raw.max_retries,
            retry_delay: raw.retry_delay,
            rate_limit_delay: raw.rate_limit_delay,
            user_agent: raw.user_agent,
            verify_ssl: raw.verify_ssl,
            api_key: raw.api_key,
            extra: raw.extra,
        };
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<()> {
        if !(self.timeout.is_finite() && self.timeout > 0.0) {
            return Err(Error::Config(format!(
                "timeout must be positive, got {}",
                self.timeout
            )));
        }
        for (name, value) in [
            ("timeout", self.timeout),
            ("rate_limit_delay", self.rate_limit_delay),
            ("retry_delay", self.retry_delay),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(Error::Config(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Look up any key, known or extra, falling back to `default`.
    pub fn get(&self, key: &str, default: Value) -> Value {
        self.to_dict().remove(key).unwrap_or(default)
    }

    /// Change one key after construction. The result is re-validated, and
    /// `self` is left untouched if the new value is rejected.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut map = self.to_dict();
        map.insert(key.to_owned(), value.into());
        *self = Self::from_map(map)?;
        Ok(())
    }

    pub fn to_dict(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Write every key, the API key included, as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_dict())
            .map_err(|e| Error::Config(format!("serialize settings: {e}")))?;
        fs::write(path, json)
            .map_err(|e| Error::Config(format!("write {}: {e}", path.display())))?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_delay)
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl TryFrom<Map<String, Value>> for Settings {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        Self::from_map(map)
    }
}

/// Field-for-field shape of a merged settings object, before validation.
#[derive(Deserialize)]
struct RawSettings {
    base_url: String,
    timeout: f64,
    max_retries: u32,
    retry_delay: f64,
    rate_limit_delay: f64,
    user_agent: String,
    verify_ssl: bool,
    api_key: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn defaults() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("base_url".into(), DEFAULT_BASE_URL.into());
    map.insert("timeout".into(), DEFAULT_TIMEOUT_SECS.into());
    map.insert("max_retries".into(), DEFAULT_MAX_RETRIES.into());
    map.insert("retry_delay".into(), DEFAULT_RETRY_DELAY_SECS.into());
    map.insert("rate_limit_delay".into(), DEFAULT_RATE_LIMIT_DELAY_SECS.into());
    map.insert("user_agent".into(), DEFAULT_USER_AGENT.into());
    map.insert("verify_ssl".into(), true.into());
    map
}

fn file_layer(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "settings file not found, skipping");
        return Ok(Map::new());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
    match serde_json::from_str(&raw) {
        Ok(Value::Object(map)) => {
            debug!(path = %path.display(), keys = map.len(), "settings file loaded");
            Ok(map)
        }
        Ok(_) => Err(Error::Config(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
        Err(e) => Err(Error::Config(format!("parse {}: {e}", path.display()))),
    }
}

fn env_layer<F>(env: F) -> Result<Map<String, Value>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut map = Map::new();
    if let Some(key) = env(ENV_API_KEY) {
        map.insert("api_key".into(), key.into());
    }
    if let Some(url) = env(ENV_BASE_URL) {
        map.insert("base_url".into(), url.into());
    }
    if let Some(raw) = env(ENV_TIMEOUT) {
        let timeout: f64 = parse_env(ENV_TIMEOUT, &raw)?;
        map.insert("timeout".into(), timeout.into());
    }
    if let Some(raw) = env(ENV_MAX_RETRIES) {
        let retries: u32 = parse_env(ENV_MAX_RETRIES, &raw)?;
        map.insert("max_retries".into(), retries.into());
    }
    Ok(map)
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {name}={raw:?}: {e}")))
}
