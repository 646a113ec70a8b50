//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Everything in it is read-only after startup:
//! the schema registry, the dispatcher built over it, the pre-rendered
//! OpenAPI document and, when enabled, the Prometheus handle.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use acord_core::Clock;
use acord_schema::SchemaRegistry;
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;

use crate::delivery::DeliverySink;
use crate::dispatcher::Dispatcher;

/// Default request body limit: 2 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Default delivery queue capacity.
pub const DEFAULT_DELIVERY_CAPACITY: usize = 1024;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// A configuration variable held an unusable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value '{value}' for {var}: {reason}")]
pub struct ConfigError {
    /// Environment variable name.
    pub var: &'static str,
    /// Offending value.
    pub value: String,
    /// What was expected.
    pub reason: String,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Registry file to load instead of the built-in forms.
    pub schema_file: Option<PathBuf>,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Whether to install the Prometheus recorder and mount `/metrics`.
    pub metrics_enabled: bool,
    /// Delivery queue capacity.
    pub delivery_capacity: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            schema_file: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            metrics_enabled: true,
            delivery_capacity: DEFAULT_DELIVERY_CAPACITY,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// | Variable                  | Default         |
    /// |---------------------------|-----------------|
    /// | `ACORD_PORT` (or `PORT`)  | `8080`          |
    /// | `ACORD_SCHEMA_FILE`       | built-in forms  |
    /// | `ACORD_MAX_BODY_BYTES`    | `2097152`       |
    /// | `ACORD_METRICS_ENABLED`   | `true`          |
    /// | `ACORD_DELIVERY_CAPACITY` | `1024`          |
    /// | `ACORD_LOG_FORMAT`        | `text`          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let port = match lookup("ACORD_PORT") {
            Some(raw) => parse_var("ACORD_PORT", raw)?,
            None => match lookup("PORT") {
                Some(raw) => parse_var("PORT", raw)?,
                None => defaults.port,
            },
        };

        Ok(Self {
            port,
            schema_file: lookup("ACORD_SCHEMA_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            max_body_bytes: parse_opt("ACORD_MAX_BODY_BYTES", &lookup)?
                .unwrap_or(defaults.max_body_bytes),
            metrics_enabled: match lookup("ACORD_METRICS_ENABLED") {
                Some(raw) => parse_flag("ACORD_METRICS_ENABLED", raw)?,
                None => defaults.metrics_enabled,
            },
            delivery_capacity: parse_opt("ACORD_DELIVERY_CAPACITY", &lookup)?
                .unwrap_or(defaults.delivery_capacity),
            log_format: parse_opt("ACORD_LOG_FORMAT", &lookup)?.unwrap_or(defaults.log_format),
        })
    }
}

fn parse_var<T>(var: &'static str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed: Result<T, T::Err> = raw.trim().parse();
    parsed.map_err(|e| ConfigError {
        var,
        reason: e.to_string(),
        value: raw,
    })
}

fn parse_opt<T>(
    var: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var).map(|raw| parse_var(var, raw)).transpose()
}

fn parse_flag(var: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            value: raw,
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub dispatcher: Arc<Dispatcher>,
    pub openapi: Arc<utoipa::openapi::OpenApi>,
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state over a loaded registry.
    pub fn new(
        config: AppConfig,
        registry: SchemaRegistry,
        clock: Arc<dyn Clock>,
        delivery: Arc<dyn DeliverySink>,
    ) -> Self {
        let openapi = crate::openapi::document(&registry);
        let dispatcher = Dispatcher::new(Arc::new(registry), clock, delivery);
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            openapi: Arc::new(openapi),
            metrics: None,
        }
    }

    /// Attach an installed Prometheus recorder's handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The loaded schema registry.
    pub fn registry(&self) -> &SchemaRegistry {
        self.dispatcher.registry()
    }
}
