//! Command line and environment configuration.
//!
//! [`Cli`] is what the user types; [`Settings`] is the validated, immutable
//! record the forwarder is built from. Validation happens once, before any
//! message is pulled, and every problem is a [`PushError::Config`].
//!
//! | Flag | Environment | Default |
//! |------|-------------|---------|
//! | `--project` | `PUBSUB_PUSH_PROJECT` | required |
//! | `--sub` | `PUBSUB_PUSH_SUBSCRIPTION` | required |
//! | `--endpoint` | `PUBSUB_PUSH_ENDPOINT` | required |
//! | `--header` (repeatable) | | none |
//! | `--timeout-ms` | `PUBSUB_PUSH_TIMEOUT_MS` | no timeout |
//! | `--max-outstanding` | `PUBSUB_PUSH_MAX_OUTSTANDING` | 1000 |
//! | `--log-format` | `PUBSUB_PUSH_LOG_FORMAT` | `text` |

use crate::client::{ClientConfig, DeliveryClient};
use crate::error::{PushError, Result};
use crate::forwarder::DEFAULT_MAX_OUTSTANDING;
use crate::protocol::HeaderSet;
use clap::{Parser, ValueEnum};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use url::Url;

/// Environment variable pointing at the service account key file.
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable pointing the Pub/Sub client at a local emulator.
pub const ENV_EMULATOR_HOST: &str = "PUBSUB_EMULATOR_HOST";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Pull messages from a Pub/Sub subscription and push them to an HTTP endpoint.
#[derive(Debug, Clone, Parser)]
#[command(name = "pubsub-push", version, about)]
pub struct Cli {
    /// Google Cloud Project ID
    #[arg(long, env = "PUBSUB_PUSH_PROJECT", default_value = "")]
    pub project: String,

    /// Subscription name only, without prefix
    #[arg(long = "sub", env = "PUBSUB_PUSH_SUBSCRIPTION", default_value = "")]
    pub subscription: String,

    /// Endpoint, format = http://host:port/path
    #[arg(long, env = "PUBSUB_PUSH_ENDPOINT", default_value = "")]
    pub endpoint: String,

    /// A header to send with every message, format key=value. Can be repeated.
    #[arg(long = "header", value_name = "KEY=VALUE")]
    pub headers: Vec<String>,

    /// Request timeout in milliseconds
    #[arg(long, env = "PUBSUB_PUSH_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum number of messages being pushed at the same time
    #[arg(long, env = "PUBSUB_PUSH_MAX_OUTSTANDING", default_value_t = DEFAULT_MAX_OUTSTANDING)]
    pub max_outstanding: usize,

    /// Log output format
    #[arg(long, env = "PUBSUB_PUSH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Google Cloud project id
    pub project_id: String,
    /// Subscription name, without the `projects/.../subscriptions/` prefix
    pub subscription: String,
    /// Absolute http(s) endpoint
    pub endpoint: Url,
    /// Headers added to every request
    pub headers: HeaderSet,
    /// Transport configuration
    pub client: ClientConfig,
    /// In-flight message limit
    pub max_outstanding: usize,
    /// Log output format
    pub log_format: LogFormat,
}

impl Cli {
    /// Validate the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Config`] when a required value is empty, the
    /// endpoint is not an absolute http(s) URL or `max_outstanding` is zero.
    ///
    /// Header entries are not checked here; see [`HeaderSet`].
    pub fn into_settings(self) -> Result<Settings> {
        let project_id = required("project", self.project)?;
        let subscription = required("sub", self.subscription)?;
        let endpoint = parse_endpoint(&required("endpoint", self.endpoint)?)?;

        let headers: HeaderSet = self.headers.into_iter().collect();

        if self.max_outstanding == 0 {
            return Err(PushError::Config(
                "max-outstanding must be greater than zero".to_string(),
            ));
        }

        Ok(Settings {
            project_id,
            subscription,
            endpoint,
            headers,
            client: ClientConfig {
                request_timeout_ms: self.timeout_ms,
                ..Default::default()
            },
            max_outstanding: self.max_outstanding,
            log_format: self.log_format,
        })
    }
}

impl Settings {
    /// Build the delivery client described by these settings.
    pub fn delivery_client(&self) -> Result<DeliveryClient> {
        DeliveryClient::with_config(self.endpoint.clone(), &self.headers, self.client.clone())
    }
}

fn required(flag: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(PushError::Config(format!("--{} is required", flag)));
    }
    Ok(value)
}

/// Parse and check the push endpoint.
pub fn parse_endpoint(value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| PushError::Config(format!("Invalid endpoint '{}': {}", value, e)))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(PushError::Config(format!(
            "Endpoint must be an absolute http or https URL, got '{}'",
            value
        ))),
    }
}

/// Locate the credentials file.
///
/// Returns `Ok(None)` when no key file is set but [`ENV_EMULATOR_HOST`] is,
/// since the emulator needs no credentials. Whether the file is usable is
/// left to the Pub/Sub client.
///
/// Takes `std::env::vars_os()`, so variables that are not valid UTF-8 are
/// fine.
pub fn credentials_path<K, V>(env_vars: impl IntoIterator<Item = (K, V)>) -> Result<Option<PathBuf>>
where
    K: Into<OsString>,
    V: Into<OsString>,
{
    let env_vars: HashMap<OsString, OsString> = env_vars
        .into_iter()
        .map(|(key, val)| (key.into(), val.into()))
        .filter(|(key, val)| (key == ENV_CREDENTIALS || key == ENV_EMULATOR_HOST) && !val.is_empty())
        .collect();

    if let Some(path) = env_vars.get(&OsString::from(ENV_CREDENTIALS)) {
        return Ok(Some(PathBuf::from(path)));
    }
    if env_vars.contains_key(&OsString::from(ENV_EMULATOR_HOST)) {
        return Ok(None);
    }
    Err(PushError::Config(format!(
        "You need to define {} variable with the correct credentials",
        ENV_CREDENTIALS
    )))
}
