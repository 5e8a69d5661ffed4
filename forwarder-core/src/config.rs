//! Forwarder configuration, read from `FORWARDER_*` environment variables.
//!
//! Everything is validated up front by [`Settings::validate`]; a forwarder refuses to start with
//! an invalid configuration, before any record is accepted.
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use backoff::strategy::exponential::Exponential;
use forwarder_kinesis::KINESIS_MAX_BATCH_SIZE;
use forwarder_kinesis::sink::KinesisSinkConfig;

use crate::Result;
use crate::error::Error;

const ENV_STREAM_NAME: &str = "FORWARDER_STREAM_NAME";
const ENV_PARTITION_KEY_FIELDS: &str = "FORWARDER_PARTITION_KEY_FIELDS";
const ENV_BATCH_SIZE: &str = "FORWARDER_BATCH_SIZE";
const ENV_BATCH_INTERVAL_SECS: &str = "FORWARDER_BATCH_INTERVAL_SECS";
const ENV_BATCH_ENABLED: &str = "FORWARDER_BATCH_ENABLED";
const ENV_MAX_RETRY_ATTEMPTS: &str = "FORWARDER_MAX_RETRY_ATTEMPTS";
const ENV_TRANSPORT_FAILURE: &str = "FORWARDER_TRANSPORT_FAILURE";
const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "FORWARDER_SHUTDOWN_TIMEOUT_SECS";
const ENV_AWS_REGION: &str = "FORWARDER_AWS_REGION";
const ENV_ENDPOINT_URL: &str = "FORWARDER_ENDPOINT_URL";

/// Largest batch the remote service accepts in a single write.
pub const SERVICE_MAX_BATCH_SIZE: usize = KINESIS_MAX_BATCH_SIZE;

const DEFAULT_PARTITION_KEY_FIELDS: [&str; 2] = ["partition_key", "id"];
const DEFAULT_BATCH_SIZE: usize = SERVICE_MAX_BATCH_SIZE;
const DEFAULT_BATCH_INTERVAL_SECS: f64 = 1.0;
const DEFAULT_RETRY_INITIAL_INTERVAL_MS: u64 = 100;
const DEFAULT_RETRY_MAX_INTERVAL_MS: u64 = 30_000;
const DEFAULT_RETRY_FACTOR: f64 = 2.0;
const DEFAULT_RETRY_JITTER: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub stream_name: String,
    /// Candidate fields for the partition key, highest priority first.
    pub partition_key_fields: Vec<String>,
    pub batch: BatchConfig,
    pub retry: RetryConfig,
    /// Upper bound on how long shutdown waits for the final drain. None waits forever.
    pub shutdown_timeout: Option<Duration>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub enabled: bool,
    pub max_batch_size: usize,
    pub max_batch_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_batch_size: DEFAULT_BATCH_SIZE,
            max_batch_interval: Duration::from_secs_f64(DEFAULT_BATCH_INTERVAL_SECS),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Err(Error::Config(
                "batching must be enabled, single record delivery is not supported".to_string(),
            ));
        }
        if self.max_batch_size <= 1 || self.max_batch_size > SERVICE_MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "batch size must be greater than 1 and at most {SERVICE_MAX_BATCH_SIZE}, got {}",
                self.max_batch_size
            )));
        }
        if self.max_batch_interval.is_zero() {
            return Err(Error::Config(
                "batch interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to do when the submit call itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportFailurePolicy {
    /// Fail the flush and surface the error.
    #[default]
    Abort,
    /// Treat the call as having rejected every pending record and go through backoff.
    Retry,
}

impl FromStr for TransportFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(TransportFailurePolicy::Abort),
            "retry" => Ok(TransportFailurePolicy::Retry),
            other => Err(Error::Config(format!(
                "unknown transport failure policy {other:?}, expected \"abort\" or \"retry\""
            ))),
        }
    }
}

impl Display for TransportFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailurePolicy::Abort => write!(f, "abort"),
            TransportFailurePolicy::Retry => write!(f, "retry"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub factor: f64,
    pub jitter: f64,
    /// None retries until every record is accepted.
    pub max_attempts: Option<u16>,
    pub transport_failure: TransportFailurePolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(DEFAULT_RETRY_INITIAL_INTERVAL_MS),
            max_interval: Duration::from_millis(DEFAULT_RETRY_MAX_INTERVAL_MS),
            factor: DEFAULT_RETRY_FACTOR,
            jitter: DEFAULT_RETRY_JITTER,
            max_attempts: None,
            transport_failure: TransportFailurePolicy::default(),
        }
    }
}

impl RetryConfig {
    /// A fresh backoff sequence for one flush.
    pub(crate) fn backoff(&self) -> Exponential {
        Exponential::new(
            self.initial_interval,
            self.max_interval,
            self.factor,
            self.jitter,
            self.max_attempts,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.factor < 1.0 {
            return Err(Error::Config(format!(
                "retry factor must be at least 1.0, got {}",
                self.factor
            )));
        }
        if self.jitter < 0.0 {
            return Err(Error::Config(format!(
                "retry jitter must not be negative, got {}",
                self.jitter
            )));
        }
        if self.initial_interval > self.max_interval {
            return Err(Error::Config(
                "initial retry interval must not exceed the max retry interval".to_string(),
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Settings with defaults for everything but the stream name.
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            partition_key_fields: DEFAULT_PARTITION_KEY_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            shutdown_timeout: None,
            region: None,
            endpoint_url: None,
        }
    }

    /// Loads the settings from the process environment.
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        vars.try_into()
    }

    pub fn validate(&self) -> Result<()> {
        if self.stream_name.trim().is_empty() {
            return Err(Error::Config("stream name is required".to_string()));
        }
        if self.partition_key_fields.is_empty() {
            return Err(Error::Config(
                "at least one partition key field is required".to_string(),
            ));
        }
        self.batch.validate()?;
        self.retry.validate()
    }

    pub fn kinesis_config(&self) -> KinesisSinkConfig {
        KinesisSinkConfig {
            stream_name: self.stream_name.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }
}

impl TryFrom<HashMap<String, String>> for Settings {
    type Error = Error;

    fn try_from(vars: HashMap<String, String>) -> Result<Self> {
        let stream_name = vars.get(ENV_STREAM_NAME).ok_or_else(|| {
            Error::Config(format!("environment variable {ENV_STREAM_NAME} is not set"))
        })?;

        let mut settings = Settings::new(stream_name.trim());

        if let Some(fields) = vars.get(ENV_PARTITION_KEY_FIELDS) {
            settings.partition_key_fields = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(size) = parse_var(&vars, ENV_BATCH_SIZE)? {
            settings.batch.max_batch_size = size;
        }
        if let Some(secs) = parse_var::<f64>(&vars, ENV_BATCH_INTERVAL_SECS)? {
            settings.batch.max_batch_interval = duration_from_secs(ENV_BATCH_INTERVAL_SECS, secs)?;
        }
        if let Some(enabled) = parse_var(&vars, ENV_BATCH_ENABLED)? {
            settings.batch.enabled = enabled;
        }
        if let Some(attempts) = parse_var(&vars, ENV_MAX_RETRY_ATTEMPTS)? {
            settings.retry.max_attempts = Some(attempts);
        }
        if let Some(policy) = parse_var(&vars, ENV_TRANSPORT_FAILURE)? {
            settings.retry.transport_failure = policy;
        }
        if let Some(secs) = parse_var::<f64>(&vars, ENV_SHUTDOWN_TIMEOUT_SECS)? {
            settings.shutdown_timeout = Some(duration_from_secs(ENV_SHUTDOWN_TIMEOUT_SECS, secs)?);
        }
        settings.region = vars.get(ENV_AWS_REGION).cloned();
        settings.endpoint_url = vars.get(ENV_ENDPOINT_URL).cloned();

        settings.validate()?;
        Ok(settings)
    }
}

fn parse_var<T>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    vars.get(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("parsing {key}={value:?}: {e}")))
        })
        .transpose()
}

fn duration_from_secs(key: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::Config(format!("{key} must be a non-negative number of seconds: {e}")))
}
