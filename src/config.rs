use std::time::Duration;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const ENV_PREFIX: &str = "INGESTLIST_";

/// Seconds from the environment as a `Duration`. Negative and NaN values
/// mean zero, anything too large for a `Duration` saturates.
fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// Which JSON key carries the user name in the login body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginField {
    #[default]
    Email,
    Username,
}

impl LoginField {
    pub fn key(self) -> &'static str {
        match self {
            LoginField::Email => "email",
            LoginField::Username => "username",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff_factor_secs: f64,
    /// Response codes treated as transient.
    pub status_forcelist: Vec<u16>,
    /// Bound on each individual attempt.
    pub timeout_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_factor_secs: 0.5,
            status_forcelist: vec![502, 503, 504],
            timeout_secs: 10.0,
        }
    }
}

impl RetryConfig {
    pub fn backoff_factor(&self) -> Duration {
        secs(self.backoff_factor_secs)
    }

    pub fn timeout(&self) -> Duration {
        secs(self.timeout_secs)
    }

    /// Wait before retry number `attempt` (counted from zero).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_factor()
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn is_transient(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: f64,
    pub max_wait_secs: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            max_wait_secs: 300.0,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        secs(self.max_wait_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub login_field: LoginField,
    pub proxy: Option<String>,
    pub retry: RetryConfig,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: String::new(),
            password: String::new(),
            login_field: LoginField::default(),
            proxy: None,
            retry: RetryConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Defaults overlaid with `INGESTLIST_*` variables, nested keys split on
    /// `__` (`INGESTLIST_POLL__MAX_WAIT_SECS=600`). Callers may merge further
    /// providers before extracting.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(ClientConfig::default()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: &Figment) -> Result<ClientConfig> {
        figment.extract().map_err(|e| Error::Config(Box::new(e)))
    }

    pub fn from_env() -> Result<ClientConfig> {
        ClientConfig::from_figment(&ClientConfig::figment())
    }
}
