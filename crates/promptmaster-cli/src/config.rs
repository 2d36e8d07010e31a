use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use promptmaster_contracts::models::ModelOverrides;
use promptmaster_contracts::session::{AuthStrategy, DEFAULT_MIN_TOKEN_LEN};
use promptmaster_engine::RetryPolicy;
use serde::Deserialize;

pub const HOME_ENV: &str = "PROMPTMASTER_HOME";
pub const DEFAULT_HOST_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_RETRY_BACKOFF_SECS: f64 = 1.2;

/// Where the CLI keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub home: PathBuf,
    pub config: PathBuf,
    pub credentials: PathBuf,
    pub events: PathBuf,
}

impl AppPaths {
    pub fn resolve(
        home: Option<PathBuf>,
        config: Option<PathBuf>,
        events: Option<PathBuf>,
    ) -> Result<Self> {
        let home = match home {
            Some(home) => home,
            None => default_home()?,
        };
        Ok(Self {
            config: config.unwrap_or_else(|| home.join("config.toml")),
            credentials: home.join("credentials.json"),
            events: events.unwrap_or_else(|| home.join("events.jsonl")),
            home,
        })
    }
}

fn default_home() -> Result<PathBuf> {
    if let Some(home) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::config_dir()
        .map(|dir| dir.join("promptmaster"))
        .with_context(|| format!("no config directory found; set {HOME_ENV} or pass --home"))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub auth_strategy: AuthStrategy,
    pub min_token_len: Option<usize>,
    /// Endpoint used when the host manages the key.
    pub endpoint: Option<String>,
    pub host_key_env: Option<String>,
    pub host_select_command: Option<String>,
    pub assume_host_selection: bool,
    pub models: ModelsConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    pub text: Option<String>,
    pub vision: Option<String>,
    pub image: Option<String>,
    pub edit: Option<String>,
    pub speech: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub timeout_secs: Option<f64>,
    pub retries: Option<usize>,
    pub retry_backoff_secs: Option<f64>,
}

impl TransportConfig {
    fn validate(&self) -> Result<()> {
        if let Some(secs) = self.timeout_secs {
            if secs < 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                bail!("transport.timeout_secs must be a non-negative number of seconds, got {secs}");
            }
        }
        if let Some(secs) = self.retry_backoff_secs {
            if !secs.is_finite() || secs < 0.0 {
                bail!("transport.retry_backoff_secs must be a non-negative number of seconds, got {secs}");
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// A missing file is the default configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.transport.validate()?;
        Ok(config)
    }

    pub fn min_token_len(&self) -> usize {
        self.min_token_len.unwrap_or(DEFAULT_MIN_TOKEN_LEN).max(1)
    }

    pub fn host_key_env(&self) -> &str {
        self.host_key_env
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_HOST_KEY_ENV)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.transport.retries.unwrap_or(0),
            self.transport
                .retry_backoff_secs
                .unwrap_or(DEFAULT_RETRY_BACKOFF_SECS),
        )
    }

    /// `None` means no timeout: calls block until the service settles.
    pub fn timeout(&self) -> Option<Duration> {
        self.transport
            .timeout_secs
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    pub fn model_overrides(&self) -> ModelOverrides {
        ModelOverrides {
            text: self.models.text.clone(),
            vision: self.models.vision.clone(),
            image: self.models.image.clone(),
            edit: self.models.edit.clone(),
            speech: self.models.speech.clone(),
        }
    }
}
