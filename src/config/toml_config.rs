use crate::config::{
    ClientConfig, DEFAULT_BASE_URL, DEFAULT_CREATE_DOCUMENTS_PATH, DEFAULT_MAX_REQUESTS,
    DEFAULT_REFILL_PERIOD, DEFAULT_TIMEOUT,
};
use crate::domain::model::{Bandwidth, RefillStrategy};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{
    validate_header_name, validate_non_empty_string, validate_one_of, validate_positive_number,
    validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

const MAX_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub api: ApiSection,
    pub rate_limit: RateLimitSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub create_documents_path: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub max_requests: Option<u64>,
    pub refill_period_ms: Option<u64>,
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub verbose: bool,
    pub json: bool,
}

fn env_placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CrptError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| CrptError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        env_placeholder()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn strategy(&self) -> Result<RefillStrategy> {
        match &self.rate_limit.strategy {
            Some(name) => name.parse(),
            None => Ok(RefillStrategy::default()),
        }
    }

    pub fn to_client_config(&self) -> Result<ClientConfig> {
        self.validate()?;

        Ok(ClientConfig {
            base_url: self.base_url().to_string(),
            create_documents_path: self.create_documents_path().to_string(),
            request_timeout: self.request_timeout(),
            bandwidth: self.bandwidth()?,
            extra_headers: self.api.headers.clone(),
        })
    }

    fn refill_period(&self) -> Duration {
        self.rate_limit
            .refill_period_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REFILL_PERIOD)
    }
}

impl ConfigProvider for TomlConfig {
    fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    fn create_documents_path(&self) -> &str {
        self.api
            .create_documents_path
            .as_deref()
            .unwrap_or(DEFAULT_CREATE_DOCUMENTS_PATH)
    }

    fn request_timeout(&self) -> Option<Duration> {
        Some(
            self.api
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        )
    }

    fn bandwidth(&self) -> Result<Bandwidth> {
        Ok(Bandwidth {
            capacity: self.rate_limit.max_requests.unwrap_or(DEFAULT_MAX_REQUESTS),
            refill_period: self.refill_period(),
            strategy: self.strategy()?,
        })
    }

    fn extra_headers(&self) -> &HashMap<String, String> {
        &self.api.headers
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", self.base_url())?;
        validate_non_empty_string("api.create_documents_path", self.create_documents_path())?;

        if let Some(timeout) = self.api.timeout_seconds {
            validate_range("api.timeout_seconds", timeout, 1, MAX_TIMEOUT_SECONDS)?;
        }

        for name in self.api.headers.keys() {
            validate_header_name("api.headers", name)?;
        }

        if let Some(max_requests) = self.rate_limit.max_requests {
            validate_positive_number("rate_limit.max_requests", max_requests, 1)?;
        }
        if let Some(period) = self.rate_limit.refill_period_ms {
            validate_positive_number("rate_limit.refill_period_ms", period, 1)?;
        }
        if let Some(strategy) = &self.rate_limit.strategy {
            validate_one_of(
                "rate_limit.strategy",
                &strategy.trim().to_ascii_lowercase(),
                &RefillStrategy::NAMES,
            )?;
        }

        Ok(())
    }
}
