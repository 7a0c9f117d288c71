#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::Bandwidth;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{
    validate_header_name, validate_non_empty_string, validate_positive_number, validate_url,
    Validate,
};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://ismp.crpt.ru/api/v3";
pub const DEFAULT_CREATE_DOCUMENTS_PATH: &str = "/lk/documents/create";
pub const DEFAULT_MAX_REQUESTS: u64 = 4;
pub const DEFAULT_REFILL_PERIOD: Duration = Duration::from_secs(3);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fully resolved client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub create_documents_path: String,
    pub request_timeout: Option<Duration>,
    pub bandwidth: Bandwidth,
    pub extra_headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            create_documents_path: DEFAULT_CREATE_DOCUMENTS_PATH.to_string(),
            request_timeout: Some(DEFAULT_TIMEOUT),
            bandwidth: Bandwidth::intervally(DEFAULT_MAX_REQUESTS, DEFAULT_REFILL_PERIOD),
            extra_headers: HashMap::new(),
        }
    }
}

impl ConfigProvider for ClientConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn create_documents_path(&self) -> &str {
        &self.create_documents_path
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    fn bandwidth(&self) -> Result<Bandwidth> {
        Ok(self.bandwidth)
    }

    fn extra_headers(&self) -> &HashMap<String, String> {
        &self.extra_headers
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.base_url)?;
        validate_non_empty_string("api.create_documents_path", &self.create_documents_path)?;
        validate_positive_number("rate_limit.max_requests", self.bandwidth.capacity, 1)?;
        if self.bandwidth.refill_period.is_zero() {
            return Err(CrptError::InvalidConfigValueError {
                field: "rate_limit.refill_period_ms".to_string(),
                value: "0".to_string(),
                reason: "Refill period must be positive".to_string(),
            });
        }
        for name in self.extra_headers.keys() {
            validate_header_name("api.headers", name)?;
        }
        Ok(())
    }
}
