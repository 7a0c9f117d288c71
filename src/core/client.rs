use crate::config::ClientConfig;
use crate::core::rate_limiter::RateLimiter;
use crate::domain::document::Document;
use crate::domain::model::{ApiResponse, Bandwidth};
use crate::domain::ports::{ConfigProvider, DocumentApi};
use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{is_reserved_header, validate_url};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const SIGNATURE_HEADER: &str = "Signature";

/// Client for the CRPT document API. Safe to share between tasks behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CrptApi {
    client: Client,
    create_documents_url: Url,
    extra_headers: HashMap<String, String>,
    rate_limiter: RateLimiter,
}

impl CrptApi {
    /// Default endpoint, at most `max_requests` per `refill_period`.
    pub fn new(max_requests: u64, refill_period: Duration) -> Result<Self> {
        let config = ClientConfig {
            bandwidth: Bandwidth::intervally(max_requests, refill_period),
            ..ClientConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let create_documents_url =
            join_url(config.base_url(), config.create_documents_path())?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let mut extra_headers = HashMap::new();
        for (name, value) in config.extra_headers() {
            if is_reserved_header(name) {
                tracing::warn!("Ignoring configured header '{}': set per request", name);
                continue;
            }
            extra_headers.insert(name.clone(), value.clone());
        }

        Ok(Self {
            client: builder.build()?,
            create_documents_url,
            extra_headers,
            rate_limiter: RateLimiter::new(config.bandwidth()?)?,
        })
    }

    pub fn create_documents_url(&self) -> &Url {
        &self.create_documents_url
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub async fn create_documents(
        &self,
        document: &Document,
        signature: &str,
    ) -> Result<ApiResponse> {
        self.rate_limiter.acquire().await;

        let body = document.to_json()?;

        let mut request = self
            .client
            .post(self.create_documents_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature);

        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }

        tracing::debug!(
            "Request: POST {} | doc_id: {:?} | body: {} bytes",
            self.create_documents_url,
            document.doc_id,
            body.len()
        );

        let response = request.body(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!("Response status: {} | body: {}", status, body);
        if !(200..300).contains(&status) {
            tracing::warn!("CRPT API responded with status {}", status);
        }

        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl DocumentApi for CrptApi {
    async fn create_documents(&self, document: &Document, signature: &str) -> Result<ApiResponse> {
        CrptApi::create_documents(self, document, signature).await
    }
}

fn join_url(base_url: &str, path: &str) -> Result<Url> {
    validate_url("api.base_url", base_url)?;

    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| CrptError::InvalidConfigValueError {
        field: "api.create_documents_path".to_string(),
        value: path.to_string(),
        reason: format!("Invalid URL after joining with base URL: {}", e),
    })
}
