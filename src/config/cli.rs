use crate::config::toml_config::TomlConfig;
use crate::config::ClientConfig;
use crate::core::batch::Submission;
use crate::domain::document::{Description, Document, Product};
use crate::domain::model::RefillStrategy;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_positive_number, Validate};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "crpt-api")]
#[command(about = "Submit goods introduction documents to the CRPT API within a request quota")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override api.base_url
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override rate_limit.max_requests
    #[arg(long)]
    pub max_requests: Option<u64>,

    /// Override rate_limit.refill_period_ms
    #[arg(long)]
    pub refill_ms: Option<u64>,

    /// Restore tokens one at a time instead of once per period
    #[arg(long)]
    pub greedy: bool,

    /// JSON document to submit. The built-in sample is used when omitted
    #[arg(short, long)]
    pub document: Option<String>,

    /// Value sent in the Signature header
    #[arg(short, long, default_value = "signature")]
    pub signature: String,

    /// Number of concurrent submissions of the document
    #[arg(long, default_value = "1")]
    pub count: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log process CPU and memory around the batch
    #[arg(long)]
    pub monitor: bool,

    /// Validate configuration and document without sending anything
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn load_toml(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)
            }
            None => Ok(TomlConfig::default()),
        }
    }

    /// File settings with command line overrides applied on top.
    pub fn resolve(&self, toml: &TomlConfig) -> Result<ClientConfig> {
        let mut config = toml.to_client_config()?;

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(max_requests) = self.max_requests {
            config.bandwidth.capacity = max_requests;
        }
        if let Some(refill_ms) = self.refill_ms {
            config.bandwidth.refill_period = Duration::from_millis(refill_ms);
        }
        if self.greedy {
            config.bandwidth.strategy = RefillStrategy::Greedy;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load_document(&self) -> Result<Document> {
        match &self.document {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                Document::from_json(&json)
            }
            None => Ok(sample_document()),
        }
    }

    pub fn submissions(&self, document: Document) -> Vec<Submission> {
        let document = Arc::new(document);
        if self.count == 1 {
            return vec![Submission::new(document, self.signature.clone())];
        }

        (1..=self.count)
            .map(|i| Submission::new(Arc::clone(&document), format!("{} - {}", self.signature, i)))
            .collect()
    }
}

impl Validate for Cli {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_path("--config", path)?;
        }
        if let Some(path) = &self.document {
            validate_path("--document", path)?;
        }
        validate_positive_number("--count", self.count as u64, 1)?;
        Ok(())
    }
}

pub fn sample_document() -> Document {
    Document {
        description: Some(Description {
            participant_inn: Some("0987654321".to_string()),
        }),
        doc_id: Some("123456789".to_string()),
        doc_status: Some("NEW".to_string()),
        import_request: true,
        owner_inn: Some("1234567890".to_string()),
        participant_inn: Some("0987654321".to_string()),
        producer_inn: Some("1122334455".to_string()),
        production_date: Some("2024-06-25".to_string()),
        production_type: Some("OWN_PRODUCTION".to_string()),
        products: vec![Product {
            certificate_document: Some("CONFORMITY_CERTIFICATE".to_string()),
            certificate_document_date: Some("2024-06-25".to_string()),
            certificate_document_number: Some("CERT_NUM".to_string()),
            owner_inn: Some("1234567890".to_string()),
            producer_inn: Some("1122334455".to_string()),
            production_date: Some("2023-01-01".to_string()),
            tnved_code: Some("6401100000".to_string()),
            uit_code: Some("010463003407001221SxMGorvNuq6Wk91fgr92sdfsdfghfgjh".to_string()),
            uitu_code: None,
        }],
        ..Document::introduce_goods()
    }
}
