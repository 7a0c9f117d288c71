pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::Cli;

pub use crate::config::{toml_config::TomlConfig, ClientConfig};
pub use crate::core::{
    batch::{BatchReport, BatchSubmitter, Submission},
    client::CrptApi,
    rate_limiter::{ConsumptionProbe, RateLimiter},
};
pub use crate::domain::{
    document::{Description, Document, Product},
    model::{ApiResponse, Bandwidth, RefillStrategy},
    ports::{ConfigProvider, DocumentApi},
};
pub use crate::utils::error::{CrptError, Result};
