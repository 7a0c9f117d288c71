pub mod batch;
pub mod client;
pub mod rate_limiter;

pub use crate::domain::document::{Description, Document, Product};
pub use crate::domain::model::{ApiResponse, Bandwidth, RefillStrategy};
pub use crate::domain::ports::{ConfigProvider, DocumentApi};
pub use crate::utils::error::Result;
