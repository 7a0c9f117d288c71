use crate::domain::document::Document;
use crate::domain::model::{ApiResponse, Bandwidth};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn create_documents_path(&self) -> &str;
    fn request_timeout(&self) -> Option<Duration>;
    fn bandwidth(&self) -> Result<Bandwidth>;
    fn extra_headers(&self) -> &HashMap<String, String>;
}

#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn create_documents(&self, document: &Document, signature: &str) -> Result<ApiResponse>;
}
