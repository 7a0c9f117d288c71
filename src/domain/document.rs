use crate::utils::error::{CrptError, Result};
use crate::utils::validation::{validate_date, Validate};
use serde::{Deserialize, Serialize};

pub const DOC_TYPE_INTRODUCE_GOODS: &str = "LP_INTRODUCE_GOODS";

/// Goods introduction document as accepted by `/lk/documents/create`.
///
/// Field names on the wire are snake_case except `importRequest` and
/// `description.participantInn`. Absent values are sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub description: Option<Description>,
    pub doc_id: Option<String>,
    pub doc_status: Option<String>,
    pub doc_type: Option<String>,
    #[serde(rename = "importRequest")]
    pub import_request: bool,
    pub owner_inn: Option<String>,
    pub participant_inn: Option<String>,
    pub producer_inn: Option<String>,
    pub production_date: Option<String>,
    pub production_type: Option<String>,
    pub products: Vec<Product>,
    pub reg_date: Option<String>,
    pub reg_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    #[serde(rename = "participantInn")]
    pub participant_inn: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub certificate_document: Option<String>,
    pub certificate_document_date: Option<String>,
    pub certificate_document_number: Option<String>,
    pub owner_inn: Option<String>,
    pub producer_inn: Option<String>,
    pub production_date: Option<String>,
    pub tnved_code: Option<String>,
    pub uit_code: Option<String>,
    pub uitu_code: Option<String>,
}

impl Document {
    pub fn introduce_goods() -> Self {
        Self {
            doc_type: Some(DOC_TYPE_INTRODUCE_GOODS.to_string()),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Validate for Document {
    fn validate(&self) -> Result<()> {
        match self.doc_type.as_deref() {
            Some(doc_type) if !doc_type.trim().is_empty() => {}
            _ => {
                return Err(CrptError::ValidationError {
                    message: "doc_type is required".to_string(),
                })
            }
        }

        if self.products.is_empty() {
            return Err(CrptError::ValidationError {
                message: "document must contain at least one product".to_string(),
            });
        }

        if let Some(date) = &self.production_date {
            validate_date("production_date", date)?;
        }

        for (i, product) in self.products.iter().enumerate() {
            if let Some(date) = &product.production_date {
                validate_date(&format!("products[{}].production_date", i), date)?;
            }
            if let Some(date) = &product.certificate_document_date {
                validate_date(&format!("products[{}].certificate_document_date", i), date)?;
            }
        }

        Ok(())
    }
}
