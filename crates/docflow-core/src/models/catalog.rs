use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::DocflowError;

static CATEGORY_CODE: OnceLock<Regex> = OnceLock::new();
static PRODUCT_CODE: OnceLock<Regex> = OnceLock::new();

/// A service family offered by an entity (inspection, training, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub entity_id: i64,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
}

impl Category {
    pub fn validate_code(code: &str) -> Result<(), DocflowError> {
        let re = CATEGORY_CODE.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("static regex"));
        if re.is_match(code) {
            Ok(())
        } else {
            Err(DocflowError::Validation(format!(
                "Category code '{}' must be three uppercase letters",
                code
            )))
        }
    }

    pub fn is_training(&self, training_code: &str) -> bool {
        self.code == training_code
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryInput {
    pub entity_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub standard_price_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Product codes are `VTE<n>` or `EC<n>`, four characters at most.
    pub fn validate_code(code: &str) -> Result<(), DocflowError> {
        let re = PRODUCT_CODE.get_or_init(|| Regex::new(r"^(VTE|EC)\d+$").expect("static regex"));
        if code.len() <= 4 && re.is_match(code) {
            Ok(())
        } else {
            Err(DocflowError::Validation(format!(
                "Product code '{}' must look like VTE1 or EC12 (max 4 characters)",
                code
            )))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    pub category_id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub standard_price_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_code_validation() {
        assert!(Product::validate_code("VTE1").is_ok());
        assert!(Product::validate_code("EC12").is_ok());
        assert!(Product::validate_code("EC123").is_err());
        assert!(Product::validate_code("VTE").is_err());
        assert!(Product::validate_code("ABC1").is_err());
    }
}
