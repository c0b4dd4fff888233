use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::DocflowError;

static ENTITY_CODE: OnceLock<Regex> = OnceLock::new();

/// A legal/business unit. Its code prefixes every reference it issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: i64,
    pub code: String,
    pub name: String,
}

impl Entity {
    /// Entity codes are exactly three uppercase ASCII letters.
    pub fn validate_code(code: &str) -> Result<(), DocflowError> {
        let re = ENTITY_CODE.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("static regex"));
        if re.is_match(code) {
            Ok(())
        } else {
            Err(DocflowError::Validation(format!(
                "Entity code '{}' must be three uppercase letters",
                code
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn full_address(&self) -> &str {
        self.address.as_deref().unwrap_or("No address")
    }
}

/// Input for creating a new client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A physical location of a client where services are delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteInput {
    pub client_id: i64,
    pub name: String,
    pub location: Option<String>,
    pub description: Option<String>,
}
