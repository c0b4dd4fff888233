//! Runtime configuration loaded from YAML.
//!
//! ```yaml
//! database:
//!   path: /var/lib/docflow/docflow.db
//! training_category_code: FOR
//! invoice_payment_terms_days: 30
//! record_history: true
//! ```
//!
//! Every key is optional. Lookup order for the file is the explicit path,
//! then `<config dir>/docflow/config.yaml`, then built-in defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DocflowError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocflowConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Category code whose products spawn a training session.
    #[serde(default = "default_training_category_code")]
    pub training_category_code: String,

    /// Days between invoice creation and its due date. Unset leaves invoices without one.
    #[serde(default)]
    pub invoice_payment_terms_days: Option<u32>,

    #[serde(default = "default_true")]
    pub record_history: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<String>,
}

fn default_training_category_code() -> String {
    "FOR".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DocflowConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            training_category_code: default_training_category_code(),
            invoice_payment_terms_days: None,
            record_history: true,
        }
    }
}

impl DocflowConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, DocflowError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| DocflowError::Config(format!("Failed to parse config YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, DocflowError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DocflowError::Config(format!("Failed to read config file '{}': {}", path, e)))?;
        Self::from_yaml(&content)
    }

    /// Load from `path` when given, else from the user config directory if a
    /// file exists there, else defaults. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&str>) -> Result<Self, DocflowError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(p) if p.is_file() => {
                tracing::debug!("Loading config from {}", p.display());
                Self::from_file(&p.to_string_lossy())
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("docflow").join("config.yaml"))
    }

    fn validate(&self) -> Result<(), DocflowError> {
        crate::models::Category::validate_code(&self.training_category_code)
            .map_err(|e| DocflowError::Config(format!("training_category_code: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = DocflowConfig::from_yaml("{}").unwrap();
        assert_eq!(config.training_category_code, "FOR");
        assert!(config.record_history);
        assert!(config.database.path.is_none());
        assert!(config.invoice_payment_terms_days.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
database:
  path: /tmp/docflow.db
training_category_code: TRN
invoice_payment_terms_days: 45
record_history: false
"#;
        let config = DocflowConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.database.path.as_deref(), Some("/tmp/docflow.db"));
        assert_eq!(config.training_category_code, "TRN");
        assert_eq!(config.invoice_payment_terms_days, Some(45));
        assert!(!config.record_history);
    }

    #[test]
    fn test_rejects_bad_category_code() {
        let err = DocflowConfig::from_yaml("training_category_code: training").unwrap_err();
        assert!(matches!(err, DocflowError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(DocflowConfig::load(Some("/nonexistent/docflow.yaml")).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "invoice_payment_terms_days: 30\n").unwrap();
        let config = DocflowConfig::from_file(&path.to_string_lossy()).unwrap();
        assert_eq!(config.invoice_payment_terms_days, Some(30));
    }
}
