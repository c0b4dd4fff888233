//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and drives the
//! docflow-core stores and workflow through `AppState`. Handlers return the
//! JSON they want printed; `main` does the printing.

pub mod catalog;
pub mod certificate;
pub mod client;
pub mod document;
pub mod entity;
pub mod invoice;
pub mod offer;
pub mod summary;
pub mod training;

use std::sync::Arc;

use docflow_core::models::TransitionContext;
use docflow_core::state::AppState;
use docflow_core::{AppStateInner, Database, DocflowConfig, DocflowError};
use serde::Serialize;

/// Fallback database file when neither `--db`, `DOCFLOW_DB_PATH` nor the config names one.
pub const DEFAULT_DB_PATH: &str = "docflow.db";

/// Load the config and open the database it (or `db_path`) points at.
pub fn init_state(db_path: Option<&str>, config_path: Option<&str>) -> Result<AppState, String> {
    let config = DocflowConfig::load(config_path).map_err(|e| e.to_string())?;
    let path = db_path
        .map(str::to_string)
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    let db = Database::open(&path)
        .map_err(|e| format!("Failed to open database '{}': {}", path, e))?;
    Ok(Arc::new(AppStateInner::new(db, config)))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to serialize output: {}", e))
}

/// Turn a core error into the message shown to the user.
pub(crate) fn fail(e: DocflowError) -> String {
    if e.is_rejection() {
        tracing::debug!("Request rejected: {}", e);
    } else {
        tracing::error!("{}", e);
    }
    e.to_string()
}

pub(crate) fn context(by: Option<String>, comment: Option<String>) -> TransitionContext {
    TransitionContext {
        changed_by: by,
        comment,
    }
}

pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> String {
    fail(DocflowError::NotFound(format!("{} {} not found", what, id)))
}
