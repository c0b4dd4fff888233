//! `docflow summary`: document counts across the pipeline.

use docflow_core::state::AppState;

use super::{fail, to_json};

pub async fn show(state: &AppState) -> Result<serde_json::Value, String> {
    let summary = state.document_store.summary().await.map_err(fail)?;
    to_json(&summary)
}
