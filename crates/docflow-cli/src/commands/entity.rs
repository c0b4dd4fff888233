//! `docflow entity`: legal entities that own catalogs and number documents.

use docflow_core::state::AppState;

use super::{fail, to_json};

pub async fn create(state: &AppState, code: &str, name: &str) -> Result<serde_json::Value, String> {
    let entity = state.entity_store.create(code, name).await.map_err(fail)?;
    tracing::info!("Created entity {} ({})", entity.code, entity.id);
    to_json(&entity)
}

pub async fn list(state: &AppState) -> Result<serde_json::Value, String> {
    let entities = state.entity_store.list().await.map_err(fail)?;
    Ok(serde_json::json!({ "entities": entities }))
}
