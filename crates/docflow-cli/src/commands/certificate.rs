//! `docflow certificate`: training certificates per participant.

use docflow_core::models::CertificateUpdate;
use docflow_core::state::AppState;

use super::{context, fail, to_json};

pub async fn issue(
    state: &AppState,
    participant_id: i64,
    details: &str,
    by: Option<String>,
) -> Result<serde_json::Value, String> {
    let certificate = state
        .workflow
        .issue_certificate(participant_id, details.to_string(), context(by, None))
        .await
        .map_err(fail)?;
    to_json(&certificate)
}

pub async fn update(state: &AppState, id: i64, update: CertificateUpdate) -> Result<serde_json::Value, String> {
    let details = state
        .workflow
        .update_certificate(id, update)
        .await
        .map_err(fail)?;
    let complete = details.is_complete();
    let mut value = to_json(&details)?;
    value["complete"] = serde_json::json!(complete);
    Ok(value)
}
