//! `docflow doc`: inspect documents and move them through their lifecycle.

use docflow_core::models::{Document, DocumentKind, DocumentStatus};
use docflow_core::state::AppState;
use docflow_core::reference::parse_reference;
use docflow_core::workflow::allowed_next;

use super::{context, fail, not_found, to_json};

pub fn parse_kind(code: &str) -> Result<DocumentKind, String> {
    DocumentKind::from_code(&code.to_uppercase()).ok_or_else(|| {
        let known: Vec<&str> = DocumentKind::ALL.iter().map(|k| k.code()).collect();
        format!("Unknown document type '{}' (expected one of {})", code, known.join(", "))
    })
}

pub fn parse_status(status: &str) -> Result<DocumentStatus, String> {
    DocumentStatus::from_str(&status.to_uppercase().replace('-', "_"))
        .ok_or_else(|| format!("Unknown status '{}'", status))
}

async fn load(state: &AppState, id: Option<i64>, reference: Option<&str>) -> Result<Document, String> {
    match (id, reference) {
        (Some(id), _) => state
            .document_store
            .get(id)
            .await
            .map_err(fail)?
            .ok_or_else(|| not_found("Document", id)),
        (None, Some(reference)) => {
            parse_reference(reference).map_err(fail)?;
            state
                .document_store
                .get_by_reference(reference)
                .await
                .map_err(fail)?
                .ok_or_else(|| not_found("Document", reference))
        }
        (None, None) => Err("Either --id or --reference is required".to_string()),
    }
}

pub async fn show(state: &AppState, id: Option<i64>, reference: Option<&str>) -> Result<serde_json::Value, String> {
    let document = load(state, id, reference).await?;
    let next: Vec<&str> = allowed_next(document.kind, document.status)
        .iter()
        .map(|s| s.as_str())
        .collect();

    let mut value = serde_json::json!({
        "document": to_json(&document)?,
        "allowedNext": next,
    });
    match document.kind {
        DocumentKind::Offer => {
            let products = state.document_store.offer_products(document.id).await.map_err(fail)?;
            let sites = state.document_store.offer_sites(document.id).await.map_err(fail)?;
            value["products"] = to_json(&products)?;
            value["sites"] = to_json(&sites)?;
        }
        DocumentKind::TrainingCertificate => {
            let details = state
                .document_store
                .certificate_details(document.id)
                .await
                .map_err(fail)?;
            value["certificate"] = to_json(&details)?;
            value["complete"] = serde_json::json!(details.is_some_and(|d| d.is_complete()));
        }
        _ => {}
    }
    Ok(value)
}

pub async fn list(state: &AppState, kind: Option<&str>, client_id: Option<i64>) -> Result<serde_json::Value, String> {
    let documents = match (kind, client_id) {
        (_, Some(client_id)) => {
            let all = state.document_store.list_by_client(client_id).await.map_err(fail)?;
            match kind {
                Some(k) => {
                    let kind = parse_kind(k)?;
                    all.into_iter().filter(|d| d.kind == kind).collect()
                }
                None => all,
            }
        }
        (Some(k), None) => state
            .document_store
            .list_by_kind(parse_kind(k)?)
            .await
            .map_err(fail)?,
        (None, None) => return Err("Either --kind or --client-id is required".to_string()),
    };
    Ok(serde_json::json!({ "count": documents.len(), "documents": documents }))
}

pub async fn children(state: &AppState, id: i64) -> Result<serde_json::Value, String> {
    let parent = load(state, Some(id), None).await?;
    let children = state.document_store.list_children(id).await.map_err(fail)?;
    let mut value = serde_json::json!({
        "parent": parent.reference,
        "children": children,
    });
    if parent.kind == DocumentKind::BusinessCase {
        let sessions = state.training_store.list_sessions(id).await.map_err(fail)?;
        value["trainingSessions"] = to_json(&sessions)?;
    }
    Ok(value)
}

pub async fn transition(
    state: &AppState,
    id: i64,
    status: &str,
    by: Option<String>,
    comment: Option<String>,
) -> Result<serde_json::Value, String> {
    let to = parse_status(status)?;
    let outcome = state
        .workflow
        .transition(id, to, context(by, comment))
        .await
        .map_err(fail)?;
    to_json(&outcome)
}

pub async fn validate(state: &AppState, id: i64, by: Option<String>, comment: Option<String>) -> Result<serde_json::Value, String> {
    let outcome = state
        .workflow
        .validate(id, context(by, comment))
        .await
        .map_err(fail)?;
    to_json(&outcome)
}

pub async fn complete(state: &AppState, id: i64, by: Option<String>, comment: Option<String>) -> Result<serde_json::Value, String> {
    let outcome = state
        .workflow
        .complete(id, context(by, comment))
        .await
        .map_err(fail)?;
    to_json(&outcome)
}

pub async fn cascade(state: &AppState, id: i64, by: Option<String>) -> Result<serde_json::Value, String> {
    let output = state
        .workflow
        .cascade(id, context(by, None))
        .await
        .map_err(fail)?;
    to_json(&output)
}

pub async fn history(state: &AppState, id: i64) -> Result<serde_json::Value, String> {
    let document = load(state, Some(id), None).await?;
    let history = state
        .history_store
        .list_for_document(id)
        .await
        .map_err(fail)?;
    Ok(serde_json::json!({ "reference": document.reference, "history": history }))
}

pub async fn comment(state: &AppState, id: i64, text: Option<String>) -> Result<serde_json::Value, String> {
    let document = state
        .workflow
        .update_comments(id, text)
        .await
        .map_err(fail)?;
    to_json(&document)
}

pub async fn plan(state: &AppState, id: i64, date: &str) -> Result<serde_json::Value, String> {
    let day = super::invoice::parse_date(date)?;
    let document = state
        .workflow
        .set_planned_end(id, day)
        .await
        .map_err(fail)?;
    to_json(&document)
}
