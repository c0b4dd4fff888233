//! `docflow client` and `docflow site`.

use docflow_core::models::{Client, CreateClientInput, CreateSiteInput};
use docflow_core::state::AppState;

use super::{fail, to_json};

pub async fn create(
    state: &AppState,
    name: &str,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
) -> Result<serde_json::Value, String> {
    let client = state
        .client_store
        .create(CreateClientInput {
            name: name.to_string(),
            email,
            phone,
            address,
        })
        .await
        .map_err(fail)?;
    client_json(&client)
}

pub async fn list(state: &AppState) -> Result<serde_json::Value, String> {
    let clients = state.client_store.list().await.map_err(fail)?;
    let clients = clients
        .iter()
        .map(client_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::json!({ "clients": clients }))
}

fn client_json(client: &Client) -> Result<serde_json::Value, String> {
    let mut value = to_json(client)?;
    value["fullAddress"] = serde_json::json!(client.full_address());
    Ok(value)
}

pub async fn create_site(
    state: &AppState,
    client_id: i64,
    name: &str,
    location: Option<String>,
    description: Option<String>,
) -> Result<serde_json::Value, String> {
    let site = state
        .client_store
        .create_site(CreateSiteInput {
            client_id,
            name: name.to_string(),
            location,
            description,
        })
        .await
        .map_err(fail)?;
    to_json(&site)
}

pub async fn list_sites(state: &AppState, client_id: i64, all: bool) -> Result<serde_json::Value, String> {
    let sites = state
        .client_store
        .list_sites(client_id, !all)
        .await
        .map_err(fail)?;
    Ok(serde_json::json!({ "clientId": client_id, "sites": sites }))
}

pub async fn set_site_active(state: &AppState, id: i64, active: bool) -> Result<serde_json::Value, String> {
    let updated = state
        .client_store
        .set_site_active(id, active)
        .await
        .map_err(fail)?;
    if !updated {
        return Err(super::not_found("Site", id));
    }
    Ok(serde_json::json!({ "id": id, "isActive": active }))
}
