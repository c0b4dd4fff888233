//! `docflow category` and `docflow product`: the service catalog.

use docflow_core::models::{CreateCategoryInput, CreateProductInput};
use docflow_core::state::AppState;

use super::{fail, to_json};

pub async fn create_category(
    state: &AppState,
    entity_id: i64,
    code: &str,
    name: &str,
    description: Option<String>,
) -> Result<serde_json::Value, String> {
    let category = state
        .catalog_store
        .create_category(CreateCategoryInput {
            entity_id,
            code: code.to_string(),
            name: name.to_string(),
            description,
        })
        .await
        .map_err(fail)?;
    let training = category.is_training(&state.config.training_category_code);
    let mut value = to_json(&category)?;
    value["isTraining"] = serde_json::json!(training);
    Ok(value)
}

pub async fn list_categories(state: &AppState, entity_id: i64) -> Result<serde_json::Value, String> {
    let categories = state
        .catalog_store
        .list_categories(entity_id)
        .await
        .map_err(fail)?;
    Ok(serde_json::json!({ "entityId": entity_id, "categories": categories }))
}

pub async fn create_product(
    state: &AppState,
    category_id: i64,
    code: &str,
    name: &str,
    description: Option<String>,
    price_cents: i64,
) -> Result<serde_json::Value, String> {
    let product = state
        .catalog_store
        .create_product(CreateProductInput {
            category_id,
            code: code.to_string(),
            name: name.to_string(),
            description,
            standard_price_cents: price_cents,
        })
        .await
        .map_err(fail)?;
    to_json(&product)
}

pub async fn list_products(state: &AppState, category_id: i64) -> Result<serde_json::Value, String> {
    let products = state
        .catalog_store
        .list_products(category_id)
        .await
        .map_err(fail)?;
    Ok(serde_json::json!({ "categoryId": category_id, "products": products }))
}

pub async fn set_price(state: &AppState, id: i64, price_cents: i64) -> Result<serde_json::Value, String> {
    if !state
        .catalog_store
        .update_price(id, price_cents)
        .await
        .map_err(fail)?
    {
        return Err(super::not_found("Product", id));
    }
    Ok(serde_json::json!({ "id": id, "standardPriceCents": price_cents }))
}
