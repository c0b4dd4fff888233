//! `docflow offer`: entry point of the pipeline.

use chrono::{NaiveDate, TimeZone, Utc};
use docflow_core::models::CreateOfferInput;
use docflow_core::state::AppState;

use super::{context, fail, to_json};

#[allow(clippy::too_many_arguments)]
pub async fn create(
    state: &AppState,
    entity_id: i64,
    client_id: i64,
    product_ids: Vec<i64>,
    site_ids: Vec<i64>,
    comments: Option<String>,
    date: Option<&str>,
    by: Option<String>,
) -> Result<serde_json::Value, String> {
    let created_at = match date {
        Some(d) => {
            let day = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|e| format!("Invalid date '{}': {}", d, e))?;
            let midnight = day
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| format!("Invalid date '{}'", d))?;
            Some(Utc.from_utc_datetime(&midnight))
        }
        None => None,
    };
    let offer = state
        .workflow
        .create_offer(
            CreateOfferInput {
                entity_id,
                client_id,
                product_ids,
                site_ids,
                comments,
                created_at,
            },
            context(by, None),
        )
        .await
        .map_err(fail)?;
    tracing::info!("Offer {} created", offer.reference);
    to_json(&offer)
}
