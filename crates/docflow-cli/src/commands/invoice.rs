//! `docflow invoice`.

use chrono::NaiveDate;
use docflow_core::state::AppState;

use super::{fail, to_json};

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}' (expected YYYY-MM-DD): {}", value, e))
}

pub async fn pay(state: &AppState, id: i64, date: Option<&str>) -> Result<serde_json::Value, String> {
    let paid_on = date.map(parse_date).transpose()?;
    let invoice = state
        .workflow
        .mark_invoice_paid(id, paid_on)
        .await
        .map_err(fail)?;
    to_json(&invoice)
}
