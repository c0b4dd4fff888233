pub mod catalog_store;
pub mod client_store;
pub mod document_store;
pub mod entity_store;
pub mod history_store;
pub mod training_store;

pub use catalog_store::CatalogStore;
pub use client_store::ClientStore;
pub use document_store::DocumentStore;
pub use entity_store::EntityStore;
pub use history_store::HistoryStore;
pub use training_store::TrainingStore;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::DocflowError;

pub(crate) fn ms_to_dt(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(|| {
        tracing::warn!("Stored timestamp {} is out of range, using the current time", ms);
        Utc::now()
    })
}

pub(crate) fn opt_ms_to_dt(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::from_timestamp_millis)
}

pub(crate) fn date_to_sql(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

pub(crate) fn sql_to_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
}


/// Map a UNIQUE/CHECK violation to `Conflict`, anything else to `Database`.
pub(crate) fn on_constraint(e: rusqlite::Error, message: impl FnOnce() -> String) -> DocflowError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DocflowError::Conflict(message())
        }
        _ => DocflowError::from(e),
    }
}
