use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

use super::ms_to_dt;
use crate::db::Database;
use crate::error::DocflowError;
use crate::models::StatusChange;

#[derive(Clone)]
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Status changes of a document, oldest first.
    pub async fn list_for_document(&self, document_id: i64) -> Result<Vec<StatusChange>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, document_id, old_status, new_status, changed_by, comment, changed_at
                     FROM document_history WHERE document_id = ?1 ORDER BY id",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![document_id], row_to_change)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}

pub(crate) fn record(
    conn: &Connection,
    document_id: i64,
    old_status: &str,
    new_status: &str,
    changed_by: Option<&str>,
    comment: Option<&str>,
    at: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO document_history (document_id, old_status, new_status, changed_by, comment, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![document_id, old_status, new_status, changed_by, comment, at.timestamp_millis()],
    )?;
    Ok(())
}

fn row_to_change(row: &Row<'_>) -> rusqlite::Result<StatusChange> {
    Ok(StatusChange {
        id: row.get(0)?,
        document_id: row.get(1)?,
        old_status: row.get(2)?,
        new_status: row.get(3)?,
        changed_by: row.get(4)?,
        comment: row.get(5)?,
        changed_at: ms_to_dt(row.get(6)?),
    })
}
