use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{date_to_sql, ms_to_dt, on_constraint, opt_ms_to_dt, sql_to_date};
use crate::db::Database;
use crate::error::DocflowError;
use crate::models::{
    CertificateDetails, Document, DocumentKind, DocumentLinks, DocumentStatus, NewDocument,
    PipelineSummary, Product, Site,
};
use crate::reference::{self, ReferenceParts};

const DOCUMENT_COLUMNS: &str = "id, kind, entity_id, client_id, reference, status, sequence_number, \
     amount_cents, comments, offer_id, proforma_id, business_case_id, site_id, product_id, \
     training_session_id, participant_id, planned_end_on, due_on, paid_on, created_at, updated_at, \
     validated_at, completed_at";

/// Read side of the document family. Writes go through the workflow engine,
/// which calls the connection-level functions below inside one transaction.
#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>, DocflowError> {
        self.db
            .with_conn_async(move |conn| get_document(conn, id))
            .await
    }

    pub async fn get_by_reference(&self, reference: &str) -> Result<Option<Document>, DocflowError> {
        let reference = reference.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM documents WHERE reference = ?1", DOCUMENT_COLUMNS),
                    rusqlite::params![reference],
                    row_to_document,
                )
                .optional()
            })
            .await
    }

    pub async fn list_by_kind(&self, kind: DocumentKind) -> Result<Vec<Document>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents WHERE kind = ?1 ORDER BY id",
                    DOCUMENT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![kind.code()], row_to_document)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn list_by_client(&self, client_id: i64) -> Result<Vec<Document>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents WHERE client_id = ?1 ORDER BY id",
                    DOCUMENT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![client_id], row_to_document)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Documents created by the cascade of `parent_id`.
    pub async fn list_children(&self, parent_id: i64) -> Result<Vec<Document>, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM documents
                     WHERE (kind = 'PRO' AND offer_id = ?1)
                        OR (kind = 'AFF' AND proforma_id = ?1)
                        OR (kind IN ('FAC', 'RAP') AND business_case_id = ?1)
                     ORDER BY id",
                    DOCUMENT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![parent_id], row_to_document)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn offer_products(&self, offer_id: i64) -> Result<Vec<Product>, DocflowError> {
        self.db
            .with_conn_async(move |conn| offer_products(conn, offer_id))
            .await
    }

    pub async fn offer_sites(&self, offer_id: i64) -> Result<Vec<Site>, DocflowError> {
        self.db
            .with_conn_async(move |conn| offer_sites(conn, offer_id))
            .await
    }

    pub async fn certificate_details(&self, document_id: i64) -> Result<Option<CertificateDetails>, DocflowError> {
        self.db
            .with_conn_async(move |conn| certificate_details(conn, document_id))
            .await
    }

    pub async fn summary(&self) -> Result<PipelineSummary, DocflowError> {
        self.db
            .with_conn_async(move |conn| {
                let mut summary = PipelineSummary::default();
                for kind in DocumentKind::ALL {
                    summary.documents_by_kind.insert(kind.code().to_string(), 0);
                }
                let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM documents GROUP BY kind")?;
                let counts = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                for (kind, count) in counts {
                    summary.total_documents += count as u64;
                    summary.documents_by_kind.insert(kind, count as u64);
                }
                summary.training_sessions =
                    conn.query_row("SELECT COUNT(*) FROM training_sessions", [], |r| r.get::<_, i64>(0))? as u64;
                summary.participants =
                    conn.query_row("SELECT COUNT(*) FROM participants", [], |r| r.get::<_, i64>(0))? as u64;
                Ok(summary)
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Connection-level operations (run inside the caller's transaction)
// ---------------------------------------------------------------------------

/// Allocate a reference and insert the document. The reference, sequence
/// number and period are written here once and never updated.
pub(crate) fn insert_document(conn: &Connection, new: &NewDocument) -> Result<Document, DocflowError> {
    let entity_code: String = conn
        .query_row(
            "SELECT code FROM entities WHERE id = ?1",
            rusqlite::params![new.entity_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| DocflowError::NotFound(format!("Entity {} not found", new.entity_id)))?;

    let context_ids = reference::context_ids(new.kind, &new.links)?;
    let (year, month) = (new.created_at.year(), new.created_at.month());
    let sequence = reference::next_sequence(conn, new.entity_id, new.kind, year, month)?;
    let client_count = reference::client_count(conn, new.kind, new.client_id)?;
    let reference = reference::format_reference(&ReferenceParts {
        entity_code: &entity_code,
        kind: new.kind,
        context_ids: &context_ids,
        year,
        month,
        client_id: new.client_id,
        client_count,
        sequence,
    });
    tracing::debug!(
        "Allocated sequence {} for {}/{} {}-{:02}",
        sequence,
        entity_code,
        new.kind,
        year,
        month
    );

    let status = new.kind.initial_status();
    let created_ms = new.created_at.timestamp_millis();
    let links = &new.links;
    conn.execute(
        "INSERT INTO documents (kind, entity_id, client_id, reference, status, sequence_number,
                                period_year, period_month, amount_cents, comments, offer_id,
                                proforma_id, business_case_id, site_id, product_id,
                                training_session_id, participant_id, due_on, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)",
        rusqlite::params![
            new.kind.code(),
            new.entity_id,
            new.client_id,
            reference,
            status.as_str(),
            sequence,
            year,
            month,
            new.amount_cents,
            new.comments,
            links.offer_id,
            links.proforma_id,
            links.business_case_id,
            links.site_id,
            links.product_id,
            links.training_session_id,
            links.participant_id,
            date_to_sql(new.due_on),
            created_ms,
        ],
    )
    .map_err(|e| {
        on_constraint(e, || {
            format!("A conflicting {} already exists (reference {})", new.kind.label(), reference)
        })
    })?;

    Ok(Document {
        id: conn.last_insert_rowid(),
        kind: new.kind,
        entity_id: new.entity_id,
        client_id: new.client_id,
        reference,
        status,
        sequence_number: sequence,
        amount_cents: new.amount_cents,
        comments: new.comments.clone(),
        links: new.links.clone(),
        planned_end_on: None,
        due_on: new.due_on,
        paid_on: None,
        created_at: ms_to_dt(created_ms),
        updated_at: ms_to_dt(created_ms),
        validated_at: None,
        completed_at: None,
    })
}

pub(crate) fn get_document(conn: &Connection, id: i64) -> rusqlite::Result<Option<Document>> {
    conn.query_row(
        &format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS),
        rusqlite::params![id],
        row_to_document,
    )
    .optional()
}

/// Which link column ties a child kind to its parent.
pub(crate) fn parent_column(kind: DocumentKind) -> Option<&'static str> {
    match kind {
        DocumentKind::Offer => None,
        DocumentKind::Proforma => Some("offer_id"),
        DocumentKind::BusinessCase => Some("proforma_id"),
        DocumentKind::Invoice | DocumentKind::Report => Some("business_case_id"),
        DocumentKind::TrainingCertificate => Some("participant_id"),
    }
}

/// First `kind` document linked to `parent_id` through its parent column.
pub(crate) fn find_child(
    conn: &Connection,
    kind: DocumentKind,
    parent_id: i64,
) -> rusqlite::Result<Option<Document>> {
    let Some(column) = parent_column(kind) else {
        return Ok(None);
    };
    conn.query_row(
        &format!(
            "SELECT {} FROM documents WHERE kind = ?1 AND {} = ?2 ORDER BY id LIMIT 1",
            DOCUMENT_COLUMNS, column
        ),
        rusqlite::params![kind.code(), parent_id],
        row_to_document,
    )
    .optional()
}

pub(crate) fn update_status(
    conn: &Connection,
    id: i64,
    status: DocumentStatus,
    validated_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE documents SET status = ?1, validated_at = ?2, completed_at = ?3, updated_at = ?4
         WHERE id = ?5",
        rusqlite::params![
            status.as_str(),
            validated_at.map(|t| t.timestamp_millis()),
            completed_at.map(|t| t.timestamp_millis()),
            now.timestamp_millis(),
            id,
        ],
    )?;
    Ok(())
}

pub(crate) fn update_comments(conn: &Connection, id: i64, comments: Option<&str>, now: DateTime<Utc>) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE documents SET comments = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![comments, now.timestamp_millis(), id],
    )?;
    Ok(())
}

pub(crate) fn update_dates(
    conn: &Connection,
    id: i64,
    planned_end_on: Option<NaiveDate>,
    paid_on: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE documents SET planned_end_on = ?1, paid_on = ?2, updated_at = ?3 WHERE id = ?4",
        rusqlite::params![date_to_sql(planned_end_on), date_to_sql(paid_on), now.timestamp_millis(), id],
    )?;
    Ok(())
}

pub(crate) fn link_offer_items(conn: &Connection, offer_id: i64, product_ids: &[i64], site_ids: &[i64]) -> rusqlite::Result<()> {
    for product_id in product_ids {
        conn.execute(
            "INSERT OR IGNORE INTO offer_products (offer_id, product_id) VALUES (?1, ?2)",
            rusqlite::params![offer_id, product_id],
        )?;
    }
    for site_id in site_ids {
        conn.execute(
            "INSERT OR IGNORE INTO offer_sites (offer_id, site_id) VALUES (?1, ?2)",
            rusqlite::params![offer_id, site_id],
        )?;
    }
    Ok(())
}

pub(crate) fn offer_products(conn: &Connection, offer_id: i64) -> rusqlite::Result<Vec<Product>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.category_id, p.code, p.name, p.description, p.standard_price_cents,
                p.is_active, p.created_at, p.updated_at
         FROM products p JOIN offer_products op ON op.product_id = p.id
         WHERE op.offer_id = ?1 ORDER BY p.id",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![offer_id], |row| {
            Ok(Product {
                id: row.get(0)?,
                category_id: row.get(1)?,
                code: row.get(2)?,
                name: row.get(3)?,
                description: row.get(4)?,
                standard_price_cents: row.get(5)?,
                is_active: row.get::<_, i64>(6)? != 0,
                created_at: ms_to_dt(row.get(7)?),
                updated_at: ms_to_dt(row.get(8)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn offer_sites(conn: &Connection, offer_id: i64) -> rusqlite::Result<Vec<Site>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.client_id, s.name, s.location, s.description, s.is_active, s.created_at
         FROM sites s JOIN offer_sites os ON os.site_id = s.id
         WHERE os.offer_id = ?1 ORDER BY s.id",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![offer_id], |row| {
            Ok(Site {
                id: row.get(0)?,
                client_id: row.get(1)?,
                name: row.get(2)?,
                location: row.get(3)?,
                description: row.get(4)?,
                is_active: row.get::<_, i64>(5)? != 0,
                created_at: ms_to_dt(row.get(6)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn insert_certificate_details(conn: &Connection, document_id: i64, details: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO certificate_details (document_id, details) VALUES (?1, ?2)",
        rusqlite::params![document_id, details],
    )?;
    Ok(())
}

pub(crate) fn certificate_details(conn: &Connection, document_id: i64) -> rusqlite::Result<Option<CertificateDetails>> {
    conn.query_row(
        "SELECT document_id, details, skills_acquired, evaluation_result, trainer_signed, participant_signed
         FROM certificate_details WHERE document_id = ?1",
        rusqlite::params![document_id],
        |row| {
            Ok(CertificateDetails {
                document_id: row.get(0)?,
                details: row.get(1)?,
                skills_acquired: row.get(2)?,
                evaluation_result: row.get(3)?,
                trainer_signed: row.get::<_, i64>(4)? != 0,
                participant_signed: row.get::<_, i64>(5)? != 0,
            })
        },
    )
    .optional()
}

pub(crate) fn save_certificate_details(conn: &Connection, details: &CertificateDetails) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE certificate_details SET skills_acquired = ?1, evaluation_result = ?2,
                trainer_signed = ?3, participant_signed = ?4
         WHERE document_id = ?5",
        rusqlite::params![
            details.skills_acquired,
            details.evaluation_result,
            details.trainer_signed as i64,
            details.participant_signed as i64,
            details.document_id,
        ],
    )?;
    Ok(())
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let kind_code: String = row.get(1)?;
    let kind = DocumentKind::from_code(&kind_code).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(1, "kind".to_string(), rusqlite::types::Type::Text)
    })?;
    let status_str: String = row.get(5)?;
    let status = DocumentStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(5, "status".to_string(), rusqlite::types::Type::Text)
    })?;

    Ok(Document {
        id: row.get(0)?,
        kind,
        entity_id: row.get(2)?,
        client_id: row.get(3)?,
        reference: row.get(4)?,
        status,
        sequence_number: row.get(6)?,
        amount_cents: row.get(7)?,
        comments: row.get(8)?,
        links: DocumentLinks {
            offer_id: row.get(9)?,
            proforma_id: row.get(10)?,
            business_case_id: row.get(11)?,
            site_id: row.get(12)?,
            product_id: row.get(13)?,
            training_session_id: row.get(14)?,
            participant_id: row.get(15)?,
        },
        planned_end_on: sql_to_date(row.get(16)?),
        due_on: sql_to_date(row.get(17)?),
        paid_on: sql_to_date(row.get(18)?),
        created_at: ms_to_dt(row.get(19)?),
        updated_at: ms_to_dt(row.get(20)?),
        validated_at: opt_ms_to_dt(row.get(21)?),
        completed_at: opt_ms_to_dt(row.get(22)?),
    })
}
