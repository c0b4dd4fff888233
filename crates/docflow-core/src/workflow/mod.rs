//! Document lifecycle: offer creation, status transitions and the cascade
//! of downstream documents.
//!
//! ```text
//! Offer ──validated──► Proforma ──validated──► BusinessCase ──completed──► Invoice
//!                                                                  ├──────► Report (site × product)
//!                                                                  └──────► TrainingSession (training products)
//!                                                                                └─► TrainingCertificate (per participant)
//! ```
//!
//! Every operation runs in a single IMMEDIATE transaction: a status change
//! and the documents it spawns are committed together or not at all.

pub mod cascade;
pub mod transitions;

pub use cascade::CascadeOutput;
pub use transitions::{allowed_next, check_transition, triggers_cascade};

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::config::DocflowConfig;
use crate::db::Database;
use crate::error::DocflowError;
use crate::models::{
    CertificateDetails, CertificateUpdate, CreateOfferInput, Document, DocumentKind, DocumentStatus,
    NewDocument, TransitionContext,
};
use crate::store::{catalog_store, document_store, history_store, training_store};

/// Result of a status change: the updated document and whatever it spawned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub document: Document,
    #[serde(flatten)]
    pub cascade: CascadeOutput,
}

#[derive(Clone)]
pub struct DocumentWorkflow {
    db: Database,
    config: DocflowConfig,
}

impl DocumentWorkflow {
    pub fn new(db: Database, config: DocflowConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &DocflowConfig {
        &self.config
    }

    /// Create a draft offer priced at the sum of its products' standard prices.
    pub async fn create_offer(
        &self,
        input: CreateOfferInput,
        ctx: TransitionContext,
    ) -> Result<Document, DocflowError> {
        let mut product_ids = input.product_ids.clone();
        product_ids.sort_unstable();
        product_ids.dedup();
        if product_ids.is_empty() {
            return Err(DocflowError::Validation(
                "An offer needs at least one product".to_string(),
            ));
        }
        let mut site_ids = input.site_ids.clone();
        site_ids.sort_unstable();
        site_ids.dedup();

        let record_history = self.config.record_history;
        self.db
            .with_tx_async(move |conn| {
                require_client(conn, input.client_id)?;

                let mut amount_cents = 0i64;
                for product_id in &product_ids {
                    let product = catalog_store::get_product(conn, *product_id)?
                        .ok_or_else(|| DocflowError::NotFound(format!("Product {} not found", product_id)))?;
                    let category = catalog_store::get_category(conn, product.category_id)?.ok_or_else(|| {
                        DocflowError::NotFound(format!("Category {} not found", product.category_id))
                    })?;
                    if category.entity_id != input.entity_id {
                        return Err(DocflowError::Validation(format!(
                            "Product {} belongs to another entity's catalog",
                            product.code
                        )));
                    }
                    amount_cents += product.standard_price_cents;
                }
                for site_id in &site_ids {
                    let owner = site_owner(conn, *site_id)?
                        .ok_or_else(|| DocflowError::NotFound(format!("Site {} not found", site_id)))?;
                    if owner != input.client_id {
                        return Err(DocflowError::Validation(format!(
                            "Site {} does not belong to client {}",
                            site_id, input.client_id
                        )));
                    }
                }

                let mut new = NewDocument::new(DocumentKind::Offer, input.entity_id, input.client_id);
                new.amount_cents = amount_cents;
                new.comments = input.comments;
                if let Some(created_at) = input.created_at {
                    new.created_at = created_at;
                }
                let offer = document_store::insert_document(conn, &new)?;
                document_store::link_offer_items(conn, offer.id, &product_ids, &site_ids)?;
                if record_history {
                    history_store::record(
                        conn,
                        offer.id,
                        "",
                        offer.status.as_str(),
                        ctx.changed_by.as_deref(),
                        ctx.comment.as_deref(),
                        offer.created_at,
                    )?;
                }
                tracing::info!("Created offer {} ({} cents)", offer.reference, offer.amount_cents);
                Ok(offer)
            })
            .await
    }

    /// Move a document to `to`, running the cascade when the new status triggers one.
    pub async fn transition(
        &self,
        id: i64,
        to: DocumentStatus,
        ctx: TransitionContext,
    ) -> Result<TransitionOutcome, DocflowError> {
        let config = self.config.clone();
        let result = self
            .db
            .with_tx_async(move |conn| {
                let now = Utc::now();
                let current = load(conn, id)?;
                check_transition(current.kind, current.status, to)?;

                let validated_at = if to == DocumentStatus::Validated {
                    Some(now)
                } else {
                    current.validated_at
                };
                let completed_at = if to == DocumentStatus::Completed {
                    Some(now)
                } else {
                    current.completed_at
                };
                document_store::update_status(conn, id, to, validated_at, completed_at, now)?;
                if config.record_history {
                    history_store::record(
                        conn,
                        id,
                        current.status.as_str(),
                        to.as_str(),
                        ctx.changed_by.as_deref(),
                        ctx.comment.as_deref(),
                        now,
                    )?;
                }
                let document = load(conn, id)?;
                tracing::info!("{} moved from {} to {}", document.reference, current.status, to);

                let cascade = if triggers_cascade(document.kind, to) {
                    cascade::run(conn, &document, &config, &ctx, now)?
                } else {
                    CascadeOutput::default()
                };
                Ok(TransitionOutcome { document, cascade })
            })
            .await;
        if let Err(e) = &result {
            tracing::warn!("Transition of document {} to {} rejected: {}", id, to, e);
        }
        result
    }

    pub async fn validate(&self, id: i64, ctx: TransitionContext) -> Result<TransitionOutcome, DocflowError> {
        self.transition(id, DocumentStatus::Validated, ctx).await
    }

    pub async fn complete(&self, id: i64, ctx: TransitionContext) -> Result<TransitionOutcome, DocflowError> {
        self.transition(id, DocumentStatus::Completed, ctx).await
    }

    /// Create the downstream documents of an already validated/completed parent.
    pub async fn cascade(&self, id: i64, ctx: TransitionContext) -> Result<CascadeOutput, DocflowError> {
        let config = self.config.clone();
        let result = self
            .db
            .with_tx_async(move |conn| {
                let parent = load(conn, id)?;
                cascade::run(conn, &parent, &config, &ctx, Utc::now())
            })
            .await;
        if let Err(e) = &result {
            tracing::warn!("Cascade from document {} rejected: {}", id, e);
        }
        result
    }

    pub async fn update_comments(&self, id: i64, comments: Option<String>) -> Result<Document, DocflowError> {
        self.db
            .with_tx_async(move |conn| {
                let document = load(conn, id)?;
                if !document.is_editable() {
                    return Err(DocflowError::Validation(format!(
                        "{} is {} and can no longer be edited",
                        document.reference, document.status
                    )));
                }
                document_store::update_comments(conn, id, comments.as_deref(), Utc::now())?;
                load(conn, id)
            })
            .await
    }

    /// Planned end date of an in-progress business case.
    pub async fn set_planned_end(&self, id: i64, planned_end_on: NaiveDate) -> Result<Document, DocflowError> {
        self.db
            .with_tx_async(move |conn| {
                let case = load_kind(conn, id, DocumentKind::BusinessCase)?;
                if case.status != DocumentStatus::InProgress {
                    return Err(DocflowError::Validation(format!(
                        "{} is {} and its schedule is closed",
                        case.reference, case.status
                    )));
                }
                if planned_end_on < case.created_at.date_naive() {
                    return Err(DocflowError::Validation(
                        "The planned end date cannot precede the start date".to_string(),
                    ));
                }
                document_store::update_dates(conn, id, Some(planned_end_on), case.paid_on, Utc::now())?;
                load(conn, id)
            })
            .await
    }

    /// Record payment of an invoice; `paid_on` defaults to today.
    pub async fn mark_invoice_paid(&self, id: i64, paid_on: Option<NaiveDate>) -> Result<Document, DocflowError> {
        self.db
            .with_tx_async(move |conn| {
                let invoice = load_kind(conn, id, DocumentKind::Invoice)?;
                if let Some(paid) = invoice.paid_on {
                    return Err(DocflowError::Conflict(format!(
                        "{} was already paid on {}",
                        invoice.reference, paid
                    )));
                }
                let paid_on = paid_on.unwrap_or_else(|| Utc::now().date_naive());
                if paid_on < invoice.created_at.date_naive() {
                    return Err(DocflowError::Validation(
                        "The payment date cannot precede the invoice date".to_string(),
                    ));
                }
                document_store::update_dates(conn, id, invoice.planned_end_on, Some(paid_on), Utc::now())?;
                tracing::info!("{} paid on {}", invoice.reference, paid_on);
                load(conn, id)
            })
            .await
    }

    /// Issue a draft training certificate for a session participant.
    pub async fn issue_certificate(
        &self,
        participant_id: i64,
        details: String,
        ctx: TransitionContext,
    ) -> Result<Document, DocflowError> {
        if details.trim().is_empty() {
            return Err(DocflowError::Validation(
                "Certificate details are required".to_string(),
            ));
        }
        let record_history = self.config.record_history;
        self.db
            .with_tx_async(move |conn| {
                let participant = training_store::get_participant(conn, participant_id)?
                    .ok_or_else(|| DocflowError::NotFound(format!("Participant {} not found", participant_id)))?;
                let session = training_store::get_session(conn, participant.training_session_id)?.ok_or_else(|| {
                    DocflowError::NotFound(format!(
                        "Training session {} not found",
                        participant.training_session_id
                    ))
                })?;
                let case = load_kind(conn, session.business_case_id, DocumentKind::BusinessCase)?;
                if let Some(existing) =
                    document_store::find_child(conn, DocumentKind::TrainingCertificate, participant_id)?
                {
                    return Err(DocflowError::Conflict(format!(
                        "{} already has certificate {}",
                        participant.display_name(),
                        existing.reference
                    )));
                }

                let mut new = NewDocument::new(DocumentKind::TrainingCertificate, case.entity_id, case.client_id);
                new.links.business_case_id = Some(case.id);
                new.links.training_session_id = Some(session.id);
                new.links.participant_id = Some(participant.id);
                let certificate = document_store::insert_document(conn, &new)?;
                document_store::insert_certificate_details(conn, certificate.id, &details)?;
                if record_history {
                    history_store::record(
                        conn,
                        certificate.id,
                        "",
                        certificate.status.as_str(),
                        ctx.changed_by.as_deref(),
                        ctx.comment.as_deref(),
                        certificate.created_at,
                    )?;
                }
                tracing::info!(
                    "Issued certificate {} for {}",
                    certificate.reference,
                    participant.display_name()
                );
                Ok(certificate)
            })
            .await
    }

    /// Apply evaluation results and signatures to a certificate.
    pub async fn update_certificate(
        &self,
        id: i64,
        update: CertificateUpdate,
    ) -> Result<CertificateDetails, DocflowError> {
        self.db
            .with_tx_async(move |conn| {
                let certificate = load_kind(conn, id, DocumentKind::TrainingCertificate)?;
                let mut details = document_store::certificate_details(conn, id)?.ok_or_else(|| {
                    DocflowError::NotFound(format!("No details recorded for {}", certificate.reference))
                })?;
                if let Some(skills) = update.skills_acquired {
                    details.skills_acquired = Some(skills);
                }
                if let Some(result) = update.evaluation_result {
                    details.evaluation_result = Some(result);
                }
                if let Some(signed) = update.trainer_signed {
                    details.trainer_signed = signed;
                }
                if let Some(signed) = update.participant_signed {
                    details.participant_signed = signed;
                }
                document_store::save_certificate_details(conn, &details)?;
                tracing::debug!("Updated certificate {}", certificate.reference);
                Ok(details)
            })
            .await
    }

    pub async fn certificate_is_complete(&self, id: i64) -> Result<bool, DocflowError> {
        let details = self
            .db
            .with_conn_async(move |conn| document_store::certificate_details(conn, id))
            .await?;
        details
            .map(|d| d.is_complete())
            .ok_or_else(|| DocflowError::NotFound(format!("Certificate {} not found", id)))
    }
}

fn load(conn: &Connection, id: i64) -> Result<Document, DocflowError> {
    document_store::get_document(conn, id)?
        .ok_or_else(|| DocflowError::NotFound(format!("Document {} not found", id)))
}

fn load_kind(conn: &Connection, id: i64, kind: DocumentKind) -> Result<Document, DocflowError> {
    let document = load(conn, id)?;
    if document.kind != kind {
        return Err(DocflowError::Validation(format!(
            "{} is not a {}",
            document.reference,
            kind.label()
        )));
    }
    Ok(document)
}

fn require_client(conn: &Connection, client_id: i64) -> Result<(), DocflowError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT id FROM clients WHERE id = ?1",
            rusqlite::params![client_id],
            |row| row.get(0),
        )
        .optional()?;
    exists
        .map(|_| ())
        .ok_or_else(|| DocflowError::NotFound(format!("Client {} not found", client_id)))
}

fn site_owner(conn: &Connection, site_id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT client_id FROM sites WHERE id = ?1",
        rusqlite::params![site_id],
        |row| row.get(0),
    )
    .optional()
}
