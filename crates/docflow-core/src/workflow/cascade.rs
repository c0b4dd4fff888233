//! Downstream document creation.
//!
//! Each function runs inside the caller's transaction and either creates
//! every child record or returns an error, in which case the caller's
//! transaction is dropped and nothing is persisted.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

use crate::config::DocflowConfig;
use crate::error::DocflowError;
use crate::models::{
    Document, DocumentKind, DocumentLinks, DocumentStatus, NewDocument, TrainingSession,
    TransitionContext,
};
use crate::store::{catalog_store, document_store, history_store, training_store};

/// Records produced by one cascade step.
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeOutput {
    pub documents: Vec<Document>,
    pub training_sessions: Vec<TrainingSession>,
}

pub(crate) fn run(
    conn: &Connection,
    parent: &Document,
    config: &DocflowConfig,
    ctx: &TransitionContext,
    now: DateTime<Utc>,
) -> Result<CascadeOutput, DocflowError> {
    let output = match parent.kind {
        DocumentKind::Offer => from_offer(conn, parent, config, ctx, now)?,
        DocumentKind::Proforma => from_proforma(conn, parent, config, ctx, now)?,
        DocumentKind::BusinessCase => from_business_case(conn, parent, config, ctx, now)?,
        other => {
            return Err(DocflowError::Validation(format!(
                "A {} does not produce downstream documents",
                other.label()
            )))
        }
    };
    tracing::info!(
        "Cascade from {} created {} document(s) and {} training session(s)",
        parent.reference,
        output.documents.len(),
        output.training_sessions.len()
    );
    Ok(output)
}

fn require_validated(parent: &Document) -> Result<(), DocflowError> {
    if parent.status != DocumentStatus::Validated {
        return Err(DocflowError::Validation(format!(
            "{} must be validated before its next document can be created (status is {})",
            parent.reference, parent.status
        )));
    }
    if parent.validated_at.is_none() {
        return Err(DocflowError::Validation(format!(
            "{} is validated but has no validation date",
            parent.reference
        )));
    }
    Ok(())
}

fn require_no_child(conn: &Connection, kind: DocumentKind, parent: &Document) -> Result<(), DocflowError> {
    if let Some(existing) = document_store::find_child(conn, kind, parent.id)? {
        return Err(DocflowError::Conflict(format!(
            "{} already has a {} ({})",
            parent.reference,
            kind.label(),
            existing.reference
        )));
    }
    Ok(())
}

fn create_child(
    conn: &Connection,
    new: NewDocument,
    parent: &Document,
    config: &DocflowConfig,
    ctx: &TransitionContext,
) -> Result<Document, DocflowError> {
    let document = document_store::insert_document(conn, &new)?;
    if config.record_history {
        let comment = format!("Created from {}", parent.reference);
        history_store::record(
            conn,
            document.id,
            "",
            document.status.as_str(),
            ctx.changed_by.as_deref(),
            Some(&comment),
            document.created_at,
        )?;
    }
    tracing::info!("Created {} {}", document.kind.label(), document.reference);
    Ok(document)
}

fn from_offer(
    conn: &Connection,
    offer: &Document,
    config: &DocflowConfig,
    ctx: &TransitionContext,
    now: DateTime<Utc>,
) -> Result<CascadeOutput, DocflowError> {
    require_no_child(conn, DocumentKind::Proforma, offer)?;
    require_validated(offer)?;

    let mut new = NewDocument::new(DocumentKind::Proforma, offer.entity_id, offer.client_id);
    new.amount_cents = offer.amount_cents;
    new.links.offer_id = Some(offer.id);
    new.created_at = now;
    let proforma = create_child(conn, new, offer, config, ctx)?;

    Ok(CascadeOutput {
        documents: vec![proforma],
        training_sessions: Vec::new(),
    })
}

fn from_proforma(
    conn: &Connection,
    proforma: &Document,
    config: &DocflowConfig,
    ctx: &TransitionContext,
    now: DateTime<Utc>,
) -> Result<CascadeOutput, DocflowError> {
    require_no_child(conn, DocumentKind::BusinessCase, proforma)?;
    require_validated(proforma)?;
    let offer_id = proforma.links.offer_id.ok_or_else(|| {
        DocflowError::Validation(format!("{} is not linked to an offer", proforma.reference))
    })?;

    let mut new = NewDocument::new(DocumentKind::BusinessCase, proforma.entity_id, proforma.client_id);
    new.amount_cents = proforma.amount_cents;
    new.links = DocumentLinks {
        offer_id: Some(offer_id),
        proforma_id: Some(proforma.id),
        ..Default::default()
    };
    new.created_at = now;
    let business_case = create_child(conn, new, proforma, config, ctx)?;

    Ok(CascadeOutput {
        documents: vec![business_case],
        training_sessions: Vec::new(),
    })
}

fn from_business_case(
    conn: &Connection,
    case: &Document,
    config: &DocflowConfig,
    ctx: &TransitionContext,
    now: DateTime<Utc>,
) -> Result<CascadeOutput, DocflowError> {
    require_no_child(conn, DocumentKind::Invoice, case)?;
    if case.status != DocumentStatus::Completed {
        return Err(DocflowError::Validation(format!(
            "{} must be completed before invoicing (status is {})",
            case.reference, case.status
        )));
    }
    if training_store::count_sessions(conn, case.id)? > 0 {
        return Err(DocflowError::Conflict(format!(
            "{} already has training sessions",
            case.reference
        )));
    }
    let offer_id = case.links.offer_id.ok_or_else(|| {
        DocflowError::Validation(format!("{} is not linked to an offer", case.reference))
    })?;

    let mut output = CascadeOutput::default();

    let mut invoice = NewDocument::new(DocumentKind::Invoice, case.entity_id, case.client_id);
    invoice.amount_cents = case.amount_cents;
    invoice.links.business_case_id = Some(case.id);
    invoice.due_on = config
        .invoice_payment_terms_days
        .map(|days| (now + Duration::days(i64::from(days))).date_naive());
    invoice.created_at = now;
    output.documents.push(create_child(conn, invoice, case, config, ctx)?);

    let products = document_store::offer_products(conn, offer_id)?;
    let sites = document_store::offer_sites(conn, offer_id)?;

    for site in &sites {
        for product in &products {
            let mut report = NewDocument::new(DocumentKind::Report, case.entity_id, case.client_id);
            report.links = DocumentLinks {
                business_case_id: Some(case.id),
                site_id: Some(site.id),
                product_id: Some(product.id),
                ..Default::default()
            };
            report.created_at = now;
            output.documents.push(create_child(conn, report, case, config, ctx)?);
        }
    }

    let ends_at = case
        .completed_at
        .or_else(|| case.planned_end_on.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc()));
    for product in &products {
        let category = catalog_store::get_category(conn, product.category_id)?.ok_or_else(|| {
            DocflowError::NotFound(format!("Category {} not found", product.category_id))
        })?;
        if !category.is_training(&config.training_category_code) {
            continue;
        }
        let session = training_store::insert_session(
            conn,
            case.id,
            case.client_id,
            product.id,
            &format!("Training {}", product.name),
            &format!("Training on {} for {}", product.name, case.reference),
            Some(case.created_at),
            ends_at,
            now,
        )?;
        tracing::info!("Created training session {} for {}", session.id, case.reference);
        output.training_sessions.push(session);
    }

    Ok(output)
}
