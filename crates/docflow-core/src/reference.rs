//! Reference numbering.
//!
//! Every document gets a human-readable reference at first save:
//!
//! ```text
//! {ENTITY}-{TYPE}-{context ids...}-{YEAR}-{MONTH:02}-{CLIENT_ID}-{CLIENT_COUNT}-{SEQ:04}
//! ACM-PRO-12-2025-01-3-2-0007
//! ```
//!
//! `SEQ` is the monthly sequence: highest sequence number already issued for
//! the same (entity, type, year, month) plus one. `CLIENT_COUNT` is the number
//! of documents of that type the client already has plus one. Both are read
//! inside the caller's write transaction, see [`crate::db::Database::with_tx`].

use rusqlite::Connection;

use crate::error::DocflowError;
use crate::models::{DocumentKind, DocumentLinks};

/// Inputs of [`format_reference`].
#[derive(Debug, Clone)]
pub struct ReferenceParts<'a> {
    pub entity_code: &'a str,
    pub kind: DocumentKind,
    pub context_ids: &'a [i64],
    pub year: i32,
    pub month: u32,
    pub client_id: i64,
    pub client_count: u32,
    pub sequence: u32,
}

pub fn format_reference(parts: &ReferenceParts<'_>) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(7 + parts.context_ids.len());
    segments.push(parts.entity_code.to_string());
    segments.push(parts.kind.code().to_string());
    segments.extend(parts.context_ids.iter().map(|id| id.to_string()));
    segments.push(parts.year.to_string());
    segments.push(format!("{:02}", parts.month));
    segments.push(parts.client_id.to_string());
    segments.push(parts.client_count.to_string());
    segments.push(format!("{:04}", parts.sequence));
    segments.join("-")
}

/// A reference split back into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    pub entity_code: String,
    pub kind: DocumentKind,
    pub context_ids: Vec<i64>,
    pub year: i32,
    pub month: u32,
    pub client_id: i64,
    pub client_count: u32,
    pub sequence: u32,
}

pub fn parse_reference(reference: &str) -> Result<ParsedReference, DocflowError> {
    let invalid = |why: &str| DocflowError::Validation(format!("Invalid reference '{}': {}", reference, why));

    let segments: Vec<&str> = reference.split('-').collect();
    if segments.len() < 7 {
        return Err(invalid("too few segments"));
    }
    let kind = DocumentKind::from_code(segments[1]).ok_or_else(|| invalid("unknown document type"))?;
    let expected = context_arity(kind);
    if segments.len() != 7 + expected {
        return Err(invalid("wrong number of segments for document type"));
    }

    let num = |s: &str| s.parse::<i64>().map_err(|_| invalid("non-numeric segment"));
    let tail = &segments[2 + expected..];
    let month = num(tail[1])?;
    if !(1..=12).contains(&month) {
        return Err(invalid("month out of range"));
    }

    Ok(ParsedReference {
        entity_code: segments[0].to_string(),
        kind,
        context_ids: segments[2..2 + expected]
            .iter()
            .map(|s| num(s))
            .collect::<Result<Vec<_>, _>>()?,
        year: i32::try_from(num(tail[0])?).map_err(|_| invalid("year out of range"))?,
        month: month as u32,
        client_id: num(tail[2])?,
        client_count: u32::try_from(num(tail[3])?).map_err(|_| invalid("client count out of range"))?,
        sequence: u32::try_from(num(tail[4])?).map_err(|_| invalid("sequence out of range"))?,
    })
}

fn context_arity(kind: DocumentKind) -> usize {
    match kind {
        DocumentKind::Offer => 0,
        DocumentKind::TrainingCertificate => 3,
        _ => 1,
    }
}

/// The upstream ids a document kind embeds in its reference.
pub fn context_ids(kind: DocumentKind, links: &DocumentLinks) -> Result<Vec<i64>, DocflowError> {
    let require = |id: Option<i64>, what: &str| {
        id.ok_or_else(|| {
            DocflowError::Validation(format!("A {} must be linked to a {}", kind.label(), what))
        })
    };
    Ok(match kind {
        DocumentKind::Offer => Vec::new(),
        DocumentKind::Proforma | DocumentKind::BusinessCase => vec![require(links.offer_id, "offer")?],
        DocumentKind::Invoice | DocumentKind::Report => {
            vec![require(links.business_case_id, "business case")?]
        }
        DocumentKind::TrainingCertificate => vec![
            require(links.business_case_id, "business case")?,
            require(links.training_session_id, "training session")?,
            require(links.participant_id, "participant")?,
        ],
    })
}

/// Next monthly sequence number for (entity, kind, year, month).
pub fn next_sequence(
    conn: &Connection,
    entity_id: i64,
    kind: DocumentKind,
    year: i32,
    month: u32,
) -> Result<u32, rusqlite::Error> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sequence_number), 0) FROM documents
         WHERE entity_id = ?1 AND kind = ?2 AND period_year = ?3 AND period_month = ?4",
        rusqlite::params![entity_id, kind.code(), year, month],
        |row| row.get(0),
    )?;
    Ok(max as u32 + 1)
}

/// Running count of `kind` documents for a client, including the one about to be created.
pub fn client_count(conn: &Connection, kind: DocumentKind, client_id: i64) -> Result<u32, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE kind = ?1 AND client_id = ?2",
        rusqlite::params![kind.code(), client_id],
        |row| row.get(0),
    )?;
    Ok(count as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_offer_reference() {
        let parts = ReferenceParts {
            entity_code: "ACM",
            kind: DocumentKind::Offer,
            context_ids: &[],
            year: 2025,
            month: 1,
            client_id: 3,
            client_count: 2,
            sequence: 7,
        };
        assert_eq!(format_reference(&parts), "ACM-OFF-2025-01-3-2-0007");
    }

    #[test]
    fn test_format_certificate_reference() {
        let parts = ReferenceParts {
            entity_code: "ACM",
            kind: DocumentKind::TrainingCertificate,
            context_ids: &[4, 9, 11],
            year: 2024,
            month: 12,
            client_id: 1,
            client_count: 1,
            sequence: 12345,
        };
        assert_eq!(format_reference(&parts), "ACM-ATT-4-9-11-2024-12-1-1-12345");
    }

    #[test]
    fn test_parse_reference() {
        let parsed = parse_reference("ACM-PRO-12-2025-03-3-2-0042").unwrap();
        assert_eq!(parsed.entity_code, "ACM");
        assert_eq!(parsed.kind, DocumentKind::Proforma);
        assert_eq!(parsed.context_ids, vec![12]);
        assert_eq!(parsed.year, 2025);
        assert_eq!(parsed.month, 3);
        assert_eq!(parsed.client_id, 3);
        assert_eq!(parsed.client_count, 2);
        assert_eq!(parsed.sequence, 42);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_reference("ACM-OFF-2025").is_err());
        assert!(parse_reference("ACM-XYZ-2025-01-3-2-0007").is_err());
        assert!(parse_reference("ACM-OFF-2025-13-3-2-0007").is_err());
        assert!(parse_reference("ACM-OFF-5-2025-01-3-2-0007").is_err());
        assert!(parse_reference("ACM-OFF-2025-01-x-2-0007").is_err());
        assert!(parse_reference("ACM-OFF-2025-01-3-2-99999999999").is_err());
        assert!(parse_reference("ACM-OFF-2025-01-3--1-0007").is_err());
    }

    #[test]
    fn test_context_ids_require_links() {
        let links = DocumentLinks::default();
        assert!(context_ids(DocumentKind::Offer, &links).unwrap().is_empty());
        assert!(context_ids(DocumentKind::Proforma, &links).is_err());

        let links = DocumentLinks {
            business_case_id: Some(5),
            ..Default::default()
        };
        assert_eq!(context_ids(DocumentKind::Invoice, &links).unwrap(), vec![5]);
    }
}
