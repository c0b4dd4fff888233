//! Allowed status moves per document kind.

use crate::error::DocflowError;
use crate::models::{DocumentKind, DocumentStatus};

use DocumentStatus::*;

/// Statuses reachable in one step from `from`.
pub fn allowed_next(kind: DocumentKind, from: DocumentStatus) -> &'static [DocumentStatus] {
    match kind {
        DocumentKind::BusinessCase => match from {
            InProgress => &[Completed, Cancelled],
            _ => &[],
        },
        _ => match from {
            Draft => &[Sent],
            Sent => &[Validated, Refused],
            Refused => &[Draft],
            Validated => &[Completed],
            _ => &[],
        },
    }
}

pub fn check_transition(
    kind: DocumentKind,
    from: DocumentStatus,
    to: DocumentStatus,
) -> Result<(), DocflowError> {
    if allowed_next(kind, from).contains(&to) {
        Ok(())
    } else {
        Err(DocflowError::InvalidTransition(format!(
            "A {} cannot move from {} to {}",
            kind.label(),
            from,
            to
        )))
    }
}

/// Whether entering `to` spawns downstream documents for this kind.
pub fn triggers_cascade(kind: DocumentKind, to: DocumentStatus) -> bool {
    matches!(
        (kind, to),
        (DocumentKind::Offer, Validated)
            | (DocumentKind::Proforma, Validated)
            | (DocumentKind::BusinessCase, Completed)
    )
}
