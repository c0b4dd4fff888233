use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a document's status audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub id: i64,
    pub document_id: i64,
    /// Empty for the row recorded when the document was created.
    pub old_status: String,
    pub new_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Who is asking for a transition, and why.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionContext {
    pub changed_by: Option<String>,
    pub comment: Option<String>,
}

impl TransitionContext {
    pub fn by(user: impl Into<String>) -> Self {
        Self {
            changed_by: Some(user.into()),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
