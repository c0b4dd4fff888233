use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The document family of the sales pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    #[serde(rename = "OFF")]
    Offer,
    #[serde(rename = "PRO")]
    Proforma,
    #[serde(rename = "AFF")]
    BusinessCase,
    #[serde(rename = "FAC")]
    Invoice,
    #[serde(rename = "RAP")]
    Report,
    #[serde(rename = "ATT")]
    TrainingCertificate,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        Self::Offer,
        Self::Proforma,
        Self::BusinessCase,
        Self::Invoice,
        Self::Report,
        Self::TrainingCertificate,
    ];

    /// Three-letter type code used in references and in the `kind` column.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Offer => "OFF",
            Self::Proforma => "PRO",
            Self::BusinessCase => "AFF",
            Self::Invoice => "FAC",
            Self::Report => "RAP",
            Self::TrainingCertificate => "ATT",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "OFF" => Some(Self::Offer),
            "PRO" => Some(Self::Proforma),
            "AFF" => Some(Self::BusinessCase),
            "FAC" => Some(Self::Invoice),
            "RAP" => Some(Self::Report),
            "ATT" => Some(Self::TrainingCertificate),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Proforma => "proforma",
            Self::BusinessCase => "business case",
            Self::Invoice => "invoice",
            Self::Report => "report",
            Self::TrainingCertificate => "training certificate",
        }
    }

    /// Status a freshly created document of this kind starts in.
    pub fn initial_status(&self) -> DocumentStatus {
        match self {
            Self::BusinessCase => DocumentStatus::InProgress,
            _ => DocumentStatus::Draft,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    #[serde(rename = "DRAFT")]
    Draft,
    #[serde(rename = "SENT")]
    Sent,
    #[serde(rename = "VALIDATED")]
    Validated,
    #[serde(rename = "REFUSED")]
    Refused,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sent => "SENT",
            Self::Validated => "VALIDATED",
            Self::Refused => "REFUSED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "SENT" => Some(Self::Sent),
            "VALIDATED" => Some(Self::Validated),
            "REFUSED" => Some(Self::Refused),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upstream records a document was produced from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proforma_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_case_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_session_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub kind: DocumentKind,
    pub entity_id: i64,
    pub client_id: i64,
    pub reference: String,
    pub status: DocumentStatus,
    pub sequence_number: u32,
    pub amount_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(flatten)]
    pub links: DocumentLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_end_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Only drafts may have their free-form fields edited.
    pub fn is_editable(&self) -> bool {
        self.status == DocumentStatus::Draft
    }

    pub fn is_paid(&self) -> bool {
        self.paid_on.is_some()
    }

    /// (year, month) the sequence number was allocated in.
    pub fn period(&self) -> (i32, u32) {
        (self.created_at.year(), self.created_at.month())
    }
}

/// Everything needed to persist a new document; the reference and sequence
/// number are allocated by the store.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub entity_id: i64,
    pub client_id: i64,
    pub amount_cents: i64,
    pub comments: Option<String>,
    pub links: DocumentLinks,
    pub due_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl NewDocument {
    pub fn new(kind: DocumentKind, entity_id: i64, client_id: i64) -> Self {
        Self {
            kind,
            entity_id,
            client_id,
            amount_cents: 0,
            comments: None,
            links: DocumentLinks::default(),
            due_on: None,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating an offer, the entry point of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfferInput {
    pub entity_id: i64,
    pub client_id: i64,
    pub product_ids: Vec<i64>,
    #[serde(default)]
    pub site_ids: Vec<i64>,
    pub comments: Option<String>,
    /// Back-dates the offer (imports); defaults to now.
    pub created_at: Option<DateTime<Utc>>,
}

/// Training-certificate specific fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDetails {
    pub document_id: i64,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills_acquired: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_result: Option<String>,
    pub trainer_signed: bool,
    pub participant_signed: bool,
}

impl CertificateDetails {
    /// Signed by both parties with skills and evaluation recorded.
    pub fn is_complete(&self) -> bool {
        self.trainer_signed
            && self.participant_signed
            && self.skills_acquired.as_deref().is_some_and(|s| !s.is_empty())
            && self.evaluation_result.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Partial update for a certificate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateUpdate {
    pub skills_acquired: Option<String>,
    pub evaluation_result: Option<String>,
    pub trainer_signed: Option<bool>,
    pub participant_signed: Option<bool>,
}

/// Document counts per kind, the aggregate view of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub total_documents: u64,
    pub documents_by_kind: std::collections::BTreeMap<String, u64>,
    pub training_sessions: u64,
    pub participants: u64,
}
