use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What a payment funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    /// Enrollment application fee.
    RegistrationFee,
    /// Fee for the training itself.
    TuitionFee,
}

/// Status of a payment in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Created locally, outcome not yet known.
    Pending,
    /// Gateway confirmed the payment.
    Accepted,
    /// Gateway reported an explicit refusal.
    Refused,
    /// Initiation rejected, or verification attempts exhausted.
    Failed,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::RegistrationFee => "REGISTRATION_FEE",
            PaymentKind::TuitionFee => "TUITION_FEE",
        }
    }
}

impl PaymentStatus {
    /// Returns true if the status is terminal.
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Accepted => "ACCEPTED",
            PaymentStatus::Refused => "REFUSED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

/// One payment attempt, as stored in the ledger.
///
/// `status` is the only mutable field after creation besides `updated_at`
/// and the gateway-supplied metadata columns, which are additive only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub id: i64,
    /// Idempotency key shared with the gateway; globally unique.
    pub external_reference: String,
    pub payer_id: i64,
    /// The enrollment/session this payment funds.
    pub context_id: i64,
    /// Amount in minor currency units; always positive.
    pub amount: i64,
    pub currency: String,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub payment_url: Option<String>,
    pub payment_token: Option<String>,
    pub payment_method: Option<String>,
    pub operator_id: Option<String>,
    pub error_message: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a new ledger row.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub external_reference: String,
    pub payer_id: i64,
    pub context_id: i64,
    pub amount: i64,
    pub currency: String,
    pub kind: PaymentKind,
    pub description: Option<String>,
}

/// Gateway-supplied metadata attached to a status transition.
///
/// `None` fields leave the stored value untouched; metadata is never
/// cleared once written.
#[derive(Debug, Clone, Default)]
pub struct StatusMetadata {
    pub payment_method: Option<String>,
    pub operator_id: Option<String>,
    pub error_message: Option<String>,
}

/// Outcome of `apply_status`: the row after the call, and whether this
/// call performed the transition (false for legal-but-ignored no-ops).
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub record: PaymentRecord,
    pub applied: bool,
}

/// Aggregate payment counts, plus the accepted total in minor units.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentStatistics {
    pub total: i64,
    pub pending: i64,
    pub accepted: i64,
    pub refused: i64,
    pub failed: i64,
    pub accepted_amount: i64,
}

/// Builds the external reference for a new payment:
/// `{OPERATOR}_{payer}_{context}_{yyyymmddhhmmssmmm}`.
///
/// The operator tag is fixed here, at creation, and never re-derived.
pub fn generate_reference(
    operator_tag: &str,
    payer_id: i64,
    context_id: i64,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}_{}_{}_{}",
        operator_tag.to_uppercase(),
        payer_id,
        context_id,
        at.format("%Y%m%d%H%M%S%3f")
    )
}
