use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{PaymentKind, PaymentRecord, PaymentStatus};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ErrorResponse) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationErrorDetail>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Validation error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Payment DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: i64,
    pub external_reference: String,
    pub payer_id: i64,
    pub context_id: i64,
    pub amount: i64,
    pub currency: String,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub payment_url: Option<String>,
    pub payment_method: Option<String>,
    pub operator_id: Option<String>,
    pub error_message: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            id: record.id,
            external_reference: record.external_reference,
            payer_id: record.payer_id,
            context_id: record.context_id,
            amount: record.amount,
            currency: record.currency,
            kind: record.kind,
            status: record.status,
            description: record.description,
            payment_url: record.payment_url,
            payment_method: record.payment_method,
            operator_id: record.operator_id,
            error_message: record.error_message,
            settled_at: record.settled_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Response to a successful initiation: everything the client needs to
/// redirect the payer to the gateway checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResponse {
    pub transaction_id: i64,
    pub external_reference: String,
    pub payment_url: Option<String>,
    pub status: PaymentStatus,
}

impl From<PaymentRecord> for InitiatePaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            transaction_id: record.id,
            external_reference: record.external_reference,
            payment_url: record.payment_url,
            status: record.status,
        }
    }
}

/// Acknowledgement of a webhook delivery. `status` is absent when the
/// confirming verification could not run (gateway retries the webhook).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAck {
    pub external_reference: String,
    pub status: Option<PaymentStatus>,
}
