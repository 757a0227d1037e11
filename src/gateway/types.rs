use serde::{Deserialize, Serialize};

use crate::models::PaymentStatus;

/// Result of a successful gateway initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatedPayment {
    pub payment_url: String,
    pub payment_token: String,
}

/// Canonical view of the gateway's status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedStatus {
    Accepted,
    Refused,
    /// Not yet resolved — including every vendor string outside the known
    /// set. A vendor vocabulary change must never fail a live payment.
    Pending,
}

impl VerifiedStatus {
    pub fn from_vendor(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "ACCEPTED" | "SUCCESS" => VerifiedStatus::Accepted,
            "REFUSED" => VerifiedStatus::Refused,
            _ => VerifiedStatus::Pending,
        }
    }

    /// The ledger transition this status triggers, if any.
    pub fn as_payment_status(&self) -> Option<PaymentStatus> {
        match self {
            VerifiedStatus::Accepted => Some(PaymentStatus::Accepted),
            VerifiedStatus::Refused => Some(PaymentStatus::Refused),
            VerifiedStatus::Pending => None,
        }
    }
}

/// Outcome of one verification call.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub status: VerifiedStatus,
    pub payment_method: Option<String>,
    pub operator_id: Option<String>,
    pub message: Option<String>,
}

impl VerificationResult {
    pub fn pending() -> Self {
        Self {
            status: VerifiedStatus::Pending,
            payment_method: None,
            operator_id: None,
            message: None,
        }
    }
}

/// Generic vendor response envelope: `code` plus an optional payload.
#[derive(Debug, Deserialize)]
pub(crate) struct VendorResponse<T> {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CheckoutData {
    pub payment_url: String,
    pub payment_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CheckData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub operator_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckoutRequest {
    pub apikey: String,
    pub site_id: String,
    pub transaction_id: String,
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub notify_url: String,
    pub return_url: String,
    pub channels: String,
    pub lang: String,
    pub customer_name: String,
    pub customer_email: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckRequest {
    pub apikey: String,
    pub site_id: String,
    pub transaction_id: String,
}
