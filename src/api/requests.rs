use serde::{Deserialize, Serialize};

use crate::models::PaymentKind;
use crate::services::CreatePayment;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Request to initiate a new payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    pub payer_id: i64,
    pub context_id: i64,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub kind: PaymentKind,
    pub description: Option<String>,
}

impl InitiatePaymentRequest {
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.payer_id <= 0 {
            errors.push(ValidationError {
                field: "payer_id".to_string(),
                message: "payer_id must be positive".to_string(),
            });
        }
        if self.context_id <= 0 {
            errors.push(ValidationError {
                field: "context_id".to_string(),
                message: "context_id must be positive".to_string(),
            });
        }
        if self.amount <= 0 {
            errors.push(ValidationError {
                field: "amount".to_string(),
                message: "amount must be a positive value in minor currency units".to_string(),
            });
        }
        if self.currency.len() != 3 {
            errors.push(ValidationError {
                field: "currency".to_string(),
                message: "currency must be a 3-letter ISO 4217 code".to_string(),
            });
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn into_create(self) -> CreatePayment {
        CreatePayment {
            payer_id: self.payer_id,
            context_id: self.context_id,
            amount: self.amount,
            currency: self.currency,
            kind: self.kind,
            description: self.description,
        }
    }
}

/// Form body of the post-checkout return redirect.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReturnPayload {
    pub transaction_id: Option<String>,
}
