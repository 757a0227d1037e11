use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PaymentKind, PaymentRecord, PaymentStatus};

/// Topics for payment events.
pub mod topics {
    pub const STATUS: &str = "payments.status";
}

/// Type of payment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    PaymentCreated,
    PaymentAccepted,
    PaymentRefused,
    PaymentFailed,
}

impl EventType {
    /// The event a terminal transition maps to; PENDING has none.
    pub fn from_status(status: PaymentStatus) -> Option<Self> {
        match status {
            PaymentStatus::Accepted => Some(EventType::PaymentAccepted),
            PaymentStatus::Refused => Some(EventType::PaymentRefused),
            PaymentStatus::Failed => Some(EventType::PaymentFailed),
            PaymentStatus::Pending => None,
        }
    }
}

/// Envelope wrapping all events with common metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    pub fn new(event_type: EventType, payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            source: "payment-engine".to_string(),
            payload,
        }
    }
}

/// One-way notification consumed by the surrounding enrollment system,
/// e.g. to update a candidature record or send a confirmation email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_id: i64,
    pub external_reference: String,
    pub payer_id: i64,
    pub context_id: i64,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
}

impl PaymentEvent {
    pub fn topic() -> &'static str {
        topics::STATUS
    }

    pub fn from_record(record: &PaymentRecord) -> Self {
        Self {
            payment_id: record.id,
            external_reference: record.external_reference.clone(),
            payer_id: record.payer_id,
            context_id: record.context_id,
            kind: record.kind,
            status: record.status,
            amount: record.amount,
            currency: record.currency.clone(),
        }
    }
}
