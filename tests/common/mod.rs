#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use payment_engine::error::{AppError, Result};
use payment_engine::gateway::{InitiatedPayment, PaymentGateway, VerificationResult, VerifiedStatus};
use payment_engine::models::{
    NewPayment, PaymentKind, PaymentRecord, PaymentStateMachine, PaymentStatistics, PaymentStatus,
    StatusMetadata, StatusTransition,
};
use payment_engine::queue::{QueueEntry, ReconciliationQueue};
use payment_engine::repositories::PaymentStore;
use payment_engine::services::{CreatePayment, PaymentService};

// ============================================================================
// In-memory ledger
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentStore {
    rows: Mutex<Vec<PaymentRecord>>,
    next_id: AtomicI64,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_of(&self, reference: &str) -> Option<PaymentStatus> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.external_reference == reference)
            .map(|r| r.status)
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, new_payment: NewPayment) -> Result<PaymentRecord> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.external_reference == new_payment.external_reference)
        {
            return Err(AppError::DuplicateReference(new_payment.external_reference));
        }

        let now = Utc::now();
        let record = PaymentRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            external_reference: new_payment.external_reference,
            payer_id: new_payment.payer_id,
            context_id: new_payment.context_id,
            amount: new_payment.amount,
            currency: new_payment.currency,
            kind: new_payment.kind,
            status: PaymentStatus::Pending,
            description: new_payment.description,
            payment_url: None,
            payment_token: None,
            payment_method: None,
            operator_id: None,
            error_message: None,
            settled_at: None,
            created_at: now,
            updated_at: now,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PaymentRecord>> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.external_reference == reference)
            .cloned())
    }

    async fn list_by_payer(&self, payer_id: i64) -> Result<Vec<PaymentRecord>> {
        let mut rows: Vec<PaymentRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.payer_id == payer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn apply_status(
        &self,
        reference: &str,
        new_status: PaymentStatus,
        metadata: StatusMetadata,
    ) -> Result<StatusTransition> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.external_reference == reference)
            .ok_or_else(|| AppError::NotFound(format!("payment {reference}")))?;

        if !PaymentStateMachine::can_transition(row.status, new_status) {
            return Ok(StatusTransition {
                record: row.clone(),
                applied: false,
            });
        }

        row.status = new_status;
        if let Some(method) = metadata.payment_method {
            row.payment_method = Some(method);
        }
        if let Some(operator_id) = metadata.operator_id {
            row.operator_id = Some(operator_id);
        }
        if let Some(message) = metadata.error_message {
            row.error_message = Some(message);
        }
        if new_status == PaymentStatus::Accepted && row.settled_at.is_none() {
            row.settled_at = Some(Utc::now());
        }
        row.updated_at = Utc::now();

        Ok(StatusTransition {
            record: row.clone(),
            applied: true,
        })
    }

    async fn record_initiation(
        &self,
        reference: &str,
        payment_url: &str,
        payment_token: &str,
    ) -> Result<PaymentRecord> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.external_reference == reference)
            .ok_or_else(|| AppError::NotFound(format!("payment {reference}")))?;
        row.payment_url = Some(payment_url.to_string());
        row.payment_token = Some(payment_token.to_string());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn pending_references(&self) -> Result<Vec<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == PaymentStatus::Pending)
            .map(|r| r.external_reference.clone())
            .collect())
    }

    async fn count_by_status(&self, status: PaymentStatus) -> Result<i64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == status)
            .count() as i64)
    }

    async fn statistics(&self) -> Result<PaymentStatistics> {
        let rows = self.rows.lock().unwrap();
        let count = |status: PaymentStatus| rows.iter().filter(|r| r.status == status).count() as i64;
        Ok(PaymentStatistics {
            total: rows.len() as i64,
            pending: count(PaymentStatus::Pending),
            accepted: count(PaymentStatus::Accepted),
            refused: count(PaymentStatus::Refused),
            failed: count(PaymentStatus::Failed),
            accepted_amount: rows
                .iter()
                .filter(|r| r.status == PaymentStatus::Accepted)
                .map(|r| r.amount)
                .sum(),
        })
    }
}

// ============================================================================
// In-memory reconciliation queue
// ============================================================================

pub struct InMemoryQueue {
    entries: Mutex<HashMap<String, QueueEntry>>,
    max_attempts: u32,
}

impl InMemoryQueue {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_attempts,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn entry(&self, reference: &str) -> Option<QueueEntry> {
        self.entries.lock().unwrap().get(reference).cloned()
    }
}

#[async_trait]
impl ReconciliationQueue for InMemoryQueue {
    async fn enqueue(&self, reference: &str, first_check_delay: Duration) -> Result<()> {
        let next_check_time =
            Utc::now() + chrono::Duration::seconds(first_check_delay.as_secs() as i64);
        self.entries.lock().unwrap().insert(
            reference.to_string(),
            QueueEntry {
                external_reference: reference.to_string(),
                next_check_time,
                attempts: 0,
                max_attempts: self.max_attempts,
            },
        );
        Ok(())
    }

    async fn due_entries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueEntry>> {
        let entries = self.entries.lock().unwrap();
        let mut due: Vec<QueueEntry> = entries
            .values()
            .filter(|e| e.next_check_time <= now)
            .cloned()
            .collect();
        due.sort_by_key(|e| e.next_check_time);
        due.truncate(limit);
        Ok(due)
    }

    async fn reschedule(
        &self,
        reference: &str,
        attempts: u32,
        next_check_time: DateTime<Utc>,
    ) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let max_attempts = self.max_attempts;
        let entry = entries
            .entry(reference.to_string())
            .or_insert_with(|| QueueEntry {
                external_reference: reference.to_string(),
                next_check_time,
                attempts,
                max_attempts,
            });
        entry.attempts = attempts;
        entry.next_check_time = next_check_time;
        Ok(())
    }

    async fn remove(&self, reference: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(reference);
        Ok(())
    }

    async fn contains(&self, reference: &str) -> Result<bool> {
        Ok(self.entries.lock().unwrap().contains_key(reference))
    }
}

// ============================================================================
// Scripted gateway
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyBehavior {
    Accepted,
    Refused,
    Pending,
    Unavailable,
}

pub struct FakeGateway {
    reject_initiation: bool,
    verify_behavior: Mutex<VerifyBehavior>,
    verify_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn with_verify(behavior: VerifyBehavior) -> Self {
        Self {
            reject_initiation: false,
            verify_behavior: Mutex::new(behavior),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::with_verify(VerifyBehavior::Accepted)
    }

    pub fn pending() -> Self {
        Self::with_verify(VerifyBehavior::Pending)
    }

    pub fn unavailable() -> Self {
        Self::with_verify(VerifyBehavior::Unavailable)
    }

    pub fn rejecting_initiation() -> Self {
        Self {
            reject_initiation: true,
            verify_behavior: Mutex::new(VerifyBehavior::Pending),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_verify(&self, behavior: VerifyBehavior) {
        *self.verify_behavior.lock().unwrap() = behavior;
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initiate(&self, payment: &PaymentRecord) -> Result<InitiatedPayment> {
        if self.reject_initiation {
            return Err(AppError::GatewayRejected("MERCHANT_NOT_FOUND".to_string()));
        }
        Ok(InitiatedPayment {
            payment_url: format!("https://checkout.example/{}", payment.external_reference),
            payment_token: format!("tok_{}", payment.id),
        })
    }

    async fn verify(&self, _external_reference: &str) -> Result<VerificationResult> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.verify_behavior.lock().unwrap();
        match behavior {
            VerifyBehavior::Accepted => Ok(VerificationResult {
                status: VerifiedStatus::Accepted,
                payment_method: Some("MOBILE_MONEY".to_string()),
                operator_id: Some("OP-123".to_string()),
                message: None,
            }),
            VerifyBehavior::Refused => Ok(VerificationResult {
                status: VerifiedStatus::Refused,
                payment_method: None,
                operator_id: None,
                message: Some("insufficient funds".to_string()),
            }),
            VerifyBehavior::Pending => Ok(VerificationResult::pending()),
            VerifyBehavior::Unavailable => Err(AppError::GatewayUnavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

// ============================================================================
// Wiring helpers
// ============================================================================

pub struct TestHarness {
    pub store: Arc<InMemoryPaymentStore>,
    pub queue: Arc<InMemoryQueue>,
    pub gateway: Arc<FakeGateway>,
    pub service: Arc<PaymentService>,
}

/// Wires a service over the in-memory doubles with an immediately-due
/// first check, which keeps worker tests free of real sleeps.
pub fn harness(gateway: FakeGateway, max_attempts: u32) -> TestHarness {
    let store = Arc::new(InMemoryPaymentStore::new());
    let queue = Arc::new(InMemoryQueue::new(max_attempts));
    let gateway = Arc::new(gateway);
    let service = Arc::new(
        PaymentService::new(
            store.clone(),
            gateway.clone(),
            queue.clone(),
            "cinetpay",
        )
        .with_first_check_delay(Duration::from_secs(0)),
    );

    TestHarness {
        store,
        queue,
        gateway,
        service,
    }
}

pub fn create_request(payer_id: i64, context_id: i64, amount: i64) -> CreatePayment {
    CreatePayment {
        payer_id,
        context_id,
        amount,
        currency: "XAF".to_string(),
        kind: PaymentKind::RegistrationFee,
        description: Some("Registration fee".to_string()),
    }
}
