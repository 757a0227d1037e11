use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::events::{EventEnvelope, EventPublisher, EventType, PaymentEvent};
use crate::gateway::{PaymentGateway, VerificationResult};
use crate::models::{
    generate_reference, NewPayment, PaymentKind, PaymentRecord, PaymentStatistics, PaymentStatus,
    StatusMetadata,
};
use crate::observability::get_metrics;
use crate::queue::ReconciliationQueue;
use crate::repositories::PaymentStore;

/// Which path produced a resolution. The state machine makes the two
/// racing paths converge; this only labels logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Webhook,
    Worker,
    Initiation,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Webhook => "webhook",
            ResolutionSource::Worker => "worker",
            ResolutionSource::Initiation => "initiation",
        }
    }
}

/// Parameters for creating a payment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub payer_id: i64,
    pub context_id: i64,
    pub amount: i64,
    pub currency: String,
    pub kind: PaymentKind,
    pub description: Option<String>,
}

/// Orchestrates the payment lifecycle across the ledger, the gateway,
/// the reconciliation queue, and the event stream.
pub struct PaymentService {
    store: Arc<dyn PaymentStore>,
    gateway: Arc<dyn PaymentGateway>,
    queue: Arc<dyn ReconciliationQueue>,
    events: Option<Arc<EventPublisher>>,
    operator_tag: String,
    first_check_delay: Duration,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn PaymentStore>,
        gateway: Arc<dyn PaymentGateway>,
        queue: Arc<dyn ReconciliationQueue>,
        operator_tag: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            queue,
            events: None,
            operator_tag: operator_tag.into(),
            first_check_delay: Duration::from_secs(15),
        }
    }

    pub fn with_events(mut self, events: Arc<EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_first_check_delay(mut self, delay: Duration) -> Self {
        self.first_check_delay = delay;
        self
    }

    /// Creates a payment: ledger insert, gateway initiation, queue entry.
    ///
    /// A gateway rejection moves the row straight to FAILED and surfaces
    /// synchronously; a transient gateway outage leaves the row PENDING
    /// (the startup queue rebuild will pick it up).
    pub async fn create_payment(&self, request: CreatePayment) -> Result<PaymentRecord> {
        if request.amount <= 0 {
            return Err(AppError::Validation(
                "amount must be a positive value in minor currency units".to_string(),
            ));
        }
        if request.currency.len() != 3 {
            return Err(AppError::Validation(
                "currency must be a 3-letter ISO 4217 code".to_string(),
            ));
        }
        if request.payer_id <= 0 || request.context_id <= 0 {
            return Err(AppError::Validation(
                "payer_id and context_id must be positive".to_string(),
            ));
        }

        let reference = generate_reference(
            &self.operator_tag,
            request.payer_id,
            request.context_id,
            Utc::now(),
        );

        let record = self
            .store
            .create(NewPayment {
                external_reference: reference.clone(),
                payer_id: request.payer_id,
                context_id: request.context_id,
                amount: request.amount,
                currency: request.currency.clone(),
                kind: request.kind,
                description: request.description.clone(),
            })
            .await?;

        info!(reference = %reference, amount = request.amount, currency = %request.currency, "payment created");

        match self.gateway.initiate(&record).await {
            Ok(initiated) => {
                let record = self
                    .store
                    .record_initiation(&reference, &initiated.payment_url, &initiated.payment_token)
                    .await?;
                self.queue.enqueue(&reference, self.first_check_delay).await?;

                get_metrics().record_payment_created(record.kind.as_str(), &record.currency);
                self.publish(EventType::PaymentCreated, &record).await;

                Ok(record)
            }
            Err(AppError::GatewayRejected(message)) => {
                warn!(reference = %reference, message = %message, "gateway rejected initiation");
                self.finalize(
                    &reference,
                    PaymentStatus::Failed,
                    StatusMetadata {
                        error_message: Some(message.clone()),
                        ..StatusMetadata::default()
                    },
                    ResolutionSource::Initiation,
                )
                .await?;
                Err(AppError::GatewayRejected(message))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_payment(&self, id: i64) -> Result<PaymentRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {id}")))
    }

    pub async fn get_by_reference(&self, reference: &str) -> Result<PaymentRecord> {
        self.store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {reference}")))
    }

    pub async fn list_by_payer(&self, payer_id: i64) -> Result<Vec<PaymentRecord>> {
        self.store.list_by_payer(payer_id).await
    }

    pub async fn statistics(&self) -> Result<PaymentStatistics> {
        let stats = self.store.statistics().await?;
        get_metrics().set_pending_payments(stats.pending);
        Ok(stats)
    }

    /// Verifies a reference against the gateway and applies the outcome.
    ///
    /// Both resolution paths funnel through here; `GatewayUnavailable`
    /// propagates so callers can reschedule instead of resolving.
    pub async fn reconcile(
        &self,
        reference: &str,
        source: ResolutionSource,
    ) -> Result<PaymentRecord> {
        // Cheap existence check before going to the network.
        self.get_by_reference(reference).await?;

        let verification = self.gateway.verify(reference).await?;
        self.apply_verification(reference, &verification, source).await
    }

    /// Applies one verification result to the ledger. Unresolved results
    /// are a no-op; terminal results also remove the queue entry and
    /// publish the status-changed event.
    pub async fn apply_verification(
        &self,
        reference: &str,
        verification: &VerificationResult,
        source: ResolutionSource,
    ) -> Result<PaymentRecord> {
        let Some(target) = verification.status.as_payment_status() else {
            return self.get_by_reference(reference).await;
        };

        let metadata = StatusMetadata {
            payment_method: verification.payment_method.clone(),
            operator_id: verification.operator_id.clone(),
            error_message: if target == PaymentStatus::Refused {
                verification
                    .message
                    .clone()
                    .or_else(|| Some("payment refused".to_string()))
            } else {
                None
            },
        };

        self.finalize(reference, target, metadata, source).await
    }

    /// Moves a payment to FAILED after its verification attempts ran out.
    /// This is the timeout policy that guarantees no payment stays
    /// PENDING forever.
    pub async fn fail_exhausted(&self, reference: &str) -> Result<PaymentRecord> {
        self.finalize(
            reference,
            PaymentStatus::Failed,
            StatusMetadata {
                error_message: Some("verification attempts exhausted".to_string()),
                ..StatusMetadata::default()
            },
            ResolutionSource::Worker,
        )
        .await
    }

    async fn finalize(
        &self,
        reference: &str,
        target: PaymentStatus,
        metadata: StatusMetadata,
        source: ResolutionSource,
    ) -> Result<PaymentRecord> {
        let outcome = self.store.apply_status(reference, target, metadata).await?;

        if outcome.applied {
            info!(
                reference = %reference,
                status = ?outcome.record.status,
                source = source.as_str(),
                "payment resolved"
            );
            get_metrics()
                .record_payment_resolved(outcome.record.status.as_str(), source.as_str());
        } else if outcome.record.status != target {
            get_metrics().record_duplicate_resolution();
        }

        // Terminal either way: make sure the queue entry is gone. remove()
        // is idempotent, so the losing path self-heals a stale entry.
        if outcome.record.status.is_final() {
            self.queue.remove(reference).await?;
        }
        if outcome.applied {
            self.publish_status_changed(&outcome.record).await;
        }

        Ok(outcome.record)
    }

    async fn publish_status_changed(&self, record: &PaymentRecord) {
        if let Some(event_type) = EventType::from_status(record.status) {
            self.publish(event_type, record).await;
        }
    }

    async fn publish(&self, event_type: EventType, record: &PaymentRecord) {
        let Some(events) = &self.events else {
            return;
        };

        let envelope = EventEnvelope::new(event_type, PaymentEvent::from_record(record));
        if let Err(e) = events
            .publish(Some(&record.external_reference), &envelope)
            .await
        {
            // One-way notification: a publish failure never affects the
            // transaction outcome.
            warn!(reference = %record.external_reference, error = %e, "failed to publish payment event");
        }
    }
}
