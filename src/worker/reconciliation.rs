use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::config::WorkerSettings;
use crate::error::{AppError, Result};
use crate::observability::get_metrics;
use crate::queue::{QueueEntry, ReconciliationQueue};
use crate::repositories::PaymentStore;
use crate::services::{PaymentService, ResolutionSource};

/// Configuration for the reconciliation worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often the loop wakes up (seconds).
    pub poll_interval_secs: u64,
    /// Maximum entries pulled per tick, so one tick cannot monopolize the
    /// gateway.
    pub batch_size: usize,
    /// Delay before re-checking a payment the gateway still reports
    /// pending (seconds).
    pub recheck_delay_secs: u64,
    /// Longer delay applied while the gateway is unreachable (seconds).
    pub unavailable_backoff_secs: u64,
    /// In-flight lease: how far forward a claimed entry is pushed so a
    /// concurrent worker does not re-claim it mid-verification (seconds).
    pub lease_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            batch_size: 10,
            recheck_delay_secs: 15,
            unavailable_backoff_secs: 60,
            lease_secs: 30,
        }
    }
}

impl From<&WorkerSettings> for WorkerConfig {
    fn from(settings: &WorkerSettings) -> Self {
        Self {
            poll_interval_secs: settings.poll_interval_secs,
            batch_size: settings.batch_size,
            recheck_delay_secs: settings.recheck_delay_secs,
            unavailable_backoff_secs: settings.unavailable_backoff_secs,
            lease_secs: settings.lease_secs,
        }
    }
}

/// Long-running loop that resolves payments the webhook never confirmed.
///
/// Each tick is a pure function of "what is due now": all retry state
/// (attempts, next check time) lives in the queue store, so the worker is
/// restart-safe and multiple instances can run concurrently — every
/// mutation it performs is idempotent.
pub struct ReconciliationWorker {
    service: Arc<PaymentService>,
    queue: Arc<dyn ReconciliationQueue>,
    store: Arc<dyn PaymentStore>,
    config: WorkerConfig,
}

impl ReconciliationWorker {
    pub fn new(
        service: Arc<PaymentService>,
        queue: Arc<dyn ReconciliationQueue>,
        store: Arc<dyn PaymentStore>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            service,
            queue,
            store,
            config,
        }
    }

    /// Runs until the shutdown signal flips. In-flight verification calls
    /// finish (or time out at the gateway client) before the loop exits.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            "reconciliation worker started"
        );

        let mut ticker = interval(Duration::from_secs(self.config.poll_interval_secs));

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("shutdown signal received, stopping reconciliation worker");
                    break;
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(processed) if processed > 0 => {
                            debug!(processed, "reconciliation tick complete");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "reconciliation tick failed"),
                    }
                }
            }
        }

        info!("reconciliation worker stopped");
    }

    /// Drains due entries once. Exposed separately from `run` so the
    /// scheduling and the reconciliation logic stay independently
    /// testable.
    pub async fn tick(&self) -> Result<usize> {
        let now = Utc::now();
        let due = self.queue.due_entries(now, self.config.batch_size).await?;

        let mut processed = 0;
        for entry in due {
            // Claim: push the entry forward before verifying so another
            // worker instance skips it while this one is in flight.
            self.queue
                .reschedule(
                    &entry.external_reference,
                    entry.attempts,
                    now + chrono::Duration::seconds(self.config.lease_secs as i64),
                )
                .await?;

            match self.process_entry(&entry).await {
                Ok(()) => processed += 1,
                Err(e) => {
                    error!(reference = %entry.external_reference, error = %e, "failed to process queue entry")
                }
            }
        }

        get_metrics().record_worker_cycle(processed as u64);
        Ok(processed)
    }

    async fn process_entry(&self, entry: &QueueEntry) -> Result<()> {
        let attempts = entry.attempts + 1;
        let reference = entry.external_reference.as_str();

        match self.service.reconcile(reference, ResolutionSource::Worker).await {
            Ok(record) if record.status.is_final() => {
                // Resolved; the service already removed the queue entry.
                Ok(())
            }
            Ok(_) => {
                if attempts >= entry.max_attempts {
                    warn!(reference = %reference, attempts, "verification attempts exhausted");
                    self.service.fail_exhausted(reference).await?;
                    Ok(())
                } else {
                    self.queue
                        .reschedule(
                            reference,
                            attempts,
                            Utc::now()
                                + chrono::Duration::seconds(self.config.recheck_delay_secs as i64),
                        )
                        .await
                }
            }
            Err(AppError::GatewayUnavailable(message)) => {
                warn!(reference = %reference, message = %message, "gateway unavailable, rescheduling");
                if attempts >= entry.max_attempts {
                    self.service.fail_exhausted(reference).await?;
                    Ok(())
                } else {
                    self.queue
                        .reschedule(
                            reference,
                            attempts,
                            Utc::now()
                                + chrono::Duration::seconds(
                                    self.config.unavailable_backoff_secs as i64,
                                ),
                        )
                        .await
                }
            }
            Err(AppError::NotFound(_)) => {
                // Orphan entry without a ledger row; drop it.
                warn!(reference = %reference, "queue entry has no ledger row, removing");
                self.queue.remove(reference).await
            }
            Err(e) => Err(e),
        }
    }

    /// Rebuilds the queue from the ledger: every PENDING row gets an
    /// entry with fresh attempt bookkeeping. Run at startup; the queue is
    /// advisory and this makes losing it harmless.
    pub async fn rebuild_queue(&self) -> Result<usize> {
        let references = self.store.pending_references().await?;
        let mut added = 0;

        for reference in references {
            if !self.queue.contains(&reference).await? {
                self.queue.enqueue(&reference, Duration::from_secs(0)).await?;
                added += 1;
            }
        }

        if added > 0 {
            info!(added, "rebuilt reconciliation queue entries from ledger");
        }
        Ok(added)
    }
}
