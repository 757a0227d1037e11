pub mod redis_queue;

pub use redis_queue::RedisReconciliationQueue;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// One pending payment awaiting verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub external_reference: String,
    pub next_check_time: DateTime<Utc>,
    pub attempts: u32,
    pub max_attempts: u32,
}

/// Durable, time-ordered set of pending payment references.
///
/// The queue is advisory and disposable: losing it entirely is recovered
/// by re-enqueueing every PENDING ledger row. Entries are independent —
/// no cross-entry coordination is ever required.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReconciliationQueue: Send + Sync {
    /// Registers a reference for verification, first due after the given
    /// delay. Resets attempt bookkeeping if the entry already exists.
    async fn enqueue(&self, reference: &str, first_check_delay: Duration) -> Result<()>;

    /// Entries whose next-check time has passed, oldest first, bounded by
    /// `limit` so one worker tick cannot monopolize the gateway.
    async fn due_entries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueEntry>>;

    /// Updates an entry in place. Also used as the claim lease: a worker
    /// pushes the entry forward before verifying so a concurrent worker
    /// does not re-claim it mid-flight.
    async fn reschedule(
        &self,
        reference: &str,
        attempts: u32,
        next_check_time: DateTime<Utc>,
    ) -> Result<()>;

    /// Drops an entry; called once the payment reaches a terminal status.
    async fn remove(&self, reference: &str) -> Result<()>;

    async fn contains(&self, reference: &str) -> Result<bool>;
}
