use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::{AppError, Result};

use super::{QueueEntry, ReconciliationQueue};

/// Redis-backed reconciliation queue.
///
/// Layout: one sorted set `{prefix}:pending` scored by next-check epoch
/// seconds, plus one hash `{prefix}:entry:{reference}` holding attempt
/// bookkeeping.
pub struct RedisReconciliationQueue {
    client: redis::Client,
    key_prefix: String,
    max_attempts: u32,
}

impl RedisReconciliationQueue {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            max_attempts,
        }
    }

    fn pending_key(&self) -> String {
        format!("{}:pending", self.key_prefix)
    }

    fn entry_key(&self, reference: &str) -> String {
        format!("{}:entry:{}", self.key_prefix, reference)
    }

    async fn conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(AppError::Redis)
    }
}

#[async_trait]
impl ReconciliationQueue for RedisReconciliationQueue {
    async fn enqueue(&self, reference: &str, first_check_delay: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let next_check = Utc::now() + chrono::Duration::seconds(first_check_delay.as_secs() as i64);

        let _: () = conn
            .zadd(self.pending_key(), reference, next_check.timestamp() as f64)
            .await
            .map_err(AppError::Redis)?;
        let _: () = conn
            .hset_multiple(
                self.entry_key(reference),
                &[("attempts", 0u32), ("max_attempts", self.max_attempts)],
            )
            .await
            .map_err(AppError::Redis)?;

        debug!(reference = %reference, "enqueued for reconciliation");
        Ok(())
    }

    async fn due_entries(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<QueueEntry>> {
        let mut conn = self.conn().await?;

        let references: Vec<String> = conn
            .zrangebyscore_limit(
                self.pending_key(),
                0f64,
                now.timestamp() as f64,
                0,
                limit as isize,
            )
            .await
            .map_err(AppError::Redis)?;

        let mut entries = Vec::with_capacity(references.len());
        for reference in references {
            let score: Option<f64> = conn
                .zscore(self.pending_key(), &reference)
                .await
                .map_err(AppError::Redis)?;
            let attempts: Option<u32> = conn
                .hget(self.entry_key(&reference), "attempts")
                .await
                .map_err(AppError::Redis)?;
            let max_attempts: Option<u32> = conn
                .hget(self.entry_key(&reference), "max_attempts")
                .await
                .map_err(AppError::Redis)?;

            let next_check_time = score
                .and_then(|s| DateTime::from_timestamp(s as i64, 0))
                .unwrap_or(now);

            entries.push(QueueEntry {
                external_reference: reference,
                next_check_time,
                attempts: attempts.unwrap_or(0),
                max_attempts: max_attempts.unwrap_or(self.max_attempts),
            });
        }

        Ok(entries)
    }

    async fn reschedule(
        &self,
        reference: &str,
        attempts: u32,
        next_check_time: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;

        let _: () = conn
            .zadd(self.pending_key(), reference, next_check_time.timestamp() as f64)
            .await
            .map_err(AppError::Redis)?;
        let _: () = conn
            .hset(self.entry_key(reference), "attempts", attempts)
            .await
            .map_err(AppError::Redis)?;

        Ok(())
    }

    async fn remove(&self, reference: &str) -> Result<()> {
        let mut conn = self.conn().await?;

        let _: () = conn
            .del(self.entry_key(reference))
            .await
            .map_err(AppError::Redis)?;
        let _: () = conn
            .zrem(self.pending_key(), reference)
            .await
            .map_err(AppError::Redis)?;

        debug!(reference = %reference, "removed from reconciliation queue");
        Ok(())
    }

    async fn contains(&self, reference: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let score: Option<f64> = conn
            .zscore(self.pending_key(), reference)
            .await
            .map_err(AppError::Redis)?;
        Ok(score.is_some())
    }
}
