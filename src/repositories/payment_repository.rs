use crate::error::{AppError, Result};
use crate::models::{
    NewPayment, PaymentRecord, PaymentStateMachine, PaymentStatistics, PaymentStatus,
    StatusMetadata, StatusTransition,
};
use async_trait::async_trait;
use sqlx::PgPool;

const PAYMENT_COLUMNS: &str = "id, external_reference, payer_id, context_id, amount, currency, kind, status, description, payment_url, payment_token, payment_method, operator_id, error_message, settled_at, created_at, updated_at";

/// Postgres-backed transaction ledger.
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl crate::repositories::PaymentStore for PaymentRepository {
    async fn create(&self, new_payment: NewPayment) -> Result<PaymentRecord> {
        let query = format!(
            r#"
            INSERT INTO payments (external_reference, payer_id, context_id, amount, currency, kind, status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(&new_payment.external_reference)
            .bind(new_payment.payer_id)
            .bind(new_payment.context_id)
            .bind(new_payment.amount)
            .bind(&new_payment.currency)
            .bind(new_payment.kind)
            .bind(PaymentStatus::Pending)
            .bind(&new_payment.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::DuplicateReference(new_payment.external_reference.clone())
                }
                _ => AppError::Database(e),
            })?;

        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PaymentRecord>> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");

        let row = sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>> {
        let query = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_reference = $1");

        let row = sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row)
    }

    async fn list_by_payer(&self, payer_id: i64) -> Result<Vec<PaymentRecord>> {
        let query = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE payer_id = $1 ORDER BY created_at DESC"
        );

        let rows = sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(payer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(rows)
    }

    async fn apply_status(
        &self,
        reference: &str,
        new_status: PaymentStatus,
        metadata: StatusMetadata,
    ) -> Result<StatusTransition> {
        // The WHERE clause is the atomicity guarantee: two concurrent
        // callers both seeing PENDING cannot both win the update.
        let query = format!(
            r#"
            UPDATE payments
            SET status = $2,
                payment_method = COALESCE($3, payment_method),
                operator_id = COALESCE($4, operator_id),
                error_message = COALESCE($5, error_message),
                settled_at = CASE WHEN $2 = 'ACCEPTED'::payment_status THEN COALESCE(settled_at, now()) ELSE settled_at END,
                updated_at = now()
            WHERE external_reference = $1 AND status = 'PENDING'
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let current = self
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {reference}")))?;

        if !PaymentStateMachine::can_transition(current.status, new_status) {
            if current.status.is_final() && new_status != current.status {
                tracing::info!(
                    reference = %reference,
                    current = ?current.status,
                    attempted = ?new_status,
                    "duplicate resolution ignored"
                );
            }
            return Ok(StatusTransition {
                record: current,
                applied: false,
            });
        }

        let updated = sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(reference)
            .bind(new_status)
            .bind(&metadata.payment_method)
            .bind(&metadata.operator_id)
            .bind(&metadata.error_message)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        match updated {
            Some(record) => Ok(StatusTransition {
                record,
                applied: true,
            }),
            // Lost the race against a concurrent resolver; return whatever
            // state won.
            None => {
                let record = self
                    .find_by_reference(reference)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("payment {reference}")))?;
                Ok(StatusTransition {
                    record,
                    applied: false,
                })
            }
        }
    }

    async fn record_initiation(
        &self,
        reference: &str,
        payment_url: &str,
        payment_token: &str,
    ) -> Result<PaymentRecord> {
        let query = format!(
            r#"
            UPDATE payments
            SET payment_url = $2, payment_token = $3, updated_at = now()
            WHERE external_reference = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, PaymentRecord>(&query)
            .bind(reference)
            .bind(payment_url)
            .bind(payment_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        row.ok_or_else(|| AppError::NotFound(format!("payment {reference}")))
    }

    async fn pending_references(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT external_reference
            FROM payments
            WHERE status = 'PENDING'
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(|(reference,)| reference).collect())
    }

    async fn count_by_status(&self, status: PaymentStatus) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM payments WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(row.0)
    }

    async fn statistics(&self) -> Result<PaymentStatistics> {
        let stats = sqlx::query_as::<_, PaymentStatistics>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'PENDING') AS pending,
                   COUNT(*) FILTER (WHERE status = 'ACCEPTED') AS accepted,
                   COUNT(*) FILTER (WHERE status = 'REFUSED') AS refused,
                   COUNT(*) FILTER (WHERE status = 'FAILED') AS failed,
                   COALESCE(SUM(amount) FILTER (WHERE status = 'ACCEPTED'), 0)::BIGINT AS accepted_amount
            FROM payments
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(stats)
    }
}
