pub mod payment_repository;

pub use payment_repository::PaymentRepository;

use crate::error::Result;
use crate::models::{
    NewPayment, PaymentRecord, PaymentStatistics, PaymentStatus, StatusMetadata, StatusTransition,
};
use async_trait::async_trait;

/// Contract of the transaction ledger.
///
/// The ledger is the single source of truth; the reconciliation queue only
/// holds references into it. `apply_status` is the sole mutator after
/// creation and must be an atomic read-modify-write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Inserts a new PENDING row. A colliding external reference maps to
    /// `DuplicateReference`.
    async fn create(&self, new_payment: NewPayment) -> Result<PaymentRecord>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PaymentRecord>>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentRecord>>;

    /// All payments of one payer, newest first.
    async fn list_by_payer(&self, payer_id: i64) -> Result<Vec<PaymentRecord>>;

    /// Applies a status transition if it is legal, as a single conditional
    /// update. An illegal transition is a no-op that returns the unchanged
    /// row with `applied = false` — never an error.
    async fn apply_status(
        &self,
        reference: &str,
        new_status: PaymentStatus,
        metadata: StatusMetadata,
    ) -> Result<StatusTransition>;

    /// Records the checkout URL and token returned by gateway initiation.
    async fn record_initiation(
        &self,
        reference: &str,
        payment_url: &str,
        payment_token: &str,
    ) -> Result<PaymentRecord>;

    /// References of all PENDING rows, for queue recovery.
    async fn pending_references(&self) -> Result<Vec<String>>;

    async fn count_by_status(&self, status: PaymentStatus) -> Result<i64>;

    async fn statistics(&self) -> Result<PaymentStatistics>;
}
