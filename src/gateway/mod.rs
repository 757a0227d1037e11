pub mod cinetpay;
pub mod signature;
pub mod types;

pub use cinetpay::CinetPayGateway;
pub use signature::NotificationPayload;
pub use types::{InitiatedPayment, VerificationResult, VerifiedStatus};

use crate::error::Result;
use crate::models::PaymentRecord;
use async_trait::async_trait;

/// The only seam that speaks the external gateway's wire protocol.
///
/// Transport failures and timeouts surface as `GatewayUnavailable`;
/// callers treat that as "try again later", never as a payment failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a checkout on the gateway side and returns the URL the
    /// payer is redirected to. A non-success vendor code surfaces as
    /// `GatewayRejected` carrying the vendor message.
    async fn initiate(&self, payment: &PaymentRecord) -> Result<InitiatedPayment>;

    /// Server-to-server status check for one reference. Unknown vendor
    /// statuses map to "still pending", never to a terminal status.
    async fn verify(&self, external_reference: &str) -> Result<VerificationResult>;
}
