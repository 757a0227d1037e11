use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::GatewaySettings;
use crate::error::{AppError, Result};
use crate::models::PaymentRecord;
use crate::observability::{get_metrics, LatencyTimer};

use super::types::{
    CheckData, CheckRequest, CheckoutData, CheckoutRequest, InitiatedPayment, VendorResponse,
    VerificationResult, VerifiedStatus,
};
use super::PaymentGateway;

/// Vendor code for a successfully created checkout.
const CODE_CHECKOUT_CREATED: &str = "201";
/// Vendor code for a successful status check.
const CODE_CHECK_OK: &str = "00";

/// HTTP client for the CinetPay gateway family.
pub struct CinetPayGateway {
    http: reqwest::Client,
    settings: GatewaySettings,
}

impl CinetPayGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, settings })
    }

    fn unavailable(e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::GatewayUnavailable("request timed out".to_string())
        } else {
            AppError::GatewayUnavailable(e.to_string())
        }
    }
}

#[async_trait]
impl PaymentGateway for CinetPayGateway {
    async fn initiate(&self, payment: &PaymentRecord) -> Result<InitiatedPayment> {
        let body = CheckoutRequest {
            apikey: self.settings.api_key.clone(),
            site_id: self.settings.site_id.clone(),
            transaction_id: payment.external_reference.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            description: payment
                .description
                .clone()
                .unwrap_or_else(|| format!("Payment {}", payment.external_reference)),
            notify_url: self.settings.notify_url.clone(),
            return_url: self.settings.return_url.clone(),
            channels: "ALL".to_string(),
            lang: "fr".to_string(),
            customer_name: format!("Payer {}", payment.payer_id),
            customer_email: format!("payer{}@invalid.local", payment.payer_id),
        };

        let timer = LatencyTimer::new();
        let response = self
            .http
            .post(&self.settings.api_url)
            .json(&body)
            .send()
            .await
            .map_err(Self::unavailable)?;

        let parsed: VendorResponse<CheckoutData> =
            response.json().await.map_err(Self::unavailable)?;
        get_metrics().record_gateway_call("initiate", timer.elapsed_ms(), parsed.code == CODE_CHECKOUT_CREATED);

        if parsed.code == CODE_CHECKOUT_CREATED {
            let data = parsed.data.ok_or_else(|| {
                AppError::GatewayUnavailable("checkout response missing payload".to_string())
            })?;
            debug!(reference = %payment.external_reference, "checkout created");
            Ok(InitiatedPayment {
                payment_url: data.payment_url,
                payment_token: data.payment_token,
            })
        } else {
            let message = parsed
                .message
                .unwrap_or_else(|| format!("vendor code {}", parsed.code));
            warn!(reference = %payment.external_reference, code = %parsed.code, "initiation rejected");
            Err(AppError::GatewayRejected(message))
        }
    }

    async fn verify(&self, external_reference: &str) -> Result<VerificationResult> {
        let body = CheckRequest {
            apikey: self.settings.api_key.clone(),
            site_id: self.settings.site_id.clone(),
            transaction_id: external_reference.to_string(),
        };

        let timer = LatencyTimer::new();
        let response = self
            .http
            .post(&self.settings.check_url)
            .json(&body)
            .send()
            .await
            .map_err(Self::unavailable)?;

        let parsed: VendorResponse<CheckData> = response.json().await.map_err(Self::unavailable)?;
        get_metrics().record_gateway_call("verify", timer.elapsed_ms(), parsed.code == CODE_CHECK_OK);

        if parsed.code != CODE_CHECK_OK {
            // The check endpoint erroring is not an outcome; the payment
            // stays unresolved until the gateway answers properly.
            debug!(
                reference = %external_reference,
                code = %parsed.code,
                "status check returned a vendor error, keeping payment pending"
            );
            return Ok(VerificationResult {
                message: parsed.message,
                ..VerificationResult::pending()
            });
        }

        let data = parsed.data.unwrap_or(CheckData {
            status: None,
            payment_method: None,
            operator_id: None,
        });

        let status = data
            .status
            .as_deref()
            .map(VerifiedStatus::from_vendor)
            .unwrap_or(VerifiedStatus::Pending);

        Ok(VerificationResult {
            status,
            payment_method: data.payment_method,
            operator_id: data.operator_id,
            message: parsed.message,
        })
    }
}
