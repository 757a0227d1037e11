use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Form body of a gateway notification callback.
///
/// Only the transaction reference is required; gateways omit fields
/// freely, and absent fields canonicalize as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub cpm_trans_id: String,
    #[serde(default)]
    pub cpm_site_id: String,
    #[serde(default)]
    pub cpm_trans_date: String,
    #[serde(default)]
    pub cpm_amount: String,
    #[serde(default)]
    pub cpm_currency: String,
    #[serde(default)]
    pub cpm_payid: String,
    #[serde(default)]
    pub cpm_payment_date: String,
    #[serde(default)]
    pub cpm_payment_time: String,
    #[serde(default)]
    pub cpm_error_message: String,
    #[serde(default)]
    pub cpm_phone_prefixe: String,
    #[serde(default)]
    pub cpm_phone_number: String,
    #[serde(default)]
    pub cpm_language: String,
    #[serde(default)]
    pub cpm_version: String,
    #[serde(default)]
    pub cpm_reference: String,
    #[serde(default)]
    pub cpm_designation: String,
}

impl NotificationPayload {
    /// Canonical byte sequence the signature covers. Field order is fixed;
    /// changing it invalidates every signature in flight.
    pub fn canonical_message(&self) -> String {
        [
            self.cpm_site_id.as_str(),
            self.cpm_trans_id.as_str(),
            self.cpm_trans_date.as_str(),
            self.cpm_amount.as_str(),
            self.cpm_currency.as_str(),
            self.cpm_payid.as_str(),
            self.cpm_payment_date.as_str(),
            self.cpm_payment_time.as_str(),
            self.cpm_phone_prefixe.as_str(),
            self.cpm_phone_number.as_str(),
            self.cpm_language.as_str(),
            self.cpm_version.as_str(),
            self.cpm_reference.as_str(),
            self.cpm_designation.as_str(),
            self.cpm_error_message.as_str(),
        ]
        .concat()
    }
}

/// Computes the hex-encoded HMAC-SHA256 token for a payload.
pub fn compute_token(payload: &NotificationPayload, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.canonical_message().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a supplied signature header against the payload.
///
/// Comparison happens inside `verify_slice`, which is constant-time. Any
/// decoding failure counts as a mismatch.
pub fn verify_token(payload: &NotificationPayload, secret: &str, supplied: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload.canonical_message().as_bytes());

    let Ok(raw) = hex::decode(supplied.trim()) else {
        return false;
    };
    mac.verify_slice(&raw).is_ok()
}
