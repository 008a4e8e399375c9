use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("timestamp outside tolerance")]
    StaleTimestamp,
    #[error("signature mismatch")]
    SignatureMismatch,
}

/// Authenticates a raw webhook body before anything in it is trusted.
pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, signature: Option<&str>, payload: &[u8]) -> Result<(), WebhookError>;
}

/// Stripe's scheme: `t=<unix>,v1=<hex>` over `"<t>.<body>"`, HMAC-SHA256.
pub struct StripeVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl StripeVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    pub fn verify_at(&self, signature: Option<&str>, payload: &[u8], now: i64) -> Result<(), WebhookError> {
        let header = signature.ok_or(WebhookError::MissingSignature)?;

        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
                Some(("v1", v)) => candidates.push(v),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
        if candidates.is_empty() {
            return Err(WebhookError::MalformedHeader);
        }
        let skew = now
            .checked_sub(timestamp)
            .map(i64::unsigned_abs)
            .ok_or(WebhookError::StaleTimestamp)?;
        if skew > self.tolerance_secs.unsigned_abs() {
            return Err(WebhookError::StaleTimestamp);
        }

        let mac = self.mac(timestamp, payload);
        let matched = candidates
            .into_iter()
            .filter_map(|c| hex::decode(c).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());
        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }

    /// Header value for a payload, as the processor would send it.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let mac = self.mac(timestamp, payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self, timestamp: i64, payload: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }
}

impl WebhookVerifier for StripeVerifier {
    fn verify(&self, signature: Option<&str>, payload: &[u8]) -> Result<(), WebhookError> {
        self.verify_at(signature, payload, OffsetDateTime::now_utc().unix_timestamp())
    }
}

#[derive(Debug, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl Event {
    /// Customer email of a completed checkout, if the event carries one.
    pub fn customer_email(&self) -> Option<&str> {
        let obj = &self.data.object;
        obj.pointer("/customer_details/email")
            .and_then(|v| v.as_str())
            .or_else(|| obj.get("customer_email").and_then(|v| v.as_str()))
            .filter(|e| !e.trim().is_empty())
    }
}
