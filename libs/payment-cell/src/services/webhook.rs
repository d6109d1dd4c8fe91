use std::fmt::Write as _;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::{PaymentError, WebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed event, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Checks a `stripe-signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw request body.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), PaymentError> {
    if secret.is_empty() {
        return Err(PaymentError::NotConfigured);
    }

    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".to_string()))?;

    if candidates.is_empty() {
        return Err(PaymentError::InvalidSignature("no v1 signature".to_string()));
    }

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance".to_string()));
    }

    let expected = sign(payload, timestamp, secret)?;

    let matched = candidates
        .iter()
        .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));

    if matched {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature("no matching signature".to_string()))
    }
}

/// Hex-encoded HMAC-SHA256 over `"{timestamp}.{payload}"`.
pub fn sign(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let hex = mac.finalize()
        .into_bytes()
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{:02x}", byte);
            hex
        });

    Ok(hex)
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
    serde_json::from_slice(payload).map_err(|e| PaymentError::MalformedEvent(e.to_string()))
}
