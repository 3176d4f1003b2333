//! Slack request signing
//!
//! Slack signs every request with `v0=hex(HMAC-SHA256(secret, "v0:{ts}:{body}"))`
//! in `X-Slack-Signature`, with the timestamp in `X-Slack-Request-Timestamp`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Requests older than this are treated as replays
const MAX_REQUEST_AGE_SECS: i64 = 300;

/// Checks a request signature against the signing secret
///
/// `now` is the current Unix time in seconds.
pub fn verify_slack_signature(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> bool {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return false;
    };

    let Ok(sent_at) = timestamp.parse::<i64>() else {
        return false;
    };
    if (now - sent_at).abs() > MAX_REQUEST_AGE_SECS {
        return false;
    }

    let Some(sig_hex) = signature.strip_prefix("v0=") else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);

    mac.verify_slice(&sig_bytes).is_ok()
}

/// Signature Slack would send for `body` at `timestamp`
#[cfg(test)]
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("v0:{}:", timestamp).as_bytes());
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}
