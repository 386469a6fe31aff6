//! Webhook signature verification and event decoding.
//!
//! Deliveries carry a `t=<unix>,v1=<hex>` header. The signature is
//! HMAC-SHA256 over `"{t}.{raw body}"` keyed with the endpoint secret.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use mercato_core::{PaymentEvent, ProviderError, WebhookEvent};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Parsed `t=..,v1=..` header. Several `v1` entries may be present while a
/// secret is being rolled.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<SignatureHeader, ProviderError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(invalid("missing v1 signature"));
    }
    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn invalid(reason: &str) -> ProviderError {
    ProviderError::InvalidSignature(reason.to_string())
}

/// Compute the hex signature for a payload, e.g. to sign test deliveries.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, ProviderError> {
    mac(secret, timestamp, payload).map(hex::encode)
}

fn mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, ProviderError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| invalid("unusable webhook secret"))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check a delivery's signature header against the secret.
///
/// `now` and `tolerance_secs` bound how old (or how far in the future) the
/// signed timestamp may be.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), ProviderError> {
    let header = parse_header(header)?;
    let skew = now.checked_sub(header.timestamp).map(i64::unsigned_abs);
    if !skew.is_some_and(|skew| skew <= tolerance_secs.unsigned_abs()) {
        return Err(invalid("timestamp outside the tolerance window"));
    }
    let expected = mac(secret, header.timestamp, payload)?;
    let matched = header
        .signatures
        .iter()
        .any(|candidate| bool::from(candidate.as_slice().ct_eq(expected.as_slice())));
    if matched {
        Ok(())
    } else {
        Err(invalid("signature mismatch"))
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawCustomerRef {
    customer: String,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    id: String,
    #[serde(default)]
    payouts_enabled: bool,
}

/// Decode a verified payload into the events the marketplace handles.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, ProviderError> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| ProviderError::InvalidResponse(format!("webhook payload: {e}")))?;
    let object = raw.data.object;
    let decode = |what: &str| {
        let what = what.to_string();
        move |e: serde_json::Error| ProviderError::InvalidResponse(format!("{what}: {e}"))
    };

    let event = match raw.event_type.as_str() {
        "checkout.session.completed" => {
            let session: RawCheckoutSession =
                serde_json::from_value(object).map_err(decode("checkout session"))?;
            PaymentEvent::CheckoutCompleted {
                session_id: session.id,
                customer_id: session.customer,
                amount_total: session.amount_total,
                currency: session.currency,
                metadata: session.metadata,
            }
        }
        "customer.subscription.deleted" => {
            let sub: RawCustomerRef =
                serde_json::from_value(object).map_err(decode("subscription"))?;
            PaymentEvent::SubscriptionDeleted {
                customer_id: sub.customer,
            }
        }
        "invoice.payment_failed" => {
            let invoice: RawCustomerRef =
                serde_json::from_value(object).map_err(decode("invoice"))?;
            PaymentEvent::InvoicePaymentFailed {
                customer_id: invoice.customer,
            }
        }
        "account.updated" => {
            let account: RawAccount = serde_json::from_value(object).map_err(decode("account"))?;
            PaymentEvent::AccountUpdated {
                account_id: account.id,
                payouts_enabled: account.payouts_enabled,
            }
        }
        other => PaymentEvent::Other {
            event_type: other.to_string(),
        },
    };

    Ok(WebhookEvent { id: raw.id, event })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    fn header_for(payload: &[u8], timestamp: i64) -> String {
        format!("t={timestamp},v1={}", sign(SECRET, timestamp, payload).unwrap())
    }

    #[test]
    fn test_valid_signature_passes() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = header_for(payload, NOW);
        assert!(verify_signature(SECRET, payload, &header, NOW + 10, 300).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let header = header_for(br#"{"id":"evt_1"}"#, NOW);
        let err = verify_signature(SECRET, br#"{"id":"evt_2"}"#, &header, NOW, 300).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSignature(_)));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = b"{}";
        let header = header_for(payload, NOW);
        assert!(verify_signature("whsec_other", payload, &header, NOW, 300).is_err());
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let payload = b"{}";
        let header = header_for(payload, NOW - 301);
        assert!(verify_signature(SECRET, payload, &header, NOW, 300).is_err());
    }

    #[test]
    fn test_extreme_timestamps_are_rejected() {
        let payload = b"{}";
        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={timestamp},v1={}", "00".repeat(32));
            let err = verify_signature(SECRET, payload, &header, NOW, 300).unwrap_err();
            assert!(matches!(err, ProviderError::InvalidSignature(_)));
        }
        let err = verify_signature(SECRET, payload, "t=-9223372036854775808,v1=00", NOW, 300)
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSignature(_)));
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let payload = b"{}";
        let header = format!(
            "t={NOW},v1={},v1={}",
            "00".repeat(32),
            sign(SECRET, NOW, payload).unwrap()
        );
        assert!(verify_signature(SECRET, payload, &header, NOW, 300).is_ok());
    }

    #[test]
    fn test_malformed_headers_are_rejected() {
        assert!(parse_header("").is_err());
        assert!(parse_header("t=abc,v1=00").is_err());
        assert!(parse_header(&format!("t={NOW}")).is_err());
        assert!(parse_header(&format!("t={NOW},v1=zz")).is_err());
    }

    #[test]
    fn test_parse_checkout_completed() {
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_123",
                "customer": "cus_9",
                "amount_total": 25_000,
                "currency": "eur",
                "metadata": {"kind": "mission", "mission_id": "7"}
            }}
        });
        let event = parse_event(payload.to_string().as_bytes()).unwrap();
        assert_eq!(event.id, "evt_1");
        match event.event {
            PaymentEvent::CheckoutCompleted {
                session_id,
                customer_id,
                amount_total,
                metadata,
                ..
            } => {
                assert_eq!(session_id, "cs_123");
                assert_eq!(customer_id.as_deref(), Some("cus_9"));
                assert_eq!(amount_total, Some(25_000));
                assert_eq!(metadata.get("mission_id").map(String::as_str), Some("7"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_subscription_and_account_events() {
        let deleted = json!({
            "id": "evt_2",
            "type": "customer.subscription.deleted",
            "data": {"object": {"id": "sub_1", "customer": "cus_9"}}
        });
        assert_eq!(
            parse_event(deleted.to_string().as_bytes()).unwrap().event,
            PaymentEvent::SubscriptionDeleted {
                customer_id: "cus_9".to_string()
            }
        );

        let account = json!({
            "id": "evt_3",
            "type": "account.updated",
            "data": {"object": {"id": "acct_1", "payouts_enabled": true}}
        });
        assert_eq!(
            parse_event(account.to_string().as_bytes()).unwrap().event,
            PaymentEvent::AccountUpdated {
                account_id: "acct_1".to_string(),
                payouts_enabled: true
            }
        );
    }

    #[test]
    fn test_unknown_types_are_passed_through() {
        let payload = json!({
            "id": "evt_4",
            "type": "charge.refunded",
            "data": {"object": {}}
        });
        assert_eq!(
            parse_event(payload.to_string().as_bytes()).unwrap().event,
            PaymentEvent::Other {
                event_type: "charge.refunded".to_string()
            }
        );
    }

    #[test]
    fn test_garbage_payload_is_invalid_response() {
        assert!(matches!(
            parse_event(b"not json"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
