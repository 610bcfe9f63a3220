//! Authenticated subscription lifecycle events.
//!
//! The signature header looks like `t=1700000000,v1=<hex>,v1=<hex>`. Each
//! `v1` is an HMAC-SHA256 over `"{t}.{raw body}"` keyed with the shared
//! webhook secret. Any matching `v1` authenticates the request.

use std::sync::Arc;

use antimatter_types::utils::from_unix_seconds;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    clock::Clock,
    config::WebhookConfig,
    store::{Store, StoreError},
};

type HmacSha256 = Hmac<Sha256>;

pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("Invalid event payload: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WebhookError {
    /// Failures that mean the sender could not be authenticated.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::MissingSignature | Self::InvalidSignature | Self::StaleTimestamp
        )
    }
}

/// Check `header` against `payload` signed with `secret`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if candidates.is_empty() {
        return Err(WebhookError::InvalidSignature);
    }

    let signed_at = timestamp
        .parse::<i64>()
        .ok()
        .and_then(from_unix_seconds)
        .ok_or(WebhookError::InvalidSignature)?;

    let authentic = candidates.iter().any(|candidate| {
        let (Ok(expected), Some(mac)) = (hex::decode(candidate), signed_mac(secret, timestamp, payload))
        else {
            return false;
        };
        mac.verify_slice(&expected).is_ok()
    });
    if !authentic {
        return Err(WebhookError::InvalidSignature);
    }

    if (now - signed_at).abs() > tolerance {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

/// Build a signature header the way the provider does. Used by tests and local
/// tooling to replay events.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Option<String> {
    let mac = signed_mac(secret, &timestamp.to_string(), payload)?;
    Some(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Option<EventData>,
}

#[derive(Debug, Deserialize)]
struct EventData {
    #[serde(default)]
    object: Option<SubscriptionObject>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionObject {
    #[serde(default)]
    customer: Option<CustomerRef>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    current_period_end: Option<i64>,
}

/// Expanded and unexpanded customers both appear in the wild.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CustomerRef {
    Id(String),
    Object { id: String },
}

impl CustomerRef {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Object { id } => id,
        }
    }
}

/// What a delivered event did to local state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Period end overwritten on every record linked to the customer.
    Updated {
        customer_id: String,
        records: u64,
    },
    /// Authenticated but nothing to do.
    Ignored { reason: &'static str },
}

/// Applies subscription lifecycle events to the local subscription records.
#[derive(Debug, Clone)]
pub struct WebhookReconciler {
    store: Arc<dyn Store>,
    config: WebhookConfig,
    clock: Arc<dyn Clock>,
}

impl WebhookReconciler {
    pub fn new(store: Arc<dyn Store>, config: WebhookConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Authenticate and apply one delivery.
    ///
    /// Nothing is read or written before the signature checks out. Replaying a
    /// delivery rewrites the same values.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        let now = self.clock.now();
        verify_signature(
            payload,
            signature,
            &self.config.secret,
            now,
            self.config.tolerance,
        )?;

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;

        let Some(subscription) = event.data.and_then(|d| d.object) else {
            return Ok(ReconcileOutcome::Ignored {
                reason: "no subscription object",
            });
        };
        let Some(customer_id) = subscription.customer.map(CustomerRef::into_id) else {
            return Ok(ReconcileOutcome::Ignored {
                reason: "no customer",
            });
        };
        let period_end = subscription.current_period_end.and_then(from_unix_seconds);

        let period_end = match event.event_type.as_str() {
            SUBSCRIPTION_UPDATED => {
                if subscription.status.as_deref() != Some("active") {
                    return Ok(ReconcileOutcome::Ignored {
                        reason: "subscription not active",
                    });
                }
                period_end
            }
            SUBSCRIPTION_DELETED => period_end,
            _ => {
                return Ok(ReconcileOutcome::Ignored {
                    reason: "unhandled event type",
                });
            }
        };
        let Some(period_end) = period_end else {
            return Ok(ReconcileOutcome::Ignored {
                reason: "no period end",
            });
        };

        let records = self
            .store
            .update_period_end_for_customer(&customer_id, period_end, now)
            .await?;

        tracing::info!(
            event_type = %event.event_type,
            customer_id = %customer_id,
            current_period_end = %period_end,
            records,
            "Subscription reconciled from webhook"
        );

        Ok(ReconcileOutcome::Updated {
            customer_id,
            records,
        })
    }
}
