use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paid subscription state of one device, mirrored from the payment provider.
///
/// Records are never deleted; an expired one simply stops counting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub device_id: String,
    /// Provider customer id. Webhook events are joined on this, never on the device.
    pub external_customer_id: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.current_period_end.is_some_and(|end| end > now)
    }
}
