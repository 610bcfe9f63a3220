use chrono::{DateTime, Utc};

use crate::{
    config::PolicyConfig,
    model::{DeviceUsage, SubscriptionRecord},
};

/// Outcome of the upload admission check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// No device id was supplied; anonymous submissions are never limited.
    Anonymous,
    /// The device has a subscription whose period has not ended.
    Subscribed,
    /// The device is below its free upload limit.
    FreeTier { used: u64, limit: u32 },
    /// The free uploads are used up and no subscription is active.
    SubscriptionRequired { used: u64, limit: u32 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::SubscriptionRequired { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdmissionPolicy {
    pub free_upload_limit: u32,
}

impl AdmissionPolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            free_upload_limit: config.free_upload_limit,
        }
    }

    /// Decide whether `device_id` may create another app record.
    ///
    /// `subscription` and `usage` must be the records stored for that device.
    pub fn evaluate(
        &self,
        device_id: Option<&str>,
        subscription: Option<&SubscriptionRecord>,
        usage: Option<&DeviceUsage>,
        now: DateTime<Utc>,
    ) -> Admission {
        if device_id.is_none_or(str::is_empty) {
            return Admission::Anonymous;
        }

        if subscription.is_some_and(|s| s.is_active(now)) {
            return Admission::Subscribed;
        }

        let used = usage.map(|u| u.upload_count).unwrap_or(0);
        let limit = self.free_upload_limit;

        if used < u64::from(limit) {
            Admission::FreeTier { used, limit }
        } else {
            Admission::SubscriptionRequired { used, limit }
        }
    }
}
