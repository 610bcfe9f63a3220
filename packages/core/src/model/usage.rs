use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-tier upload counter of one device.
///
/// Created on the first successful submission and never decremented, so
/// deleting an app does not give quota back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUsage {
    pub device_id: String,
    pub upload_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// What a device sees on its developer screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub upload_count: u64,
    pub is_subscribed: bool,
    pub free_limit: u32,
    pub can_upload: bool,
}
