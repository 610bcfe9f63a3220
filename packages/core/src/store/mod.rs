//! Persistence seam for app records, the device usage ledger, subscription
//! records and push tokens.
//!
//! | Backend | Where |
//! |---------|-------|
//! | Postgres (SeaORM) | `antimatter-api`, production |
//! | [`InMemoryStore`] | this crate, local runs and tests |

mod memory;

pub use memory::InMemoryStore;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{AppQuery, AppRecord, DeviceUsage, SubscriptionRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait Store: Send + Sync + Debug {
    /// Get backend name for logging
    fn backend_name(&self) -> &'static str;

    // ========================================================================
    // App records
    // ========================================================================

    async fn insert_app(&self, app: AppRecord) -> Result<AppRecord, StoreError>;

    async fn get_app(&self, id: &str) -> Result<Option<AppRecord>, StoreError>;

    /// Newest first, at most `query.limit` records.
    async fn list_apps(&self, query: &AppQuery) -> Result<Vec<AppRecord>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete_app(&self, id: &str) -> Result<bool, StoreError>;

    // ========================================================================
    // Device usage ledger
    // ========================================================================

    async fn get_usage(&self, device_id: &str) -> Result<Option<DeviceUsage>, StoreError>;

    /// Add one upload to the device, creating its ledger entry if needed.
    async fn increment_usage(
        &self,
        device_id: &str,
        at: DateTime<Utc>,
    ) -> Result<DeviceUsage, StoreError>;

    // ========================================================================
    // Subscription records
    // ========================================================================

    async fn get_subscription(
        &self,
        device_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError>;

    /// Insert or replace the record keyed by `record.device_id`.
    async fn upsert_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError>;

    /// Overwrite the period end of every record linked to the customer.
    /// Returns the number of records touched; zero is not an error.
    async fn update_period_end_for_customer(
        &self,
        external_customer_id: &str,
        current_period_end: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    // ========================================================================
    // Push tokens
    // ========================================================================

    async fn upsert_push_token(
        &self,
        token: &str,
        enabled: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn enabled_push_tokens(&self) -> Result<Vec<String>, StoreError>;
}
