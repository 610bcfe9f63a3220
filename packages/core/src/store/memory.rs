use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{Store, StoreError};
use crate::model::{AppQuery, AppRecord, DeviceUsage, PushToken, SubscriptionRecord};

#[derive(Debug, Default)]
struct Tables {
    apps: HashMap<String, AppRecord>,
    usage: HashMap<String, DeviceUsage>,
    subscriptions: HashMap<String, SubscriptionRecord>,
    push_tokens: HashMap<String, PushToken>,
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscription_count(&self) -> usize {
        self.tables.read().subscriptions.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert_app(&self, app: AppRecord) -> Result<AppRecord, StoreError> {
        let mut tables = self.tables.write();
        if tables.apps.contains_key(&app.id) {
            return Err(StoreError::Database(format!("duplicate app id {}", app.id)));
        }
        tables.apps.insert(app.id.clone(), app.clone());
        Ok(app)
    }

    async fn get_app(&self, id: &str) -> Result<Option<AppRecord>, StoreError> {
        Ok(self.tables.read().apps.get(id).cloned())
    }

    async fn list_apps(&self, query: &AppQuery) -> Result<Vec<AppRecord>, StoreError> {
        let tables = self.tables.read();
        let mut apps: Vec<AppRecord> = tables
            .apps
            .values()
            .filter(|app| query.matches(app))
            .cloned()
            .collect();
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        apps.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));
        Ok(apps)
    }

    async fn delete_app(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.tables.write().apps.remove(id).is_some())
    }

    async fn get_usage(&self, device_id: &str) -> Result<Option<DeviceUsage>, StoreError> {
        Ok(self.tables.read().usage.get(device_id).cloned())
    }

    async fn increment_usage(
        &self,
        device_id: &str,
        at: DateTime<Utc>,
    ) -> Result<DeviceUsage, StoreError> {
        let mut tables = self.tables.write();
        let entry = tables
            .usage
            .entry(device_id.to_string())
            .or_insert_with(|| DeviceUsage {
                device_id: device_id.to_string(),
                upload_count: 0,
                updated_at: at,
            });
        entry.upload_count += 1;
        entry.updated_at = at;
        Ok(entry.clone())
    }

    async fn get_subscription(
        &self,
        device_id: &str,
    ) -> Result<Option<SubscriptionRecord>, StoreError> {
        Ok(self.tables.read().subscriptions.get(device_id).cloned())
    }

    async fn upsert_subscription(&self, record: SubscriptionRecord) -> Result<(), StoreError> {
        self.tables
            .write()
            .subscriptions
            .insert(record.device_id.clone(), record);
        Ok(())
    }

    async fn update_period_end_for_customer(
        &self,
        external_customer_id: &str,
        current_period_end: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let mut touched = 0;
        for record in tables
            .subscriptions
            .values_mut()
            .filter(|r| r.external_customer_id == external_customer_id)
        {
            record.current_period_end = Some(current_period_end);
            record.updated_at = at;
            touched += 1;
        }
        Ok(touched)
    }

    async fn upsert_push_token(
        &self,
        token: &str,
        enabled: bool,
        _at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.tables.write().push_tokens.insert(
            token.to_string(),
            PushToken {
                token: token.to_string(),
                enabled,
            },
        );
        Ok(())
    }

    async fn enabled_push_tokens(&self) -> Result<Vec<String>, StoreError> {
        let mut tokens: Vec<String> = self
            .tables
            .read()
            .push_tokens
            .values()
            .filter(|t| t.enabled)
            .map(|t| t.token.clone())
            .collect();
        tokens.sort();
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppFilter, AppStatus, Category, DeviceTarget};
    use chrono::Duration;

    fn app(id: &str, status: AppStatus, created_at: DateTime<Utc>, device: Option<&str>) -> AppRecord {
        AppRecord {
            id: id.into(),
            name: format!("App {id}"),
            description: String::new(),
            developer_name: "Dev".into(),
            version: "1.0".into(),
            category: Category::Utilities,
            ipa_path: format!("{id}.ipa"),
            device: DeviceTarget::Both,
            icon_path: None,
            social_twitter: None,
            social_website: None,
            app_store_link: None,
            status,
            created_at,
            uploaded_by_device_id: device.map(Into::into),
        }
    }

    #[tokio::test]
    async fn listing_filters_and_orders_newest_first() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_app(app("a", AppStatus::Approved, now - Duration::hours(3), None)).await.unwrap();
        store.insert_app(app("b", AppStatus::Pending, now - Duration::hours(1), Some("dev-1"))).await.unwrap();
        store.insert_app(app("c", AppStatus::Pending, now - Duration::hours(2), Some("dev-2"))).await.unwrap();

        let all = store
            .list_apps(&AppQuery::new(None, None, None).unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let approved = store
            .list_apps(&AppQuery::new(Some("approved"), None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(approved.len(), 1);

        let mine = store
            .list_apps(&AppQuery {
                filter: AppFilter::UploadedBy("dev-2".into()),
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "c");

        let limited = store
            .list_apps(&AppQuery::new(None, None, Some(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn increments_create_the_ledger_lazily() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        assert!(store.get_usage("dev-1").await.unwrap().is_none());

        store.increment_usage("dev-1", now).await.unwrap();
        let usage = store.increment_usage("dev-1", now).await.unwrap();
        assert_eq!(usage.upload_count, 2);
    }

    #[tokio::test]
    async fn customer_updates_touch_every_linked_device() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for device in ["dev-1", "dev-2"] {
            store
                .upsert_subscription(SubscriptionRecord {
                    device_id: device.into(),
                    external_customer_id: "cus_1".into(),
                    current_period_end: None,
                    updated_at: now,
                })
                .await
                .unwrap();
        }

        let end = now + Duration::days(30);
        assert_eq!(store.update_period_end_for_customer("cus_1", end, now).await.unwrap(), 2);
        assert_eq!(store.update_period_end_for_customer("cus_x", end, now).await.unwrap(), 0);
        assert_eq!(
            store.get_subscription("dev-2").await.unwrap().unwrap().current_period_end,
            Some(end)
        );
    }

    #[tokio::test]
    async fn only_enabled_push_tokens_are_listed() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.upsert_push_token("tok-a", true, now).await.unwrap();
        store.upsert_push_token("tok-b", true, now).await.unwrap();
        store.upsert_push_token("tok-b", false, now).await.unwrap();
        assert_eq!(store.enabled_push_tokens().await.unwrap(), vec!["tok-a".to_string()]);
    }
}
