//! App submission, listing and deletion on top of the [`Store`].

use std::sync::Arc;

use crate::{
    clock::Clock,
    config::PolicyConfig,
    model::{AppQuery, AppRecord, NewApp, UsageSummary},
    notify::DynNotifier,
    policy::{Admission, AdmissionPolicy, Availability, ReviewGate},
    store::{Store, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Subscription required: {used} of {limit} free uploads used")]
    SubscriptionRequired { used: u64, limit: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("App not found")]
    NotFound,
    #[error("Only the developer who uploaded this app can delete it")]
    NotOwner,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct SubmissionService {
    store: Arc<dyn Store>,
    notifier: DynNotifier,
    clock: Arc<dyn Clock>,
    admission: AdmissionPolicy,
    review: ReviewGate,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: DynNotifier,
        clock: Arc<dyn Clock>,
        config: &PolicyConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            admission: AdmissionPolicy::new(config),
            review: ReviewGate::new(config),
        }
    }

    pub fn free_upload_limit(&self) -> u32 {
        self.admission.free_upload_limit
    }

    /// Fetch the device's subscription and usage and run the admission policy.
    pub async fn admission(&self, device_id: Option<&str>) -> Result<Admission, StoreError> {
        let now = self.clock.now();
        let Some(device_id) = device_id.filter(|d| !d.is_empty()) else {
            return Ok(self.admission.evaluate(None, None, None, now));
        };

        let subscription = self.store.get_subscription(device_id).await?;
        let usage = self.store.get_usage(device_id).await?;

        Ok(self
            .admission
            .evaluate(Some(device_id), subscription.as_ref(), usage.as_ref(), now))
    }

    /// Admit and create a new app record.
    ///
    /// Check and insert are not atomic: two concurrent submissions from the
    /// same device can both pass at `limit - 1`. The ledger increment and the
    /// notifications run after the record exists and cannot fail the call.
    pub async fn submit(&self, app: NewApp) -> Result<AppRecord, SubmissionError> {
        let admission = self.admission(app.device_id.as_deref()).await?;
        if let Admission::SubscriptionRequired { used, limit } = admission {
            tracing::info!(
                device_id = ?app.device_id,
                used,
                limit,
                "Submission rejected, free uploads used up"
            );
            return Err(SubmissionError::SubscriptionRequired { used, limit });
        }

        let record = app.into_record(antimatter_types::create_id(), self.clock.now());
        let record = self.store.insert_app(record).await?;

        tracing::info!(
            app_id = %record.id,
            device_id = ?record.uploaded_by_device_id,
            admission = ?admission,
            "App submitted for review"
        );

        if let Some(device_id) = &record.uploaded_by_device_id {
            match self.store.increment_usage(device_id, self.clock.now()).await {
                Ok(usage) => tracing::debug!(
                    device_id = %device_id,
                    upload_count = usage.upload_count,
                    "Upload counted"
                ),
                Err(e) => tracing::error!(
                    device_id = %device_id,
                    app_id = %record.id,
                    error = %e,
                    "Failed to count upload"
                ),
            }
        }

        if let Err(e) = self.notifier.app_submitted(&record).await {
            tracing::error!(app_id = %record.id, error = %e, "Push notification failed");
        }

        if let Err(e) = self.notifier.review_requested(&record).await {
            tracing::error!(app_id = %record.id, error = %e, "Admin review notification failed");
        }

        Ok(record)
    }

    pub async fn usage(&self, device_id: &str) -> Result<UsageSummary, StoreError> {
        let now = self.clock.now();
        let subscription = self.store.get_subscription(device_id).await?;
        let usage = self.store.get_usage(device_id).await?;

        let admission =
            self.admission
                .evaluate(Some(device_id), subscription.as_ref(), usage.as_ref(), now);

        Ok(UsageSummary {
            upload_count: usage.map(|u| u.upload_count).unwrap_or(0),
            is_subscribed: admission == Admission::Subscribed,
            free_limit: self.admission.free_upload_limit,
            can_upload: admission.is_allowed(),
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<AppRecord>, StoreError> {
        self.store.get_app(id).await
    }

    pub async fn list(&self, query: &AppQuery) -> Result<Vec<AppRecord>, StoreError> {
        self.store.list_apps(query).await
    }

    /// Review gate for `app` as of now.
    pub fn availability(&self, app: &AppRecord) -> Availability {
        self.review
            .evaluate(app.status, Some(app.created_at), self.clock.now())
    }

    /// Owner-only delete. Does not give the upload back to the device's quota.
    pub async fn delete(&self, app_id: &str, device_id: &str) -> Result<(), DeleteError> {
        let app = self
            .store
            .get_app(app_id)
            .await?
            .ok_or(DeleteError::NotFound)?;

        if !app.is_owned_by(Some(device_id)) {
            tracing::warn!(app_id = %app_id, device_id = %device_id, "Delete by non-owner refused");
            return Err(DeleteError::NotOwner);
        }

        if !self.store.delete_app(app_id).await? {
            return Err(DeleteError::NotFound);
        }

        tracing::info!(app_id = %app_id, device_id = %device_id, "App deleted");
        Ok(())
    }
}
