use std::{fmt::Debug, sync::Arc};

use antimatter_types::Result;
use async_trait::async_trait;

use crate::model::AppRecord;

/// Fan-out after a successful submission. Both calls are best effort: the
/// submission service logs their errors and never surfaces them.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Tell subscribed users that a new app is in the store.
    async fn app_submitted(&self, app: &AppRecord) -> Result<()>;

    /// Ask the reviewer channel to look at the app.
    async fn review_requested(&self, app: &AppRecord) -> Result<()>;
}

pub type DynNotifier = Arc<dyn Notifier>;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn app_submitted(&self, _app: &AppRecord) -> Result<()> {
        Ok(())
    }

    async fn review_requested(&self, _app: &AppRecord) -> Result<()> {
        Ok(())
    }
}
