//! Subscription state mirrored from the payment provider.
//!
//! - [`verification`]: pull-based, the user claims an email and we look it up.
//! - [`webhook`]: push-based, the provider tells us about lifecycle changes.

pub mod verification;
pub mod webhook;

pub use verification::{SubscriptionVerifier, VerificationError, is_plausible_email};
pub use webhook::{ReconcileOutcome, WebhookError, WebhookReconciler};

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    pub current_period_end: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Payment provider request failed: {0}")]
    Request(String),
    #[error("Unexpected payment provider response: {0}")]
    Response(String),
}

/// The part of a payment provider's API the subscription checks need.
#[async_trait]
pub trait PaymentProvider: Send + Sync + Debug {
    fn provider_name(&self) -> &'static str;

    /// Customers whose email matches exactly, in provider order.
    async fn customers_by_email(&self, email: &str)
    -> Result<Vec<ProviderCustomer>, ProviderError>;

    /// Active subscriptions of a customer, in provider order.
    async fn active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, ProviderError>;
}

pub type DynPaymentProvider = Arc<dyn PaymentProvider>;
