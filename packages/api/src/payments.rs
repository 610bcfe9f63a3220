use std::str::FromStr;

use antimatter::billing::{
    PaymentProvider, ProviderCustomer, ProviderError, ProviderSubscription,
};
use antimatter_types::utils::from_unix_seconds;
use async_trait::async_trait;

/// [`PaymentProvider`] backed by the Stripe REST API.
#[derive(Clone)]
pub struct StripePaymentProvider {
    client: stripe::Client,
}

impl std::fmt::Debug for StripePaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripePaymentProvider").finish_non_exhaustive()
    }
}

impl StripePaymentProvider {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: stripe::Client::new(secret_key.into()),
        }
    }

    /// `None` when `STRIPE_SECRET_KEY` is unset.
    pub fn from_env() -> Option<Self> {
        std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .map(Self::new)
    }
}

fn provider_err(err: stripe::StripeError) -> ProviderError {
    ProviderError::Request(err.to_string())
}

#[async_trait]
impl PaymentProvider for StripePaymentProvider {
    fn provider_name(&self) -> &'static str {
        "stripe"
    }

    async fn customers_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<ProviderCustomer>, ProviderError> {
        let customers = stripe::Customer::list(
            &self.client,
            &stripe::ListCustomers {
                email: Some(email),
                ..Default::default()
            },
        )
        .await
        .map_err(provider_err)?;

        Ok(customers
            .data
            .into_iter()
            .map(|customer| ProviderCustomer {
                id: customer.id.to_string(),
                email: customer.email,
            })
            .collect())
    }

    async fn active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ProviderSubscription>, ProviderError> {
        let customer = stripe::CustomerId::from_str(customer_id)
            .map_err(|_| ProviderError::Response(format!("invalid customer id {customer_id}")))?;

        let subscriptions = stripe::Subscription::list(
            &self.client,
            &stripe::ListSubscriptions {
                customer: Some(customer),
                status: Some(stripe::SubscriptionStatusFilter::Active),
                ..Default::default()
            },
        )
        .await
        .map_err(provider_err)?;

        subscriptions
            .data
            .into_iter()
            .map(|subscription| {
                let current_period_end = from_unix_seconds(subscription.current_period_end)
                    .ok_or_else(|| {
                        ProviderError::Response(format!(
                            "subscription {} has an invalid period end",
                            subscription.id
                        ))
                    })?;
                Ok(ProviderSubscription {
                    id: subscription.id.to_string(),
                    customer_id: subscription.customer.id().to_string(),
                    current_period_end,
                })
            })
            .collect()
    }
}
