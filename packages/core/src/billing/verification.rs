use std::sync::Arc;

use crate::{
    billing::{DynPaymentProvider, ProviderError},
    clock::Clock,
    model::SubscriptionRecord,
    store::{Store, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("No subscription found for this email")]
    CustomerNotFound,
    #[error("No active subscription found for this email")]
    NoActiveSubscription,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cheap shape check run before spending a provider round trip.
pub fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Links a device to a paying customer by the email it paid with.
#[derive(Debug, Clone)]
pub struct SubscriptionVerifier {
    store: Arc<dyn Store>,
    provider: DynPaymentProvider,
    clock: Arc<dyn Clock>,
}

impl SubscriptionVerifier {
    pub fn new(store: Arc<dyn Store>, provider: DynPaymentProvider, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            provider,
            clock,
        }
    }

    /// Look up `email` at the provider and record its active subscription
    /// for `device_id`.
    ///
    /// The first customer and the first active subscription win, in whatever
    /// order the provider returns them. Re-running with the same input writes
    /// the same record again. Running it with another customer's email moves
    /// the device to that customer.
    pub async fn verify(
        &self,
        device_id: &str,
        email: &str,
    ) -> Result<SubscriptionRecord, VerificationError> {
        let customers = self.provider.customers_by_email(email).await?;
        let customer = customers
            .into_iter()
            .next()
            .ok_or(VerificationError::CustomerNotFound)?;

        let subscription = self
            .provider
            .active_subscriptions(&customer.id)
            .await?
            .into_iter()
            .next()
            .ok_or(VerificationError::NoActiveSubscription)?;

        if let Some(existing) = self.store.get_subscription(device_id).await?
            && existing.external_customer_id != customer.id
        {
            tracing::warn!(
                device_id = %device_id,
                previous_customer_id = %existing.external_customer_id,
                customer_id = %customer.id,
                "Device moved to a different customer"
            );
        }

        let record = SubscriptionRecord {
            device_id: device_id.to_string(),
            external_customer_id: customer.id,
            current_period_end: Some(subscription.current_period_end),
            updated_at: self.clock.now(),
        };
        self.store.upsert_subscription(record.clone()).await?;

        tracing::info!(
            device_id = %device_id,
            customer_id = %record.external_customer_id,
            subscription_id = %subscription.id,
            current_period_end = %subscription.current_period_end,
            provider = self.provider.provider_name(),
            "Subscription verified"
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        billing::{PaymentProvider, ProviderCustomer, ProviderSubscription},
        clock::ManualClock,
        store::InMemoryStore,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    #[derive(Debug, Default)]
    struct FakeProvider {
        customers: Vec<ProviderCustomer>,
        subscriptions: Vec<ProviderSubscription>,
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        fn provider_name(&self) -> &'static str {
            "fake"
        }

        async fn customers_by_email(
            &self,
            email: &str,
        ) -> Result<Vec<ProviderCustomer>, ProviderError> {
            Ok(self
                .customers
                .iter()
                .filter(|c| c.email.as_deref() == Some(email))
                .cloned()
                .collect())
        }

        async fn active_subscriptions(
            &self,
            customer_id: &str,
        ) -> Result<Vec<ProviderSubscription>, ProviderError> {
            Ok(self
                .subscriptions
                .iter()
                .filter(|s| s.customer_id == customer_id)
                .cloned()
                .collect())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()
    }

    fn customer(id: &str, email: &str) -> ProviderCustomer {
        ProviderCustomer {
            id: id.into(),
            email: Some(email.into()),
        }
    }

    fn subscription(id: &str, customer: &str, end: DateTime<Utc>) -> ProviderSubscription {
        ProviderSubscription {
            id: id.into(),
            customer_id: customer.into(),
            current_period_end: end,
        }
    }

    fn verifier(store: Arc<InMemoryStore>, provider: FakeProvider) -> SubscriptionVerifier {
        SubscriptionVerifier::new(store, Arc::new(provider), Arc::new(ManualClock::new(now())))
    }

    #[test]
    fn email_shape() {
        assert!(is_plausible_email("dev@example.com"));
        assert!(!is_plausible_email("dev@example"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("dev example@example.com"));
        assert!(!is_plausible_email("dev@@example.com"));
    }

    #[tokio::test]
    async fn verifying_twice_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let end = now() + Duration::days(30);
        let verifier = verifier(
            store.clone(),
            FakeProvider {
                customers: vec![customer("cus_1", "dev@example.com")],
                subscriptions: vec![subscription("sub_1", "cus_1", end)],
            },
        );

        let first = verifier.verify("dev-1", "dev@example.com").await.unwrap();
        let second = verifier.verify("dev-1", "dev@example.com").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.current_period_end, Some(end));
        assert_eq!(store.subscription_count(), 1);
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let verifier = verifier(store.clone(), FakeProvider::default());

        let err = verifier.verify("dev-1", "nobody@example.com").await.unwrap_err();
        assert!(matches!(err, VerificationError::CustomerNotFound));
        assert_eq!(store.subscription_count(), 0);
    }

    #[tokio::test]
    async fn customer_without_active_subscription_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let verifier = verifier(
            store.clone(),
            FakeProvider {
                customers: vec![customer("cus_1", "dev@example.com")],
                subscriptions: vec![],
            },
        );

        let err = verifier.verify("dev-1", "dev@example.com").await.unwrap_err();
        assert!(matches!(err, VerificationError::NoActiveSubscription));
        assert_eq!(store.subscription_count(), 0);
    }

    #[tokio::test]
    async fn first_subscription_in_provider_order_wins() {
        let store = Arc::new(InMemoryStore::new());
        let verifier = verifier(
            store,
            FakeProvider {
                customers: vec![customer("cus_1", "dev@example.com")],
                subscriptions: vec![
                    subscription("sub_a", "cus_1", now() + Duration::days(3)),
                    subscription("sub_b", "cus_1", now() + Duration::days(300)),
                ],
            },
        );

        let record = verifier.verify("dev-1", "dev@example.com").await.unwrap();
        assert_eq!(record.current_period_end, Some(now() + Duration::days(3)));
    }

    #[tokio::test]
    async fn reverifying_with_another_email_moves_the_device() {
        let store = Arc::new(InMemoryStore::new());
        let verifier = verifier(
            store.clone(),
            FakeProvider {
                customers: vec![
                    customer("cus_1", "one@example.com"),
                    customer("cus_2", "two@example.com"),
                ],
                subscriptions: vec![
                    subscription("sub_1", "cus_1", now() + Duration::days(10)),
                    subscription("sub_2", "cus_2", now() + Duration::days(20)),
                ],
            },
        );

        verifier.verify("dev-1", "one@example.com").await.unwrap();
        verifier.verify("dev-1", "two@example.com").await.unwrap();

        let record = store.get_subscription("dev-1").await.unwrap().unwrap();
        assert_eq!(record.external_customer_id, "cus_2");
        assert_eq!(store.subscription_count(), 1);
    }
}
