use std::sync::Arc;

use antimatter::{
    billing::{DynPaymentProvider, SubscriptionVerifier, WebhookReconciler},
    clock::{Clock, SystemClock},
    config::{ConfigError, PolicyConfig, WebhookConfig},
    notify::DynNotifier,
    store::{Store, StoreError},
    submission::SubmissionService,
};

use crate::{
    cors::CorsPolicy, mail::AdminMail, notify::StoreNotifier, payments::StripePaymentProvider,
    push::ExpoPushClient, store::create_store,
};

pub type AppState = Arc<State>;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid CORS_ALLOWED_ORIGINS: {0}")]
    Cors(#[from] regex::Error),
}

#[derive(Debug)]
pub struct State {
    pub policy: PolicyConfig,
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub submissions: SubmissionService,
    /// `None` when no payment provider is configured.
    pub verifier: Option<SubscriptionVerifier>,
    /// `None` when no webhook secret is configured.
    pub webhooks: Option<WebhookReconciler>,
    pub cors: CorsPolicy,
}

impl State {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        notifier: DynNotifier,
        policy: PolicyConfig,
    ) -> Self {
        let submissions =
            SubmissionService::new(store.clone(), notifier, clock.clone(), &policy);
        Self {
            policy,
            store,
            clock,
            submissions,
            verifier: None,
            webhooks: None,
            cors: CorsPolicy::default(),
        }
    }

    pub fn with_payment_provider(mut self, provider: DynPaymentProvider) -> Self {
        self.verifier = Some(SubscriptionVerifier::new(
            self.store.clone(),
            provider,
            self.clock.clone(),
        ));
        self
    }

    pub fn with_webhook_config(mut self, config: WebhookConfig) -> Self {
        self.webhooks = Some(WebhookReconciler::new(
            self.store.clone(),
            config,
            self.clock.clone(),
        ));
        self
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    /// Build the production state from the environment.
    pub async fn from_env() -> Result<Self, StateError> {
        let policy = PolicyConfig::from_env()?;
        let webhook = WebhookConfig::from_env()?;
        let cors = CorsPolicy::from_env()?;

        let store = create_store().await?;
        tracing::info!(backend = store.backend_name(), "Store initialized");

        let admin_mail = AdminMail::from_env();
        if admin_mail.is_none() {
            tracing::info!("Admin review mail disabled");
        }
        let notifier = Arc::new(StoreNotifier::new(
            store.clone(),
            ExpoPushClient::from_env(),
            admin_mail,
        ));

        let mut state = Self::new(store, Arc::new(SystemClock), notifier, policy).with_cors(cors);

        match StripePaymentProvider::from_env() {
            Some(provider) => state = state.with_payment_provider(Arc::new(provider)),
            None => tracing::warn!("STRIPE_SECRET_KEY not set, subscription verification disabled"),
        }
        match webhook {
            Some(config) => state = state.with_webhook_config(config),
            None => tracing::warn!("STRIPE_WEBHOOK_SECRET not set, webhook endpoint disabled"),
        }

        tracing::info!(
            free_upload_limit = state.policy.free_upload_limit,
            review_period_hours = state.policy.review_period.num_hours(),
            "Gating policy loaded"
        );

        Ok(state)
    }
}
