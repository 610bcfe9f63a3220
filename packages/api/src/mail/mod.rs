use std::sync::Arc;

use antimatter_types::Result;

mod resend;
pub mod templates;

pub use resend::ResendMailClient;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: Option<String>,
    pub body_text: Option<String>,
}

#[async_trait::async_trait]
pub trait MailClient: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: EmailMessage) -> Result<()>;
    fn from_address(&self) -> &str;
}

pub type DynMailClient = Arc<dyn MailClient>;

/// Where review requests go and how they are sent.
#[derive(Clone, Debug)]
pub struct AdminMail {
    pub client: DynMailClient,
    pub admin_email: String,
}

impl AdminMail {
    /// Needs `RESEND_API_KEY` and `ADMIN_EMAIL`; `None` disables admin mail.
    pub fn from_env() -> Option<Self> {
        let client = ResendMailClient::from_env()?;
        let Some(admin_email) = std::env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty())
        else {
            tracing::warn!("RESEND_API_KEY is set but ADMIN_EMAIL is not, admin mail disabled");
            return None;
        };

        Some(Self {
            client: Arc::new(client),
            admin_email,
        })
    }
}
