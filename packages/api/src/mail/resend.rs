use antimatter_types::Result;
use reqwest::Client;
use serde::Serialize;

use super::{EmailMessage, MailClient};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const DEFAULT_FROM: &str = "Anti-Matter <onboarding@resend.dev>";

pub struct ResendMailClient {
    client: Client,
    api_key: String,
    from: String,
}

impl std::fmt::Debug for ResendMailClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailClient")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

impl ResendMailClient {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    /// `None` when `RESEND_API_KEY` is unset. `RESEND_FROM` overrides the sender.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RESEND_API_KEY").ok().filter(|v| !v.is_empty())?;
        let from = std::env::var("RESEND_FROM")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FROM.to_string());
        Some(Self::new(api_key, from))
    }
}

#[async_trait::async_trait]
impl MailClient for ResendMailClient {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        if message.body_html.is_none() && message.body_text.is_none() {
            return Err(antimatter_types::anyhow!(
                "Email must have either HTML or text body"
            ));
        }

        let email = ResendEmail {
            from: &self.from,
            to: vec![message.to.as_str()],
            subject: &message.subject,
            html: message.body_html.as_deref(),
            text: message.body_text.as_deref(),
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await
            .map_err(|e| antimatter_types::anyhow!("Failed to send email via Resend: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(antimatter_types::anyhow!(
                "Resend API error: {} - {}",
                status,
                body
            ));
        }

        Ok(())
    }

    fn from_address(&self) -> &str {
        &self.from
    }
}
