use antimatter_types::{Result, Value};
use reqwest::Client;
use serde::Serialize;

pub const DEFAULT_EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";
/// Expo accepts at most this many messages per request.
pub const EXPO_BATCH_SIZE: usize = 100;

#[derive(Clone, Debug, Serialize)]
pub struct PushMessage<'a> {
    pub to: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a Value>,
}

#[derive(Clone, Debug)]
pub struct ExpoPushClient {
    client: Client,
    endpoint: String,
}

impl ExpoPushClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_env() -> Self {
        let endpoint = std::env::var("EXPO_PUSH_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_EXPO_PUSH_URL.to_string());
        Self::new(endpoint)
    }

    /// Send one notification to every token. Batches are sent in order and the
    /// first failing batch aborts the rest.
    pub async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: Option<&Value>,
    ) -> Result<()> {
        for batch in tokens.chunks(EXPO_BATCH_SIZE) {
            let messages: Vec<PushMessage> = batch
                .iter()
                .map(|to| PushMessage {
                    to,
                    title,
                    body,
                    data,
                })
                .collect();

            let response = self
                .client
                .post(&self.endpoint)
                .json(&messages)
                .send()
                .await
                .map_err(|e| antimatter_types::anyhow!("Failed to send Expo push: {}", e))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(antimatter_types::anyhow!(
                    "Expo push error: {} - {}",
                    status,
                    text
                ));
            }
        }

        Ok(())
    }
}
