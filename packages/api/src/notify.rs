use std::sync::Arc;

use antimatter::{model::AppRecord, notify::Notifier, store::Store};
use antimatter_types::{Result, json::json};
use async_trait::async_trait;

use crate::{
    mail::{AdminMail, EmailMessage, templates},
    push::ExpoPushClient,
};

/// Production notifier: Expo push to every enabled token and, when
/// configured, a review request to the admin mailbox.
#[derive(Debug, Clone)]
pub struct StoreNotifier {
    store: Arc<dyn Store>,
    push: ExpoPushClient,
    admin_mail: Option<AdminMail>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn Store>, push: ExpoPushClient, admin_mail: Option<AdminMail>) -> Self {
        Self {
            store,
            push,
            admin_mail,
        }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn app_submitted(&self, app: &AppRecord) -> Result<()> {
        let tokens = self.store.enabled_push_tokens().await?;
        if tokens.is_empty() {
            return Ok(());
        }

        let body = format!("{} by {} is now available", app.name, app.developer_name);
        let data = json!({ "appId": app.id, "appName": app.name });
        self.push
            .send(&tokens, "New App Added", &body, Some(&data))
            .await?;

        tracing::debug!(app_id = %app.id, recipients = tokens.len(), "Push notification sent");
        Ok(())
    }

    async fn review_requested(&self, app: &AppRecord) -> Result<()> {
        let Some(admin_mail) = &self.admin_mail else {
            return Ok(());
        };

        let (subject, html) = templates::review_request(app);
        admin_mail
            .client
            .send(EmailMessage {
                to: admin_mail.admin_email.clone(),
                subject,
                body_html: Some(html),
                body_text: None,
            })
            .await?;

        tracing::debug!(
            app_id = %app.id,
            from = admin_mail.client.from_address(),
            "Review request mailed"
        );
        Ok(())
    }
}
