//! Email channel over an HTTP mail relay
//!
//! Posts `{from, to, subject, html}` as JSON with a bearer token. Any
//! transactional mail API accepting that shape works.

use crate::config::{Credential, NotifyConfig};
use crate::notify::{template, NotificationEnvelope, Notifier, SosNotice};
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{error, info, warn};

/// Email notifier for the fixed admin recipient
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    client: reqwest::Client,
    api_url: String,
    credential: Credential,
    from: String,
    recipient: String,
    utc_offset_minutes: i32,
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl EmailNotifier {
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.mail_api_url.trim().to_string(),
            credential: config.mail_credential(),
            from: config.mail_from.trim().to_string(),
            recipient: config.admin_email.trim().to_string(),
            utc_offset_minutes: config.utc_offset_minutes,
        }
    }

    /// Compose the envelope for one alert
    pub fn compose(&self, notice: &SosNotice) -> NotificationEnvelope {
        NotificationEnvelope {
            recipient: self.recipient.clone(),
            subject: template::email_subject(notice),
            body: template::email_html(notice, self.utc_offset_minutes),
        }
    }

    /// Single delivery attempt; failures are logged and reported as `false`
    pub async fn send(&self, envelope: &NotificationEnvelope) -> bool {
        if envelope.recipient.is_empty() {
            warn!(channel = "email", "No admin email configured, skipping");
            return false;
        }
        if self.api_url.is_empty() {
            warn!(channel = "email", "No mail API URL configured, skipping");
            return false;
        }
        let Some(token) = self.credential.as_deref() else {
            warn!(channel = "email", "Mail API key missing, skipping");
            return false;
        };

        let request = MailRequest {
            from: &self.from,
            to: &envelope.recipient,
            subject: &envelope.subject,
            html: &envelope.body,
        };

        let response = match self
            .client
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(channel = "email", stage = "notify", error = %e, "Email request failed");
                return false;
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(channel = "email", recipient = %envelope.recipient, "Email sent");
            true
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(
                channel = "email",
                stage = "notify",
                status = %status,
                body = %body,
                "Mail API rejected message"
            );
            false
        }
    }
}

impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    fn notify<'a>(&'a self, notice: &'a SosNotice) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let envelope = self.compose(notice);
            self.send(&envelope).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::template::tests::sample_notice;
    use mockito::Matcher;

    fn config(url: &str) -> NotifyConfig {
        NotifyConfig {
            admin_email: "ops@fleet.test".to_string(),
            mail_api_url: url.to_string(),
            mail_api_key: "secret".to_string(),
            mail_from: "alerts@fleet.test".to_string(),
            ..NotifyConfig::default()
        }
    }

    #[test]
    fn test_compose() {
        let notifier = EmailNotifier::from_config(&config("http://unused"));
        let envelope = notifier.compose(&sample_notice());

        assert_eq!(envelope.recipient, "ops@fleet.test");
        assert_eq!(envelope.subject, "🚨 SOS ALERT: Ravi Kumar");
        assert!(envelope.body.contains("tel:+919999999999"));
    }

    #[tokio::test]
    async fn test_send_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "from": "alerts@fleet.test",
                "to": "ops@fleet.test",
                "subject": "🚨 SOS ALERT: Ravi Kumar",
            })))
            .with_status(202)
            .create_async()
            .await;

        let notifier = EmailNotifier::from_config(&config(&format!("{}/send", server.url())));
        assert!(notifier.notify(&sample_notice()).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/send")
            .with_status(500)
            .with_body("relay down")
            .create_async()
            .await;

        let notifier = EmailNotifier::from_config(&config(&format!("{}/send", server.url())));
        assert!(!notifier.notify(&sample_notice()).await);
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/send").expect(0).create_async().await;

        let mut cfg = config(&format!("{}/send", server.url()));
        cfg.mail_api_key = String::new();

        let notifier = EmailNotifier::from_config(&cfg);
        assert!(!notifier.notify(&sample_notice()).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_recipient_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/send").expect(0).create_async().await;

        let mut cfg = config(&format!("{}/send", server.url()));
        cfg.admin_email = "  ".to_string();

        let notifier = EmailNotifier::from_config(&cfg);
        assert!(!notifier.notify(&sample_notice()).await);
        mock.assert_async().await;
    }
}
