//! SMS channel over a Twilio-compatible REST API
//!
//! `POST {base}/Accounts/{sid}/Messages.json` with form fields `To`, `From`
//! and `Body`, authenticated with the account SID and auth token.

use crate::config::{Credential, NotifyConfig};
use crate::notify::{template, NotificationEnvelope, Notifier, SosNotice};
use futures::future::BoxFuture;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SmsNotifier {
    client: reqwest::Client,
    api_url: String,
    account_sid: String,
    credential: Credential,
    sender: String,
    recipient: String,
    utc_offset_minutes: i32,
}

impl SmsNotifier {
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.sms_api_url.trim().trim_end_matches('/').to_string(),
            account_sid: config.sms_account_sid.trim().to_string(),
            credential: config.sms_credential(),
            sender: config.sms_sender.trim().to_string(),
            recipient: config.admin_phone.trim().to_string(),
            utc_offset_minutes: config.utc_offset_minutes,
        }
    }

    pub fn compose(&self, notice: &SosNotice) -> NotificationEnvelope {
        NotificationEnvelope {
            recipient: self.recipient.clone(),
            subject: template::email_subject(notice),
            body: template::sms_text(notice, self.utc_offset_minutes),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.api_url, self.account_sid)
    }

    /// Single delivery attempt; the subject is not transmitted
    pub async fn send(&self, envelope: &NotificationEnvelope) -> bool {
        if envelope.recipient.is_empty() {
            warn!(channel = "sms", "No admin phone configured, skipping");
            return false;
        }
        if self.account_sid.is_empty() || self.sender.is_empty() {
            warn!(channel = "sms", "SMS account or sender number missing, skipping");
            return false;
        }
        let Some(token) = self.credential.as_deref() else {
            warn!(channel = "sms", "SMS auth token missing, skipping");
            return false;
        };

        let form = [
            ("To", envelope.recipient.as_str()),
            ("From", self.sender.as_str()),
            ("Body", envelope.body.as_str()),
        ];

        let response = match self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(token))
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(channel = "sms", stage = "notify", error = %e, "SMS request failed");
                return false;
            }
        };

        let status = response.status();
        if status.is_success() {
            info!(channel = "sms", recipient = %envelope.recipient, "SMS sent");
            true
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(
                channel = "sms",
                stage = "notify",
                status = %status,
                body = %body,
                "SMS API rejected message"
            );
            false
        }
    }
}

impl Notifier for SmsNotifier {
    fn name(&self) -> &'static str {
        "sms"
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
            admin_phone: "+911234567890".to_string(),
            sms_account_sid: "AC123".to_string(),
            sms_auth_token: "token".to_string(),
            sms_sender: "+15550001111".to_string(),
            sms_api_url: url.to_string(),
            ..NotifyConfig::default()
        }
    }

    #[tokio::test]
    async fn test_send_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/Accounts/AC123/Messages.json")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("To".to_string(), "+911234567890".to_string()),
                Matcher::UrlEncoded("From".to_string(), "+15550001111".to_string()),
            ]))
            .with_status(201)
            .with_body(r#"{"sid":"SM1"}"#)
            .create_async()
            .await;

        let notifier = SmsNotifier::from_config(&config(&format!("{}/", server.url())));
        assert!(notifier.notify(&sample_notice()).await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/Accounts/AC123/Messages.json")
            .with_status(401)
            .create_async()
            .await;

        let notifier = SmsNotifier::from_config(&config(&server.url()));
        assert!(!notifier.notify(&sample_notice()).await);
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/Accounts/AC123/Messages.json")
            .expect(0)
            .create_async()
            .await;

        let mut cfg = config(&server.url());
        cfg.sms_auth_token = String::new();

        assert!(!SmsNotifier::from_config(&cfg).notify(&sample_notice()).await);
        mock.assert_async().await;
    }
}
