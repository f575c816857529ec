//! Outbound transactional email.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tera::Context;

use crate::error::{AppError, AppResult};
use crate::http_client::HttpClient;
use crate::web::templates::Templates;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> AppResult<()>;
}

/// Sends through a Resend-compatible `POST /emails` endpoint.
pub struct ResendMailer {
    client: HttpClient,
    api_url: String,
    api_key: String,
}

impl ResendMailer {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: HttpClient::new(),
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> AppResult<()> {
        let response = self
            .client
            .post_json_with_bearer(&self.api_url, &self.api_key, email)
            .await
            .map_err(|e| AppError::Mail(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!("provider returned {}: {}", status, body)));
        }

        tracing::info!("Email sent: to={:?}, subject={}", email.to, email.subject);
        Ok(())
    }
}

/// Used when no API key is configured: the message is only logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> AppResult<()> {
        tracing::info!(
            "Email delivery disabled, would send: to={:?}, subject={}",
            email.to,
            email.subject
        );
        Ok(())
    }
}

/// Sends notifications to the dealership inbox. Bodies are rendered from the
/// embedded email templates. Delivery is best-effort: failures are logged and
/// swallowed so they never undo the write that triggered them.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    templates: Arc<Templates>,
    from: String,
    inbox: String,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        templates: Arc<Templates>,
        from: String,
        inbox: String,
    ) -> Self {
        Self {
            mailer,
            templates,
            from,
            inbox,
        }
    }

    /// Returns whether the provider accepted the message.
    pub async fn notify_inbox(
        &self,
        subject: String,
        template: &str,
        context: &Context,
        reply_to: Option<String>,
    ) -> bool {
        let html = match self.templates.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!(
                    "Notification email render failed: template={}, error={}",
                    template,
                    e
                );
                return false;
            }
        };
        let email = Email {
            from: self.from.clone(),
            to: vec![self.inbox.clone()],
            subject,
            html,
            reply_to,
        };
        match self.mailer.send(&email).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Notification email failed: subject={}, error={}", email.subject, e);
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records messages; fails every send when `fail` is set.
    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub sent: Mutex<Vec<Email>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> AppResult<()> {
            if self.fail {
                return Err(AppError::Mail("provider unavailable".into()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    /// Inbox notifier over the embedded templates.
    pub(crate) fn notifier(mailer: Arc<RecordingMailer>) -> Notifier {
        Notifier::new(
            mailer,
            Arc::new(Templates::new().unwrap()),
            "noreply@example.com".into(),
            "sales@example.com".into(),
        )
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_sent() {
        let mailer = Arc::new(RecordingMailer::default());
        let sent = notifier(mailer.clone())
            .notify_inbox("s".into(), "missing.html", &Context::new(), None)
            .await;
        assert!(!sent);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_email_serializes_in_provider_shape() {
        let email = Email {
            from: "Dealer <noreply@example.com>".into(),
            to: vec!["sales@example.com".into()],
            subject: "New enquiry".into(),
            html: "<p>hi</p>".into(),
            reply_to: None,
        };
        let json = serde_json::to_value(&email).unwrap();
        assert_eq!(json["to"][0], "sales@example.com");
        assert!(json.get("reply_to").is_none());
    }

    #[tokio::test]
    async fn test_log_mailer_never_fails() {
        let email = Email {
            from: "a@b.c".into(),
            to: vec!["d@e.f".into()],
            subject: "s".into(),
            html: String::new(),
            reply_to: Some("g@h.i".into()),
        };
        assert!(LogMailer.send(&email).await.is_ok());
    }
}
