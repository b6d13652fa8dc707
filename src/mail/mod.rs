use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::db::ClassOverview;
use crate::error::CertificateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: PathBuf,
}

impl OutgoingMail {
    pub fn certificate(to: &str, class: &ClassOverview, attachment: &Path) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("{} Certificate", class.title),
            body: format!(
                "Your Certificate of Conclusion of {} is attached to this email. \
                 For more info, contact your teacher.\n\nCongratulations!",
                class.title
            ),
            attachment: attachment.to_path_buf(),
        }
    }
}

/// Outbound mail capability. Delivery is fire-and-forget: `Ok` means the
/// message was accepted for sending.
pub trait MailDispatcher {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), CertificateError>;
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    attachments: Vec<RelayAttachment>,
}

#[derive(Debug, Serialize)]
struct RelayAttachment {
    filename: String,
    content_type: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct RelayError {
    message: Option<String>,
}

/// Posts messages as JSON to an HTTP mail relay, attachments base64-encoded.
pub struct HttpMailer {
    client: Client,
    relay_url: String,
    api_key: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(relay_url: String, api_key: String, sender: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            relay_url,
            api_key,
            sender,
        })
    }

    async fn attachment(path: &Path) -> Result<RelayAttachment, CertificateError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| CertificateError::filesystem(path, e))?;
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("certificate.pdf")
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(RelayAttachment {
            filename,
            content_type,
            content: STANDARD.encode(content),
        })
    }
}

impl MailDispatcher for HttpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), CertificateError> {
        let failure = |reason: String| CertificateError::MailDispatchFailure {
            recipient: mail.to.clone(),
            reason,
        };

        let body = RelayRequest {
            from: &self.sender,
            to: &mail.to,
            subject: &mail.subject,
            text: &mail.body,
            attachments: vec![Self::attachment(&mail.attachment).await?],
        };

        let response = self
            .client
            .post(&self.relay_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| failure(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!("Mail relay accepted message to {}", mail.to);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RelayError>(&text)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or(text);
        Err(failure(format!("Relay returned {}: {}", status, message)))
    }
}
