//! Client for the outbound email collaborator.
//!
//! The collaborator accepts `POST {to, subject, text, html}` and answers
//! `{ok, id?, error?}`. A non-2xx status without a readable body is a transport error.

use async_trait::async_trait;
use log::{error, trace};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingEmail {
    pub fn new(to: &str, subject: &str, text: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
            html: render_html(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailReceipt {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        email: &OutgoingEmail,
    ) -> Result<EmailReceipt, Box<dyn std::error::Error + Send + Sync>>;
}

/// Escapes the plain-text body and keeps its line breaks.
pub fn render_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '\n' => escaped.push_str("<br>"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    format!("<p>{escaped}</p>")
}

pub struct HttpEmailClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpEmailClient {
    pub fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailClient {
    async fn send(
        &self,
        email: &OutgoingEmail,
    ) -> Result<EmailReceipt, Box<dyn std::error::Error + Send + Sync>> {
        trace!("Sending email to {}", email.to);

        let mut request = self.client.post(&self.url).json(email);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<EmailReceipt>(&body) {
            Ok(receipt) => Ok(receipt),
            Err(_) if !status.is_success() => {
                error!("Email service error {}: {}", status, body);
                Err(format!("email service returned {status}").into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_html_escapes_and_breaks_lines() {
        assert_eq!(
            render_html("Hi <Bob> & co\nsee you"),
            "<p>Hi &lt;Bob&gt; &amp; co<br>see you</p>"
        );
    }

    #[tokio::test]
    async fn test_send_posts_contract_with_bearer_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/send")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "to": "bob@example.com",
                "subject": "Hello",
                "text": "Order ready",
                "html": "<p>Order ready</p>"
            })))
            .with_status(200)
            .with_body(r#"{"ok": true, "id": "msg_1"}"#)
            .create_async()
            .await;

        let client = HttpEmailClient::new(
            &format!("{}/send", server.url()),
            Some("secret".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        let receipt = client
            .send(&OutgoingEmail::new("bob@example.com", "Hello", "Order ready"))
            .await
            .unwrap();

        assert!(receipt.ok);
        assert_eq!(receipt.id.as_deref(), Some("msg_1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_reads_rejection_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/send")
            .with_status(422)
            .with_body(r#"{"ok": false, "error": "mailbox unavailable"}"#)
            .create_async()
            .await;

        let client =
            HttpEmailClient::new(&format!("{}/send", server.url()), None, Duration::from_secs(5)).unwrap();
        let receipt = client
            .send(&OutgoingEmail::new("bob@example.com", "Hi", "x"))
            .await
            .unwrap();

        assert!(!receipt.ok);
        assert_eq!(receipt.error.as_deref(), Some("mailbox unavailable"));
    }

    #[tokio::test]
    async fn test_send_fails_on_unreadable_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/send")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client =
            HttpEmailClient::new(&format!("{}/send", server.url()), None, Duration::from_secs(5)).unwrap();
        assert!(client
            .send(&OutgoingEmail::new("bob@example.com", "Hi", "x"))
            .await
            .is_err());
    }
}
