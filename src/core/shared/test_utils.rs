use crate::billing::invoice::{InvoiceIssuer, InvoiceOutcome, InvoiceRequest};
use crate::core::shared::utils::bd_to_f64;
use crate::email::{EmailReceipt, EmailSender, OutgoingEmail};
use crate::llm::LLMProvider;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct MockLLMProvider {
    pub response: Result<String, String>,
    calls: AtomicUsize,
}

impl MockLLMProvider {
    pub fn new() -> Self {
        Self::with_response(r#"{"actions": []}"#)
    }

    pub fn with_response(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn generate(
        &self,
        _system: &str,
        _prompt: &str,
        _config: &Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(content) => Ok(content.clone()),
            Err(message) => Err(message.clone().into()),
        }
    }
}

/// Email collaborator that records every message and answers with a fixed receipt.
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub reply: EmailReceipt,
}

impl RecordingEmailSender {
    pub fn accepting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reply: EmailReceipt {
                ok: true,
                id: Some("msg_test".to_string()),
                error: None,
            },
        }
    }

    pub fn rejecting(error: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reply: EmailReceipt {
                ok: false,
                id: None,
                error: Some(error.to_string()),
            },
        }
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(
        &self,
        email: &OutgoingEmail,
    ) -> Result<EmailReceipt, Box<dyn std::error::Error + Send + Sync>> {
        self.sent.lock().await.push(email.clone());
        Ok(self.reply.clone())
    }
}

#[derive(Debug, Default)]
pub struct RecordingInvoiceIssuer {
    pub requests: Mutex<Vec<InvoiceRequest>>,
}

impl RecordingInvoiceIssuer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceIssuer for RecordingInvoiceIssuer {
    async fn issue(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());
        let total: BigDecimal = request.items.iter().map(|i| i.total()).sum();
        Ok(InvoiceOutcome {
            ok: true,
            doc_no: Some(format!("DOC-{:04}", requests.len())),
            total: Some(bd_to_f64(&total)),
            sent: Some(request.send_email),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_generate() {
        let provider = MockLLMProvider::with_response("Test response");
        let result = provider.generate("s", "test", &Value::Null).await;
        assert_eq!(result.unwrap(), "Test response");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_mock_llm() {
        let provider = MockLLMProvider::failing("down");
        assert!(provider.generate("s", "p", &Value::Null).await.is_err());
    }
}
