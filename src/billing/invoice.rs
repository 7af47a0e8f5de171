use async_trait::async_trait;
use log::{error, trace};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::interpreter::command::{DocumentKind, LineItem};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRequest {
    pub kind: DocumentKind,
    pub workspace_id: Uuid,
    pub to: String,
    pub items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub send_email: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceOutcome {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub doc_no: Option<String>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub sent: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[async_trait]
pub trait InvoiceIssuer: Send + Sync {
    async fn issue(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceOutcome, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct HttpInvoiceClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpInvoiceClient {
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
impl InvoiceIssuer for HttpInvoiceClient {
    async fn issue(
        &self,
        request: &InvoiceRequest,
    ) -> Result<InvoiceOutcome, Box<dyn std::error::Error + Send + Sync>> {
        trace!(
            "Issuing {} for workspace {} to {}",
            request.kind.as_str(),
            request.workspace_id,
            request.to
        );

        let mut call = self.client.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<InvoiceOutcome>(&body) {
            Ok(outcome) => Ok(outcome),
            Err(_) if !status.is_success() => {
                error!("Invoice service error {}: {}", status, body);
                Err(format!("invoice service returned {status}").into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
