use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::billing::{HttpInvoiceClient, InvoiceIssuer};
use crate::core::config::{AppConfig, StoreBackend};
use crate::core::shared::utils::create_conn;
use crate::email::{EmailSender, HttpEmailClient};
use crate::interpreter::Interpreter;
use crate::llm::{LLMProvider, OpenAIClient};
use crate::store::{MemoryStore, PgStore, Store};

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    pub interpreter: Arc<Interpreter>,
}

impl AppState {
    /// Opens the configured store, then wires every configured client.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match config.database.backend {
            StoreBackend::Postgres => {
                let url = config
                    .database
                    .url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("database.url is not set"))?;
                let pool = create_conn(url, config.database.max_connections)?;
                info!(
                    "Connected to Postgres (pool size {})",
                    config.database.max_connections
                );
                Arc::new(PgStore::new(pool))
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };
        Self::new(config, store)
    }

    /// Unconfigured clients stay absent: no remote extraction, and email or
    /// invoice commands report the service as unavailable.
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let llm: Option<Arc<dyn LLMProvider>> = if config.llm.is_configured() {
            let client = OpenAIClient::new(
                config.llm.api_key.clone().unwrap_or_default(),
                config.llm.url.clone(),
                config.llm.model.clone(),
                Duration::from_secs(config.llm.timeout_secs),
            )?;
            info!("Remote extraction enabled with model {}", config.llm.model);
            Some(Arc::new(client))
        } else {
            None
        };

        let timeout = Duration::from_secs(config.collaborators.timeout_secs);
        let api_key = config.collaborators.api_key.clone();

        let email: Option<Arc<dyn EmailSender>> = match config.collaborators.email_url.as_deref() {
            Some(url) => Some(Arc::new(HttpEmailClient::new(url, api_key.clone(), timeout)?)),
            None => None,
        };
        let invoicer: Option<Arc<dyn InvoiceIssuer>> =
            match config.collaborators.invoice_url.as_deref() {
                Some(url) => Some(Arc::new(HttpInvoiceClient::new(url, api_key, timeout)?)),
                None => None,
            };

        let interpreter = Interpreter::new(store.clone(), config.interpreter.clone())
            .with_llm(llm)
            .with_email(email)
            .with_invoicer(invoicer);

        Ok(Self {
            config,
            store,
            interpreter: Arc::new(interpreter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_needs_no_database_url() {
        let mut config = AppConfig::default();
        config.database.backend = StoreBackend::Memory;
        assert!(AppState::from_config(config).is_ok());
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let config = AppConfig::default();
        assert!(AppState::from_config(config).is_err());
    }
}
