//! Free text in, one reply out.
//!
//! Text is segmented into statements and run through the local parser bank.
//! When nothing resolves and a language model is configured, the remote
//! extractor replaces the whole command list. Every command is normalized and
//! then executed in order against a single per-request [`PlanGate`].

pub mod command;
pub mod normalizer;
pub mod parsers;
pub mod remote;
pub mod reporter;
pub mod segmenter;

use log::{error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::billing::{InvoiceIssuer, PlanGate};
use crate::core::config::InterpreterConfig;
use crate::core::shared::utils::truncate_for_log;
use crate::email::EmailSender;
use crate::ledger::LedgerExecutor;
use crate::llm::LLMProvider;
use crate::store::{Store, StoreError};

pub use command::{AnalyticsMetric, Command, DocumentKind, LineItem};
pub use remote::RemoteExtractor;
pub use reporter::{ChatResponse, Reporter};

use parsers::{parse_statements, CLARIFICATION_PROMPT};

fn renormalize(command: Command) -> Command {
    match serde_json::to_value(&command) {
        Ok(raw) => normalizer::normalize(&raw),
        Err(_) => command,
    }
}

pub struct Interpreter {
    store: Arc<dyn Store>,
    executor: LedgerExecutor,
    remote: Option<RemoteExtractor>,
}

impl Interpreter {
    pub fn new(store: Arc<dyn Store>, settings: InterpreterConfig) -> Self {
        Self {
            executor: LedgerExecutor::new(store.clone(), settings),
            store,
            remote: None,
        }
    }

    pub fn with_llm(mut self, provider: Option<Arc<dyn LLMProvider>>) -> Self {
        self.remote = provider.map(RemoteExtractor::new);
        self
    }

    pub fn with_email(mut self, sender: Option<Arc<dyn EmailSender>>) -> Self {
        self.executor = self.executor.with_email(sender);
        self
    }

    pub fn with_invoicer(mut self, invoicer: Option<Arc<dyn InvoiceIssuer>>) -> Self {
        self.executor = self.executor.with_invoicer(invoicer);
        self
    }

    /// Commands for `text`, local parsers first. Never empty.
    pub async fn extract(&self, text: &str) -> Vec<Command> {
        let local = parse_statements(&segmenter::segment(text));
        let unresolved = local.iter().all(Command::is_unknown);

        let commands = match &self.remote {
            Some(remote) if unresolved => match remote.extract(text).await {
                Ok(commands) => commands,
                Err(e) => {
                    warn!("Remote extraction failed, keeping local result: {}", e);
                    local
                }
            },
            _ => local,
        };

        if commands.is_empty() {
            return vec![Command::unknown(CLARIFICATION_PROMPT)];
        }
        commands.into_iter().map(renormalize).collect()
    }

    /// Runs every command in order. A store failure stops the batch; commands
    /// that already ran stay applied.
    #[tracing::instrument(skip_all, fields(workspace_id = %workspace_id))]
    pub async fn handle(&self, workspace_id: Uuid, text: &str) -> Result<ChatResponse, StoreError> {
        info!(
            "Interpreting message for workspace {}: {}",
            workspace_id,
            truncate_for_log(text)
        );

        let commands = self.extract(text).await;
        let mut workspace = PlanGate::new(self.store.clone(), workspace_id);
        let mut reporter = Reporter::new();

        for command in &commands {
            if let Err(e) = self
                .executor
                .execute(&mut workspace, command, &mut reporter)
                .await
            {
                error!(
                    "Store failure while running {} for workspace {}: {}",
                    command, workspace_id, e
                );
                return Err(e);
            }
        }

        Ok(reporter.finish())
    }
}
