use log::warn;
use uuid::Uuid;

use super::LedgerExecutor;
use crate::billing::InvoiceRequest;
use crate::core::shared::utils::bd;
use crate::email::OutgoingEmail;
use crate::interpreter::command::{Command, DocumentKind, LineItem};
use crate::interpreter::reporter::Reporter;
use crate::security::{validate_email, validate_required};

const DEFAULT_SUBJECT: &str = "A quick note";

pub(super) fn kind_of(command: &Command) -> DocumentKind {
    match command {
        Command::CreateReceipt { .. } => DocumentKind::Receipt,
        _ => DocumentKind::Invoice,
    }
}

fn valid_recipient(to: Option<&str>) -> Option<&str> {
    let to = validate_required(to, "to").ok()?;
    validate_email(to).ok().map(|_| to)
}

impl LedgerExecutor {
    pub(super) async fn send_email(
        &self,
        to: Option<&str>,
        subject: Option<&str>,
        message: Option<&str>,
        reporter: &mut Reporter,
    ) {
        let Some(sender) = &self.email else {
            reporter.push("Email unavailable: no email service is configured");
            return;
        };
        let Some(to) = valid_recipient(to) else {
            reporter.push("Email skipped: a valid recipient address is needed");
            return;
        };
        let Ok(message) = validate_required(message, "message") else {
            reporter.push(format!("Email skipped for {to}: what should the message say?"));
            return;
        };
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT);

        match sender.send(&OutgoingEmail::new(to, subject, message)).await {
            Ok(receipt) if receipt.ok => reporter.push(format!("Email ✅ sent to {to}")),
            Ok(receipt) => {
                let reason = receipt.error.unwrap_or_else(|| "rejected".to_string());
                warn!("Email to {} rejected: {}", to, reason);
                reporter.push(format!("Email ❌ to {to}: {reason}"));
            }
            Err(e) => {
                warn!("Email to {} failed: {}", to, e);
                reporter.push(format!("Email ❌ to {to}: {e}"));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) async fn issue_document(
        &self,
        workspace_id: Uuid,
        kind: DocumentKind,
        to: Option<&str>,
        items: &[LineItem],
        note: Option<&str>,
        send_email: bool,
        reporter: &mut Reporter,
    ) {
        let title = kind.title();
        let Some(invoicer) = &self.invoicer else {
            reporter.push(format!("{title} unavailable: no invoicing service is configured"));
            return;
        };
        let Some(to) = valid_recipient(to) else {
            reporter.push(format!("{title} skipped: a valid recipient address is needed"));
            return;
        };
        if items.is_empty() {
            reporter.push(format!(
                "{title} skipped: add at least one item, e.g. \"3 rice at $4\""
            ));
            return;
        }

        let request = InvoiceRequest {
            kind,
            workspace_id,
            to: to.to_string(),
            items: items.to_vec(),
            note: note.map(str::to_string),
            send_email,
        };

        match invoicer.issue(&request).await {
            Ok(outcome) if outcome.ok => {
                let total = match outcome.total {
                    Some(total) => bd(total),
                    None => items.iter().map(LineItem::total).sum(),
                };
                let mut line = format!(
                    "{title} ✅ {} for {to}, total {}",
                    outcome.doc_no.as_deref().unwrap_or("created"),
                    self.settings.format_money(&total)
                );
                if outcome.sent == Some(true) {
                    line.push_str(", emailed");
                }
                reporter.push(line);
            }
            Ok(outcome) => {
                let reason = outcome.error.unwrap_or_else(|| "rejected".to_string());
                warn!("{} for {} rejected: {}", title, to, reason);
                reporter.push(format!("{title} ❌ for {to}: {reason}"));
            }
            Err(e) => {
                warn!("{} for {} failed: {}", title, to, e);
                reporter.push(format!("{title} ❌ for {to}: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::PlanGate;
    use crate::core::config::InterpreterConfig;
    use crate::core::shared::models::Workspace;
    use crate::core::shared::test_utils::{RecordingEmailSender, RecordingInvoiceIssuer};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    async fn paid_store(workspace_id: Uuid) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .put_workspace(Workspace {
                id: workspace_id,
                name: "Shop".to_string(),
                plan: Some("premium".to_string()),
                subscription_status: None,
                default_reorder_threshold: None,
            })
            .await;
        store
    }

    async fn run(executor: &LedgerExecutor, store: Arc<MemoryStore>, ws: Uuid, command: Command) -> Vec<String> {
        let mut gate = PlanGate::new(store, ws);
        let mut reporter = Reporter::new();
        executor.execute(&mut gate, &command, &mut reporter).await.unwrap();
        reporter.finish().results
    }

    #[tokio::test]
    async fn test_email_sent_through_collaborator() {
        let ws = Uuid::new_v4();
        let store = paid_store(ws).await;
        let sender = Arc::new(RecordingEmailSender::accepting());
        let executor = LedgerExecutor::new(store.clone(), InterpreterConfig::default())
            .with_email(Some(sender.clone()));

        let lines = run(
            &executor,
            store,
            ws,
            Command::SendEmail {
                to: Some("bob@example.com".to_string()),
                subject: None,
                message: Some("Your order is ready".to_string()),
            },
        )
        .await;

        assert_eq!(lines, vec!["• Email ✅ sent to bob@example.com"]);
        let sent = sender.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, DEFAULT_SUBJECT);
        assert_eq!(sent[0].text, "Your order is ready");
    }

    #[tokio::test]
    async fn test_email_validation_and_rejection() {
        let ws = Uuid::new_v4();
        let store = paid_store(ws).await;
        let sender = Arc::new(RecordingEmailSender::rejecting("quota exceeded"));
        let executor = LedgerExecutor::new(store.clone(), InterpreterConfig::default())
            .with_email(Some(sender.clone()));

        let bad_address = run(
            &executor,
            store.clone(),
            ws,
            Command::SendEmail {
                to: Some("bob@".to_string()),
                subject: None,
                message: Some("hi".to_string()),
            },
        )
        .await;
        assert_eq!(bad_address, vec!["• Email skipped: a valid recipient address is needed"]);

        let rejected = run(
            &executor,
            store,
            ws,
            Command::SendEmail {
                to: Some("bob@example.com".to_string()),
                subject: Some("Hi".to_string()),
                message: Some("hi".to_string()),
            },
        )
        .await;
        assert_eq!(rejected, vec!["• Email ❌ to bob@example.com: quota exceeded"]);
        assert_eq!(sender.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_email_unavailable_without_collaborator() {
        let ws = Uuid::new_v4();
        let store = paid_store(ws).await;
        let executor = LedgerExecutor::new(store.clone(), InterpreterConfig::default());

        let lines = run(
            &executor,
            store,
            ws,
            Command::SendEmail {
                to: Some("bob@example.com".to_string()),
                subject: None,
                message: Some("hi".to_string()),
            },
        )
        .await;
        assert_eq!(lines, vec!["• Email unavailable: no email service is configured"]);
    }

    #[tokio::test]
    async fn test_receipt_issued_with_items() {
        let ws = Uuid::new_v4();
        let store = paid_store(ws).await;
        let issuer = Arc::new(RecordingInvoiceIssuer::new());
        let executor = LedgerExecutor::new(store.clone(), InterpreterConfig::default())
            .with_invoicer(Some(issuer.clone()));

        let lines = run(
            &executor,
            store,
            ws,
            Command::CreateReceipt {
                to: Some("ada@shop.io".to_string()),
                items: vec![LineItem {
                    name: "rice".to_string(),
                    quantity: 3.0,
                    unit_price: 4.0,
                }],
                note: Some("thanks".to_string()),
                send_email: true,
            },
        )
        .await;

        assert_eq!(
            lines,
            vec!["• Receipt ✅ DOC-0001 for ada@shop.io, total $12.00, emailed"]
        );
        let requests = issuer.requests.lock().await;
        assert_eq!(requests[0].kind, DocumentKind::Receipt);
        assert_eq!(requests[0].workspace_id, ws);
        assert_eq!(requests[0].note.as_deref(), Some("thanks"));
    }

    #[tokio::test]
    async fn test_invoice_without_items_is_skipped() {
        let ws = Uuid::new_v4();
        let store = paid_store(ws).await;
        let issuer = Arc::new(RecordingInvoiceIssuer::new());
        let executor = LedgerExecutor::new(store.clone(), InterpreterConfig::default())
            .with_invoicer(Some(issuer.clone()));

        let lines = run(
            &executor,
            store,
            ws,
            Command::CreateInvoice {
                to: Some("ada@shop.io".to_string()),
                items: vec![],
                note: None,
                send_email: true,
            },
        )
        .await;

        assert_eq!(
            lines,
            vec!["• Invoice skipped: add at least one item, e.g. \"3 rice at $4\""]
        );
        assert!(issuer.requests.lock().await.is_empty());
    }
}
