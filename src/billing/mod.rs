use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::models::Workspace;
use crate::interpreter::command::Command;
use crate::store::{Store, StoreError};

pub mod invoice;

pub use invoice::{HttpInvoiceClient, InvoiceIssuer, InvoiceOutcome, InvoiceRequest};

const PAID_STATUSES: &[&str] = &["active", "trialing"];
const PREMIUM_PLAN: &str = "premium";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePlanInfo {
    pub plan: Option<String>,
    pub status: Option<String>,
    pub is_paid: bool,
}

impl WorkspacePlanInfo {
    /// A missing workspace row counts as unpaid.
    pub fn from_workspace(workspace: Option<&Workspace>) -> Self {
        let plan = workspace.and_then(|w| w.plan.clone());
        let status = workspace.and_then(|w| w.subscription_status.clone());
        let is_paid = is_paid(plan.as_deref(), status.as_deref());
        Self {
            plan,
            status,
            is_paid,
        }
    }
}

pub fn is_paid(plan: Option<&str>, status: Option<&str>) -> bool {
    let status_paid = status.is_some_and(|s| {
        let s = s.trim();
        PAID_STATUSES.iter().any(|p| s.eq_ignore_ascii_case(p))
    });
    let plan_premium = plan.is_some_and(|p| p.trim().eq_ignore_ascii_case(PREMIUM_PLAN));
    status_paid || plan_premium
}

/// Per-request view of the workspace row, used for plan checks and workspace
/// defaults. The row is loaded on first use and reused for the rest of the request.
pub struct PlanGate {
    store: Arc<dyn Store>,
    workspace_id: Uuid,
    cached: Option<Option<Workspace>>,
}

impl PlanGate {
    pub fn new(store: Arc<dyn Store>, workspace_id: Uuid) -> Self {
        Self {
            store,
            workspace_id,
            cached: None,
        }
    }

    pub fn workspace_id(&self) -> Uuid {
        self.workspace_id
    }

    pub async fn workspace(&mut self) -> Result<Option<&Workspace>, StoreError> {
        if self.cached.is_none() {
            let row = self.store.workspace(self.workspace_id).await?;
            self.cached = Some(row);
        }
        Ok(self.cached.as_ref().and_then(Option::as_ref))
    }

    pub async fn plan_info(&mut self) -> Result<WorkspacePlanInfo, StoreError> {
        let workspace = self.workspace().await?;
        Ok(WorkspacePlanInfo::from_workspace(workspace))
    }

    /// Non-premium commands pass without touching the store.
    pub async fn allows(&mut self, command: &Command) -> Result<bool, StoreError> {
        if !command.is_premium() {
            return Ok(true);
        }
        Ok(self.plan_info().await?.is_paid)
    }
}
