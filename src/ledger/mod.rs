//! Executes normalized commands against the store and collaborators.
//!
//! Every command produces at least one reply line. Invalid input, plan
//! denials and collaborator failures become lines; only [`StoreError`]s
//! propagate, aborting the rest of the batch.
//!
//! Inventory is only ever changed through [`Store::apply_inventory_delta`].
//! The movement audit row written afterwards is best-effort.

mod documents;

use chrono::Local;
use log::warn;
use std::sync::Arc;
use uuid::Uuid;

use crate::analytics::{render_line, AnalyticsAggregator};
use crate::billing::{InvoiceIssuer, PlanGate};
use crate::core::config::InterpreterConfig;
use crate::core::shared::models::{
    AnalyticsPeriod, NewExpense, NewInventoryMovement, NewSale, PaymentStatus,
};
use crate::core::shared::utils::{bd, format_quantity};
use crate::email::EmailSender;
use crate::interpreter::command::{AnalyticsMetric, Command};
use crate::interpreter::reporter::Reporter;
use crate::products::{EntityResolver, ResolvedProduct};
use crate::security::validate_positive;
use crate::store::{Store, StoreError};

pub const LOW_STOCK_SUFFIX: &str = " ⚠️ low stock";

pub const REASON_SALE: &str = "sale";
pub const REASON_PURCHASE: &str = "purchase";
pub const REASON_REMOVAL: &str = "removal";

const DEFAULT_EXPENSE_CATEGORY: &str = "general";

pub struct LedgerExecutor {
    store: Arc<dyn Store>,
    resolver: EntityResolver,
    analytics: AnalyticsAggregator,
    email: Option<Arc<dyn EmailSender>>,
    invoicer: Option<Arc<dyn InvoiceIssuer>>,
    settings: InterpreterConfig,
}

impl LedgerExecutor {
    pub fn new(store: Arc<dyn Store>, settings: InterpreterConfig) -> Self {
        Self {
            resolver: EntityResolver::new(store.clone(), settings.default_reorder_threshold),
            analytics: AnalyticsAggregator::new(store.clone()),
            store,
            email: None,
            invoicer: None,
            settings,
        }
    }

    pub fn with_email(mut self, sender: Option<Arc<dyn EmailSender>>) -> Self {
        self.email = sender;
        self
    }

    pub fn with_invoicer(mut self, invoicer: Option<Arc<dyn InvoiceIssuer>>) -> Self {
        self.invoicer = invoicer;
        self
    }

    pub async fn execute(
        &self,
        workspace: &mut PlanGate,
        command: &Command,
        reporter: &mut Reporter,
    ) -> Result<(), StoreError> {
        if !workspace.allows(command).await? {
            reporter.push(premium_denial(command));
            return Ok(());
        }

        match command {
            Command::RecordSale {
                product_name,
                quantity,
                unit_price,
                payment_status,
            } => {
                self.record_sale(
                    workspace,
                    product_name.as_deref(),
                    *quantity,
                    *unit_price,
                    *payment_status,
                    reporter,
                )
                .await
            }
            Command::RecordExpense {
                expense_name,
                amount,
                category,
            } => {
                self.record_expense(
                    workspace.workspace_id(),
                    expense_name.as_deref(),
                    *amount,
                    category,
                    reporter,
                )
                .await
            }
            Command::AddStock {
                product_name,
                quantity,
            } => {
                self.adjust_stock(workspace, product_name.as_deref(), *quantity, 1.0, reporter)
                    .await
            }
            Command::RemoveStock {
                product_name,
                quantity,
            } => {
                self.adjust_stock(workspace, product_name.as_deref(), *quantity, -1.0, reporter)
                    .await
            }
            Command::CreateProduct {
                product_name,
                reorder_threshold,
            } => {
                self.create_product(workspace, product_name.as_deref(), *reorder_threshold, reporter)
                    .await
            }
            Command::Analytics {
                metric,
                period,
                payment_split,
            } => {
                self.report_analytics(
                    workspace.workspace_id(),
                    *metric,
                    *period,
                    payment_split.unwrap_or(false),
                    reporter,
                )
                .await
            }
            Command::SendEmail {
                to,
                subject,
                message,
            } => {
                self.send_email(to.as_deref(), subject.as_deref(), message.as_deref(), reporter)
                    .await;
                Ok(())
            }
            Command::CreateInvoice {
                to,
                items,
                note,
                send_email,
            }
            | Command::CreateReceipt {
                to,
                items,
                note,
                send_email,
            } => {
                let kind = documents::kind_of(command);
                self.issue_document(
                    workspace.workspace_id(),
                    kind,
                    to.as_deref(),
                    items,
                    note.as_deref(),
                    *send_email,
                    reporter,
                )
                .await;
                Ok(())
            }
            Command::Unknown { ask } => {
                reporter.push(format!("❓ {ask}"));
                Ok(())
            }
        }
    }

    async fn resolve(
        &self,
        workspace: &mut PlanGate,
        name: &str,
        reporter: &mut Reporter,
    ) -> Result<ResolvedProduct, StoreError> {
        let resolved = self.resolver.resolve(workspace, name, None).await?;
        if resolved.created {
            reporter.push(format!(
                "Created product {} (reorder at {})",
                resolved.product.name,
                format_quantity(resolved.product.reorder_threshold)
            ));
        }
        Ok(resolved)
    }

    async fn log_movement(&self, workspace_id: Uuid, product_id: Uuid, change: f64, reason: &str) {
        let movement = NewInventoryMovement {
            workspace_id,
            product_id,
            quantity_change: change,
            reason: reason.to_string(),
        };
        if let Err(e) = self.store.insert_movement(movement).await {
            warn!(
                "Failed to log {} movement for product {}: {}",
                reason, product_id, e
            );
        }
    }

    async fn record_sale(
        &self,
        workspace: &mut PlanGate,
        product_name: Option<&str>,
        quantity: Option<f64>,
        unit_price: f64,
        payment_status: PaymentStatus,
        reporter: &mut Reporter,
    ) -> Result<(), StoreError> {
        let Some(name) = product_name else {
            reporter.push("Sale skipped: which product was sold?");
            return Ok(());
        };
        let Ok(quantity) = validate_positive(quantity, "quantity") else {
            reporter.push(format!(
                "Sale skipped for {name}: quantity must be greater than zero"
            ));
            return Ok(());
        };
        if !unit_price.is_finite() || unit_price < 0.0 {
            reporter.push(format!("Sale skipped for {name}: price can't be negative"));
            return Ok(());
        }

        let unit_price = bd(unit_price);

        let ResolvedProduct { product, .. } = self.resolve(workspace, name, reporter).await?;
        let workspace_id = workspace.workspace_id();

        self.store
            .insert_sale(NewSale {
                workspace_id,
                product_id: product.id,
                quantity_sold: quantity,
                unit_price: unit_price.clone(),
                payment_status,
            })
            .await?;
        let balance = self
            .store
            .apply_inventory_delta(workspace_id, product.id, -quantity)
            .await?;
        self.log_movement(workspace_id, product.id, -quantity, REASON_SALE)
            .await;

        let mut line = format!(
            "Sale ✅ {} x {} @ {} (stock: {})",
            format_quantity(quantity),
            product.name,
            self.settings.format_money(&unit_price),
            format_quantity(balance)
        );
        if payment_status == PaymentStatus::Unpaid {
            line.push_str(" (unpaid)");
        }
        if balance <= product.reorder_threshold {
            line.push_str(LOW_STOCK_SUFFIX);
        }
        reporter.push(line);
        Ok(())
    }

    async fn record_expense(
        &self,
        workspace_id: Uuid,
        expense_name: Option<&str>,
        amount: Option<f64>,
        category: &str,
        reporter: &mut Reporter,
    ) -> Result<(), StoreError> {
        let Some(name) = expense_name else {
            reporter.push("Expense skipped: what was it for?");
            return Ok(());
        };
        let Ok(amount) = validate_positive(amount, "amount") else {
            reporter.push(format!(
                "Expense skipped for {name}: amount must be greater than zero"
            ));
            return Ok(());
        };
        let category = match category.trim() {
            "" => DEFAULT_EXPENSE_CATEGORY.to_string(),
            c => c.to_lowercase(),
        };

        let expense = self
            .store
            .insert_expense(NewExpense {
                workspace_id,
                name: name.to_string(),
                amount: bd(amount),
                category,
            })
            .await?;

        reporter.push(format!(
            "Expense ✅ {} {} ({})",
            expense.name,
            self.settings.format_money(&expense.amount),
            expense.category
        ));
        Ok(())
    }

    /// `direction` is `1.0` for stock coming in and `-1.0` for stock going out.
    async fn adjust_stock(
        &self,
        workspace: &mut PlanGate,
        product_name: Option<&str>,
        quantity: Option<f64>,
        direction: f64,
        reporter: &mut Reporter,
    ) -> Result<(), StoreError> {
        let Some(name) = product_name else {
            reporter.push("Stock update skipped: which product?");
            return Ok(());
        };
        let Ok(quantity) = validate_positive(quantity, "quantity") else {
            reporter.push(format!(
                "Stock update skipped for {name}: quantity must be greater than zero"
            ));
            return Ok(());
        };

        let ResolvedProduct { product, .. } = self.resolve(workspace, name, reporter).await?;
        let workspace_id = workspace.workspace_id();
        let delta = direction * quantity;

        let balance = self
            .store
            .apply_inventory_delta(workspace_id, product.id, delta)
            .await?;
        let reason = if delta > 0.0 {
            REASON_PURCHASE
        } else {
            REASON_REMOVAL
        };
        self.log_movement(workspace_id, product.id, delta, reason).await;

        let sign = if delta > 0.0 { "+" } else { "-" };
        let mut line = format!(
            "Stock ✅ {sign}{} {} (stock: {})",
            format_quantity(quantity),
            product.name,
            format_quantity(balance)
        );
        if delta < 0.0 && balance <= product.reorder_threshold {
            line.push_str(LOW_STOCK_SUFFIX);
        }
        reporter.push(line);
        Ok(())
    }

    async fn create_product(
        &self,
        workspace: &mut PlanGate,
        product_name: Option<&str>,
        reorder_threshold: Option<f64>,
        reporter: &mut Reporter,
    ) -> Result<(), StoreError> {
        let Some(name) = product_name else {
            reporter.push("Product skipped: what is the product called?");
            return Ok(());
        };

        let product = self.resolver.create(workspace, name, reorder_threshold).await?;
        reporter.push(format!(
            "Product ✅ {} (reorder at {})",
            product.name,
            format_quantity(product.reorder_threshold)
        ));
        Ok(())
    }

    async fn report_analytics(
        &self,
        workspace_id: Uuid,
        metric: AnalyticsMetric,
        period: AnalyticsPeriod,
        payment_split: bool,
        reporter: &mut Reporter,
    ) -> Result<(), StoreError> {
        let top_limit = (metric == AnalyticsMetric::TopProducts)
            .then_some(self.settings.top_products_limit);
        let snapshot = self
            .analytics
            .snapshot(workspace_id, period, top_limit, Local::now())
            .await?;

        reporter.push(render_line(metric, &snapshot, payment_split, &self.settings));
        reporter.set_analytics(snapshot);
        Ok(())
    }
}

fn premium_denial(command: &Command) -> String {
    let feature = match command {
        Command::SendEmail { .. } => "Email sending",
        Command::CreateInvoice { .. } => "Invoice creation",
        Command::CreateReceipt { .. } => "Receipt creation",
        _ => "This action",
    };
    format!("🔒 {feature} is a premium feature. Upgrade your plan to use it.")
}
