use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::core::shared::models::{AnalyticsPeriod, PaymentStatus};
use crate::core::shared::utils::bd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsMetric {
    #[default]
    Profit,
    Revenue,
    Expenses,
    TopProducts,
}

impl AnalyticsMetric {
    pub fn from_loose(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        if lower.contains("top") || lower.contains("best") {
            Self::TopProducts
        } else if lower.contains("revenue") || lower.contains("sales") || lower.contains("income") {
            Self::Revenue
        } else if lower.contains("expense") || lower.contains("spend") {
            Self::Expenses
        } else {
            Self::Profit
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Receipt,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Invoice => "Invoice",
            Self::Receipt => "Receipt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    pub fn total(&self) -> BigDecimal {
        bd(self.quantity) * bd(self.unit_price)
    }
}

/// One extracted user intent. Serializes to the same `{"action": ...}` shape the
/// normalizer accepts, so normalizing a command that is already canonical is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    RecordSale {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<f64>,
        #[serde(default)]
        unit_price: f64,
        #[serde(default)]
        payment_status: PaymentStatus,
    },
    RecordExpense {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expense_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<f64>,
        category: String,
    },
    AddStock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<f64>,
    },
    RemoveStock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<f64>,
    },
    CreateProduct {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        product_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reorder_threshold: Option<f64>,
    },
    Analytics {
        metric: AnalyticsMetric,
        period: AnalyticsPeriod,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payment_split: Option<bool>,
    },
    SendEmail {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    CreateInvoice {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default)]
        items: Vec<LineItem>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        send_email: bool,
    },
    CreateReceipt {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        #[serde(default)]
        items: Vec<LineItem>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        send_email: bool,
    },
    Unknown {
        ask: String,
    },
}

impl Command {
    pub fn unknown(ask: impl Into<String>) -> Self {
        Self::Unknown { ask: ask.into() }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Intents that only paying workspaces may run.
    pub fn is_premium(&self) -> bool {
        matches!(
            self,
            Self::SendEmail { .. } | Self::CreateInvoice { .. } | Self::CreateReceipt { .. }
        )
    }

    pub fn action_name(&self) -> &'static str {
        match self {
            Self::RecordSale { .. } => "record_sale",
            Self::RecordExpense { .. } => "record_expense",
            Self::AddStock { .. } => "add_stock",
            Self::RemoveStock { .. } => "remove_stock",
            Self::CreateProduct { .. } => "create_product",
            Self::Analytics { .. } => "analytics",
            Self::SendEmail { .. } => "send_email",
            Self::CreateInvoice { .. } => "create_invoice",
            Self::CreateReceipt { .. } => "create_receipt",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action_name())
    }
}
