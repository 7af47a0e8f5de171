use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::utils::bd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Paid,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
        }
    }

    /// Anything other than an explicit "unpaid" counts as paid.
    pub fn from_loose(s: &str) -> Self {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "unpaid" | "not_paid" | "credit" | "on_credit" | "owed" | "owes" | "pending" => Self::Unpaid,
            _ => Self::Paid,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    #[default]
    Today,
    Month,
}

impl AnalyticsPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Month => "this month",
        }
    }

    pub fn from_loose(s: &str) -> Self {
        if s.to_lowercase().contains("month") {
            Self::Month
        } else {
            Self::Today
        }
    }

    /// Local midnight today, or local midnight on the first of the current month.
    pub fn start(&self, now: DateTime<Local>) -> DateTime<Utc> {
        let today = now.date_naive();
        let date = match self {
            Self::Today => today,
            Self::Month => NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today),
        };
        let midnight = date.and_time(NaiveTime::MIN);
        Local
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub plan: Option<String>,
    pub subscription_status: Option<String>,
    pub default_reorder_threshold: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub reorder_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub workspace_id: Uuid,
    pub name: String,
    pub reorder_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub product_id: Uuid,
    pub quantity_sold: f64,
    pub unit_price: BigDecimal,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn revenue(&self) -> BigDecimal {
        bd(self.quantity_sold) * &self.unit_price
    }
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub workspace_id: Uuid,
    pub product_id: Uuid,
    pub quantity_sold: f64,
    pub unit_price: BigDecimal,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub amount: BigDecimal,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub workspace_id: Uuid,
    pub name: String,
    pub amount: BigDecimal,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub product_id: Uuid,
    pub quantity_change: f64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInventoryMovement {
    pub workspace_id: Uuid,
    pub product_id: Uuid,
    pub quantity_change: f64,
    pub reason: String,
}
