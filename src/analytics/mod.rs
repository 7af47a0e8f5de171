use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{parse_workspace_id, ChatError};
use crate::core::config::InterpreterConfig;
use crate::core::shared::models::{AnalyticsPeriod, Expense, PaymentStatus, Sale};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::format_quantity;
use crate::interpreter::command::AnalyticsMetric;
use crate::store::{Store, StoreError};

const INVENTORY_CATEGORIES: &[&str] = &["inventory", "inventory_purchase"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub revenue: BigDecimal,
}

/// Money fields are exact decimals and serialize as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub period: AnalyticsPeriod,
    pub period_start: DateTime<Utc>,
    pub revenue_paid: BigDecimal,
    pub revenue_unpaid: BigDecimal,
    pub revenue_total: BigDecimal,
    pub expenses_total: BigDecimal,
    pub inventory_purchases: BigDecimal,
    pub profit_after_inventory_purchases: BigDecimal,
    pub profit_operational: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_products: Option<Vec<TopProduct>>,
}

pub fn is_inventory_category(category: &str) -> bool {
    let category = category.trim();
    INVENTORY_CATEGORIES
        .iter()
        .any(|c| category.eq_ignore_ascii_case(c))
}

pub fn summarize(
    period: AnalyticsPeriod,
    period_start: DateTime<Utc>,
    sales: &[Sale],
    expenses: &[Expense],
) -> AnalyticsSnapshot {
    let mut revenue_paid = BigDecimal::zero();
    let mut revenue_unpaid = BigDecimal::zero();
    for sale in sales {
        match sale.payment_status {
            PaymentStatus::Paid => revenue_paid += sale.revenue(),
            PaymentStatus::Unpaid => revenue_unpaid += sale.revenue(),
        }
    }
    let revenue_total = &revenue_paid + &revenue_unpaid;

    let expenses_total: BigDecimal = expenses.iter().map(|e| &e.amount).sum();
    let inventory_purchases: BigDecimal = expenses
        .iter()
        .filter(|e| is_inventory_category(&e.category))
        .map(|e| &e.amount)
        .sum();

    let profit_after_inventory_purchases = &revenue_total - &expenses_total;
    let profit_operational = &revenue_total - (&expenses_total - &inventory_purchases);

    AnalyticsSnapshot {
        period,
        period_start,
        revenue_paid,
        revenue_unpaid,
        revenue_total,
        expenses_total,
        inventory_purchases,
        profit_after_inventory_purchases,
        profit_operational,
        top_products: None,
    }
}

/// Groups sales by product and ranks them by revenue, highest first.
/// Products without a known name are shown by id.
pub fn rank_products(sales: &[Sale], names: &HashMap<Uuid, String>, limit: usize) -> Vec<TopProduct> {
    let mut totals: HashMap<Uuid, (f64, BigDecimal)> = HashMap::new();
    for sale in sales {
        let entry = totals
            .entry(sale.product_id)
            .or_insert_with(|| (0.0, BigDecimal::zero()));
        entry.0 += sale.quantity_sold;
        entry.1 += sale.revenue();
    }

    let mut ranked: Vec<TopProduct> = totals
        .into_iter()
        .map(|(product_id, (quantity, revenue))| TopProduct {
            product_id,
            name: names
                .get(&product_id)
                .cloned()
                .unwrap_or_else(|| product_id.to_string()),
            quantity,
            revenue,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

/// One reply line for an analytics command.
pub fn render_line(
    metric: AnalyticsMetric,
    snapshot: &AnalyticsSnapshot,
    payment_split: bool,
    settings: &InterpreterConfig,
) -> String {
    let money = |v: &BigDecimal| settings.format_money(v);
    let label = snapshot.period.label();

    match metric {
        AnalyticsMetric::Profit => format!(
            "Profit ({label}) 📊 after inventory purchases: {} | operational: {}",
            money(&snapshot.profit_after_inventory_purchases),
            money(&snapshot.profit_operational)
        ),
        AnalyticsMetric::Revenue => {
            let mut line = format!("Revenue ({label}) 📊 {}", money(&snapshot.revenue_total));
            if payment_split {
                line.push_str(&format!(
                    " (paid {} / unpaid {})",
                    money(&snapshot.revenue_paid),
                    money(&snapshot.revenue_unpaid)
                ));
            }
            line
        }
        AnalyticsMetric::Expenses => format!(
            "Expenses ({label}) 📊 {} (inventory purchases {})",
            money(&snapshot.expenses_total),
            money(&snapshot.inventory_purchases)
        ),
        AnalyticsMetric::TopProducts => match snapshot.top_products.as_deref() {
            Some(top) if !top.is_empty() => {
                let ranked: Vec<String> = top
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        format!(
                            "{}. {} ({} sold, {})",
                            i + 1,
                            p.name,
                            format_quantity(p.quantity),
                            money(&p.revenue)
                        )
                    })
                    .collect();
                format!("Top products ({label}) 📊 {}", ranked.join("; "))
            }
            _ => format!("Top products ({label}) 📊 no sales yet"),
        },
    }
}

pub struct AnalyticsAggregator {
    store: Arc<dyn Store>,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Totals since the start of `period`. With `top_limit`, also ranks products from the same sales.
    pub async fn snapshot(
        &self,
        workspace_id: Uuid,
        period: AnalyticsPeriod,
        top_limit: Option<usize>,
        now: DateTime<Local>,
    ) -> Result<AnalyticsSnapshot, StoreError> {
        let start = period.start(now);
        let sales = self.store.sales_since(workspace_id, start).await?;
        let expenses = self.store.expenses_since(workspace_id, start).await?;

        let mut snapshot = summarize(period, start, &sales, &expenses);
        if let Some(limit) = top_limit {
            snapshot.top_products = Some(self.rank(workspace_id, &sales, limit).await?);
        }
        Ok(snapshot)
    }

    pub async fn top_products(
        &self,
        workspace_id: Uuid,
        period: AnalyticsPeriod,
        limit: usize,
        now: DateTime<Local>,
    ) -> Result<Vec<TopProduct>, StoreError> {
        let sales = self
            .store
            .sales_since(workspace_id, period.start(now))
            .await?;
        self.rank(workspace_id, &sales, limit).await
    }

    async fn rank(
        &self,
        workspace_id: Uuid,
        sales: &[Sale],
        limit: usize,
    ) -> Result<Vec<TopProduct>, StoreError> {
        let mut ids: Vec<Uuid> = sales.iter().map(|s| s.product_id).collect();
        ids.sort();
        ids.dedup();
        let names = self.store.product_names(workspace_id, &ids).await?;
        Ok(rank_products(sales, &names, limit))
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub workspace_id: Option<String>,
    pub period: Option<String>,
    pub limit: Option<usize>,
}

impl AnalyticsQuery {
    fn period(&self) -> AnalyticsPeriod {
        self.period
            .as_deref()
            .map(AnalyticsPeriod::from_loose)
            .unwrap_or_default()
    }
}

pub fn configure_analytics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analytics/summary", get(handle_summary))
        .route("/api/analytics/top-products", get(handle_top_products))
}

async fn handle_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsSnapshot>, ChatError> {
    let workspace_id = parse_workspace_id(query.workspace_id.as_deref())?;
    let snapshot = AnalyticsAggregator::new(state.store.clone())
        .snapshot(workspace_id, query.period(), None, Local::now())
        .await?;
    Ok(Json(snapshot))
}

async fn handle_top_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Value>, ChatError> {
    let workspace_id = parse_workspace_id(query.workspace_id.as_deref())?;
    let period = query.period();
    let limit = query
        .limit
        .filter(|l| *l > 0)
        .unwrap_or(state.config.interpreter.top_products_limit);

    let top = AnalyticsAggregator::new(state.store.clone())
        .top_products(workspace_id, period, limit, Local::now())
        .await?;

    Ok(Json(json!({
        "ok": true,
        "period": period,
        "topProducts": top,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::models::{NewExpense, NewSale};
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sale(product_id: Uuid, qty: f64, price: &str, status: PaymentStatus) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            workspace_id: Uuid::nil(),
            product_id,
            quantity_sold: qty,
            unit_price: dec(price),
            payment_status: status,
            created_at: Utc::now(),
        }
    }

    fn expense(amount: &str, category: &str) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            workspace_id: Uuid::nil(),
            name: "x".to_string(),
            amount: dec(amount),
            category: category.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_inventory_categories() {
        assert!(is_inventory_category("inventory"));
        assert!(is_inventory_category("Inventory_Purchase"));
        assert!(!is_inventory_category("inventory stuff"));
        assert!(!is_inventory_category("general"));
    }

    #[test]
    fn test_summarize_profit_identities() {
        let p = Uuid::new_v4();
        let sales = vec![
            sale(p, 1.0, "65.16", PaymentStatus::Paid),
            sale(p, 1.0, "78.87", PaymentStatus::Unpaid),
        ];
        let expenses = vec![expense("9.39", "general"), expense("0.1", "INVENTORY")];
        let snap = summarize(AnalyticsPeriod::Month, Utc::now(), &sales, &expenses);

        assert_eq!(snap.revenue_paid, dec("65.16"));
        assert_eq!(snap.revenue_unpaid, dec("78.87"));
        assert_eq!(snap.revenue_total, dec("144.03"));
        assert_eq!(snap.expenses_total, dec("9.49"));
        assert_eq!(snap.inventory_purchases, dec("0.1"));
        assert_eq!(snap.profit_after_inventory_purchases, dec("134.54"));
        assert_eq!(snap.profit_operational, dec("134.64"));
        assert_eq!(
            &snap.profit_after_inventory_purchases + &snap.expenses_total,
            snap.revenue_total
        );
    }

    #[test]
    fn test_profit_identity_holds_across_many_prices() {
        let p = Uuid::new_v4();
        let sales: Vec<Sale> = (1..=40)
            .map(|cents| {
                let price = format!("{}.{:02}", cents * 7, (cents * 37) % 100);
                sale(p, 0.5 * cents as f64, &price, PaymentStatus::Paid)
            })
            .collect();
        let expenses: Vec<Expense> = (1..=25)
            .map(|cents| expense(&format!("{}.{:02}", cents * 3, (cents * 13) % 100), "general"))
            .collect();
        let snap = summarize(AnalyticsPeriod::Today, Utc::now(), &sales, &expenses);

        assert_eq!(
            &snap.profit_after_inventory_purchases + &snap.expenses_total,
            snap.revenue_total
        );
    }

    #[test]
    fn test_snapshot_serializes_money_as_decimal_strings() {
        let snap = summarize(
            AnalyticsPeriod::Today,
            Utc::now(),
            &[sale(Uuid::new_v4(), 1.0, "65.16", PaymentStatus::Paid)],
            &[expense("9.39", "general")],
        );
        let json = serde_json::to_value(&snap).unwrap();

        assert_eq!(json["revenueTotal"], "65.16");
        assert_eq!(json["expensesTotal"], "9.39");
        assert_eq!(json["profitAfterInventoryPurchases"], "55.77");
        assert!(json.get("topProducts").is_none());
    }

    #[test]
    fn test_rank_products_orders_by_revenue_and_falls_back_to_id() {
        let rice = Uuid::new_v4();
        let beans = Uuid::new_v4();
        let mystery = Uuid::new_v4();
        let sales = vec![
            sale(rice, 2.0, "4", PaymentStatus::Paid),
            sale(beans, 1.0, "20", PaymentStatus::Paid),
            sale(rice, 3.0, "4", PaymentStatus::Unpaid),
            sale(mystery, 1.0, "1", PaymentStatus::Paid),
        ];
        let names = HashMap::from([
            (rice, "Rice".to_string()),
            (beans, "Beans".to_string()),
        ]);

        let top = rank_products(&sales, &names, 5);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "Rice");
        assert_eq!(top[0].quantity, 5.0);
        assert_eq!(top[0].revenue, dec("20"));
        assert_eq!(top[1].name, "Beans");
        assert_eq!(top[2].name, mystery.to_string());

        assert_eq!(rank_products(&sales, &names, 1).len(), 1);
    }

    #[test]
    fn test_render_profit_line_two_decimals() {
        let snap = summarize(
            AnalyticsPeriod::Month,
            Utc::now(),
            &[sale(Uuid::new_v4(), 2.0, "4", PaymentStatus::Paid)],
            &[expense("1.25", "inventory")],
        );
        let line = render_line(
            AnalyticsMetric::Profit,
            &snap,
            false,
            &InterpreterConfig::default(),
        );
        assert_eq!(
            line,
            "Profit (this month) 📊 after inventory purchases: $6.75 | operational: $8.00"
        );
    }

    #[test]
    fn test_render_revenue_with_split() {
        let snap = summarize(
            AnalyticsPeriod::Today,
            Utc::now(),
            &[
                sale(Uuid::new_v4(), 1.0, "3", PaymentStatus::Paid),
                sale(Uuid::new_v4(), 1.0, "2", PaymentStatus::Unpaid),
            ],
            &[],
        );
        let line = render_line(
            AnalyticsMetric::Revenue,
            &snap,
            true,
            &InterpreterConfig::default(),
        );
        assert_eq!(line, "Revenue (today) 📊 $5.00 (paid $3.00 / unpaid $2.00)");
    }

    #[tokio::test]
    async fn test_aggregator_respects_period_start() {
        let store = Arc::new(MemoryStore::new());
        let ws = Uuid::new_v4();
        let product = store.seed_product(ws, "Rice", 5.0, 10.0).await;
        let now = Local::now();

        let new_sale = NewSale {
            workspace_id: ws,
            product_id: product.id,
            quantity_sold: 2.0,
            unit_price: dec("4"),
            payment_status: PaymentStatus::Paid,
        };
        store.seed_sale(new_sale.clone(), Utc::now()).await;
        store
            .seed_sale(new_sale, AnalyticsPeriod::Month.start(now) - Duration::days(1))
            .await;
        store
            .seed_expense(
                NewExpense {
                    workspace_id: ws,
                    name: "transport".to_string(),
                    amount: dec("3"),
                    category: "general".to_string(),
                },
                Utc::now(),
            )
            .await;

        let snap = AnalyticsAggregator::new(store.clone())
            .snapshot(ws, AnalyticsPeriod::Month, Some(5), now)
            .await
            .unwrap();

        assert_eq!(snap.revenue_total, dec("8"));
        assert_eq!(snap.expenses_total, dec("3"));
        let top = snap.top_products.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Rice");
    }
}
