//! Diesel/Postgres backend. Expects a unique index on
//! `inventory_balances (workspace_id, product_id)`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Numeric, Uuid as DieselUuid};
use std::collections::HashMap;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::core::shared::models::{
    Expense, NewExpense, NewInventoryMovement, NewProduct, NewSale, PaymentStatus, Product, Sale,
    Workspace,
};
use crate::core::shared::schema::{
    expenses, inventory_balances, inventory_movements, products, sales, workspaces,
};
use crate::core::shared::utils::{bd, bd_to_f64, DbPool};

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = workspaces)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct WorkspaceRow {
    id: Uuid,
    name: String,
    plan: Option<String>,
    subscription_status: Option<String>,
    default_reorder_threshold: Option<BigDecimal>,
}

impl From<WorkspaceRow> for Workspace {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            plan: row.plan,
            subscription_status: row.subscription_status,
            default_reorder_threshold: row.default_reorder_threshold.as_ref().map(bd_to_f64),
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ProductRow {
    id: Uuid,
    workspace_id: Uuid,
    name: String,
    reorder_threshold: BigDecimal,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            name: row.name,
            reorder_threshold: bd_to_f64(&row.reorder_threshold),
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = sales)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SaleRow {
    id: Uuid,
    workspace_id: Uuid,
    product_id: Uuid,
    quantity_sold: BigDecimal,
    unit_price: BigDecimal,
    payment_status: String,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            product_id: row.product_id,
            quantity_sold: bd_to_f64(&row.quantity_sold),
            unit_price: row.unit_price,
            payment_status: PaymentStatus::from_loose(&row.payment_status),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = expenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ExpenseRow {
    id: Uuid,
    workspace_id: Uuid,
    name: String,
    amount: BigDecimal,
    category: String,
    created_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            name: row.name,
            amount: row.amount,
            category: row.category,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inventory_movements)]
struct MovementRow {
    id: Uuid,
    workspace_id: Uuid,
    product_id: Uuid,
    quantity_change: BigDecimal,
    reason: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, QueryableByName)]
struct BalanceRow {
    #[diesel(sql_type = Numeric)]
    quantity_on_hand: BigDecimal,
}

fn like_pattern(name: &str) -> String {
    let escaped = name
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}

#[async_trait]
impl Store for PgStore {
    async fn workspace(&self, workspace_id: Uuid) -> Result<Option<Workspace>, StoreError> {
        self.run(move |conn| {
            let row = workspaces::table
                .filter(workspaces::id.eq(workspace_id))
                .select(WorkspaceRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Workspace::from))
        })
        .await
    }

    async fn find_product_by_name(
        &self,
        workspace_id: Uuid,
        name: &str,
    ) -> Result<Option<Product>, StoreError> {
        let pattern = like_pattern(name);
        self.run(move |conn| {
            let row = products::table
                .filter(products::workspace_id.eq(workspace_id))
                .filter(products::name.ilike(pattern))
                .order(products::name.asc())
                .select(ProductRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Product::from))
        })
        .await
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = ProductRow {
            id: Uuid::new_v4(),
            workspace_id: product.workspace_id,
            name: product.name,
            reorder_threshold: bd(product.reorder_threshold),
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            let inserted = diesel::insert_into(products::table)
                .values(&row)
                .returning(ProductRow::as_returning())
                .get_result(conn)?;
            Ok(Product::from(inserted))
        })
        .await
    }

    async fn insert_sale(&self, sale: NewSale) -> Result<Sale, StoreError> {
        let row = SaleRow {
            id: Uuid::new_v4(),
            workspace_id: sale.workspace_id,
            product_id: sale.product_id,
            quantity_sold: bd(sale.quantity_sold),
            unit_price: sale.unit_price,
            payment_status: sale.payment_status.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            let inserted = diesel::insert_into(sales::table)
                .values(&row)
                .returning(SaleRow::as_returning())
                .get_result(conn)?;
            Ok(Sale::from(inserted))
        })
        .await
    }

    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
        let row = ExpenseRow {
            id: Uuid::new_v4(),
            workspace_id: expense.workspace_id,
            name: expense.name,
            amount: expense.amount,
            category: expense.category,
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            let inserted = diesel::insert_into(expenses::table)
                .values(&row)
                .returning(ExpenseRow::as_returning())
                .get_result(conn)?;
            Ok(Expense::from(inserted))
        })
        .await
    }

    async fn apply_inventory_delta(
        &self,
        workspace_id: Uuid,
        product_id: Uuid,
        delta: f64,
    ) -> Result<f64, StoreError> {
        self.run(move |conn| {
            let row: BalanceRow = sql_query(
                "INSERT INTO inventory_balances (id, workspace_id, product_id, quantity_on_hand, updated_at)
                 VALUES ($1, $2, $3, $4, NOW())
                 ON CONFLICT (workspace_id, product_id) DO UPDATE
                 SET quantity_on_hand = inventory_balances.quantity_on_hand + EXCLUDED.quantity_on_hand,
                     updated_at = NOW()
                 RETURNING quantity_on_hand",
            )
            .bind::<DieselUuid, _>(Uuid::new_v4())
            .bind::<DieselUuid, _>(workspace_id)
            .bind::<DieselUuid, _>(product_id)
            .bind::<Numeric, _>(bd(delta))
            .get_result(conn)?;
            Ok(bd_to_f64(&row.quantity_on_hand))
        })
        .await
    }

    async fn inventory_balance(
        &self,
        workspace_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<f64>, StoreError> {
        self.run(move |conn| {
            let qty: Option<BigDecimal> = inventory_balances::table
                .filter(inventory_balances::workspace_id.eq(workspace_id))
                .filter(inventory_balances::product_id.eq(product_id))
                .select(inventory_balances::quantity_on_hand)
                .first(conn)
                .optional()?;
            Ok(qty.as_ref().map(bd_to_f64))
        })
        .await
    }

    async fn insert_movement(&self, movement: NewInventoryMovement) -> Result<(), StoreError> {
        let row = MovementRow {
            id: Uuid::new_v4(),
            workspace_id: movement.workspace_id,
            product_id: movement.product_id,
            quantity_change: bd(movement.quantity_change),
            reason: movement.reason,
            created_at: Utc::now(),
        };
        self.run(move |conn| {
            diesel::insert_into(inventory_movements::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn sales_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sale>, StoreError> {
        self.run(move |conn| {
            let rows = sales::table
                .filter(sales::workspace_id.eq(workspace_id))
                .filter(sales::created_at.ge(since))
                .order(sales::created_at.asc())
                .select(SaleRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Sale::from).collect())
        })
        .await
    }

    async fn expenses_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Expense>, StoreError> {
        self.run(move |conn| {
            let rows = expenses::table
                .filter(expenses::workspace_id.eq(workspace_id))
                .filter(expenses::created_at.ge(since))
                .order(expenses::created_at.asc())
                .select(ExpenseRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Expense::from).collect())
        })
        .await
    }

    async fn product_names(
        &self,
        workspace_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, StoreError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = product_ids.to_vec();
        self.run(move |conn| {
            let rows: Vec<(Uuid, String)> = products::table
                .filter(products::workspace_id.eq(workspace_id))
                .filter(products::id.eq_any(ids))
                .select((products::id, products::name))
                .load(conn)?;
            Ok(rows.into_iter().collect())
        })
        .await
    }
}
