//! In-process backend used by tests and by `database.backend = "memory"` for local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::core::shared::models::{
    Expense, InventoryMovement, NewExpense, NewInventoryMovement, NewProduct, NewSale, Product,
    Sale, Workspace,
};

#[derive(Debug, Default)]
struct Tables {
    workspaces: HashMap<Uuid, Workspace>,
    products: Vec<Product>,
    balances: HashMap<(Uuid, Uuid), f64>,
    movements: Vec<InventoryMovement>,
    sales: Vec<Sale>,
    expenses: Vec<Expense>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
    fail_movements: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every ledger write (product, sale, expense, balance) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes only the movement audit insert fail.
    pub fn set_fail_movements(&self, fail: bool) {
        self.fail_movements.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("store is read-only".to_string()));
        }
        Ok(())
    }

    pub async fn put_workspace(&self, workspace: Workspace) {
        self.tables
            .write()
            .await
            .workspaces
            .insert(workspace.id, workspace);
    }

    /// Creates a product with an initial balance, bypassing the movement log.
    pub async fn seed_product(
        &self,
        workspace_id: Uuid,
        name: &str,
        reorder_threshold: f64,
        on_hand: f64,
    ) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            workspace_id,
            name: name.to_string(),
            reorder_threshold,
        };
        let mut tables = self.tables.write().await;
        tables.products.push(product.clone());
        tables.balances.insert((workspace_id, product.id), on_hand);
        product
    }

    pub async fn seed_sale(&self, sale: NewSale, created_at: DateTime<Utc>) -> Sale {
        let sale = Sale {
            id: Uuid::new_v4(),
            workspace_id: sale.workspace_id,
            product_id: sale.product_id,
            quantity_sold: sale.quantity_sold,
            unit_price: sale.unit_price,
            payment_status: sale.payment_status,
            created_at,
        };
        self.tables.write().await.sales.push(sale.clone());
        sale
    }

    pub async fn seed_expense(&self, expense: NewExpense, created_at: DateTime<Utc>) -> Expense {
        let expense = Expense {
            id: Uuid::new_v4(),
            workspace_id: expense.workspace_id,
            name: expense.name,
            amount: expense.amount,
            category: expense.category,
            created_at,
        };
        self.tables.write().await.expenses.push(expense.clone());
        expense
    }

    pub async fn products(&self, workspace_id: Uuid) -> Vec<Product> {
        self.tables
            .read()
            .await
            .products
            .iter()
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub async fn sales(&self, workspace_id: Uuid) -> Vec<Sale> {
        self.tables
            .read()
            .await
            .sales
            .iter()
            .filter(|s| s.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub async fn expenses(&self, workspace_id: Uuid) -> Vec<Expense> {
        self.tables
            .read()
            .await
            .expenses
            .iter()
            .filter(|e| e.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    pub async fn movements(&self, workspace_id: Uuid) -> Vec<InventoryMovement> {
        self.tables
            .read()
            .await
            .movements
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn workspace(&self, workspace_id: Uuid) -> Result<Option<Workspace>, StoreError> {
        Ok(self.tables.read().await.workspaces.get(&workspace_id).cloned())
    }

    async fn find_product_by_name(
        &self,
        workspace_id: Uuid,
        name: &str,
    ) -> Result<Option<Product>, StoreError> {
        let needle = name.to_lowercase();
        let tables = self.tables.read().await;
        let mut matches: Vec<&Product> = tables
            .products
            .iter()
            .filter(|p| p.workspace_id == workspace_id && p.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matches.first().map(|p| (*p).clone()))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.check_writable()?;
        let product = Product {
            id: Uuid::new_v4(),
            workspace_id: product.workspace_id,
            name: product.name,
            reorder_threshold: product.reorder_threshold,
        };
        self.tables.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn insert_sale(&self, sale: NewSale) -> Result<Sale, StoreError> {
        self.check_writable()?;
        Ok(self.seed_sale(sale, Utc::now()).await)
    }

    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
        self.check_writable()?;
        Ok(self.seed_expense(expense, Utc::now()).await)
    }

    async fn apply_inventory_delta(
        &self,
        workspace_id: Uuid,
        product_id: Uuid,
        delta: f64,
    ) -> Result<f64, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let balance = tables
            .balances
            .entry((workspace_id, product_id))
            .or_insert(0.0);
        *balance += delta;
        Ok(*balance)
    }

    async fn inventory_balance(
        &self,
        workspace_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<f64>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .balances
            .get(&(workspace_id, product_id))
            .copied())
    }

    async fn insert_movement(&self, movement: NewInventoryMovement) -> Result<(), StoreError> {
        if self.fail_movements.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("movement log unavailable".to_string()));
        }
        self.check_writable()?;
        self.tables.write().await.movements.push(InventoryMovement {
            id: Uuid::new_v4(),
            workspace_id: movement.workspace_id,
            product_id: movement.product_id,
            quantity_change: movement.quantity_change,
            reason: movement.reason,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn sales_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sale>, StoreError> {
        Ok(self
            .sales(workspace_id)
            .await
            .into_iter()
            .filter(|s| s.created_at >= since)
            .collect())
    }

    async fn expenses_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Expense>, StoreError> {
        Ok(self
            .expenses(workspace_id)
            .await
            .into_iter()
            .filter(|e| e.created_at >= since)
            .collect())
    }

    async fn product_names(
        &self,
        workspace_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .products
            .iter()
            .filter(|p| p.workspace_id == workspace_id && product_ids.contains(&p.id))
            .map(|p| (p.id, p.name.clone()))
            .collect())
    }
}
