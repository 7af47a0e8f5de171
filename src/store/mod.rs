//! Row-level persistence for workspaces, products, balances and ledger facts.
//!
//! The interpreter only talks to [`Store`]. Inventory is adjusted exclusively
//! through [`Store::apply_inventory_delta`], which each backend implements as a
//! single atomic step so concurrent requests cannot lose updates.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::shared::models::{
    Expense, NewExpense, NewInventoryMovement, NewProduct, NewSale, Product, Sale, Workspace,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Task error: {0}")]
    Task(String),
    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn workspace(&self, workspace_id: Uuid) -> Result<Option<Workspace>, StoreError>;

    /// First product (by name, ascending) whose name contains `name`, ignoring case.
    async fn find_product_by_name(
        &self,
        workspace_id: Uuid,
        name: &str,
    ) -> Result<Option<Product>, StoreError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn insert_sale(&self, sale: NewSale) -> Result<Sale, StoreError>;

    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, StoreError>;

    /// Adds `delta` to the product's on-hand quantity and returns the new balance.
    /// A missing balance row is created with `delta` as its initial value.
    async fn apply_inventory_delta(
        &self,
        workspace_id: Uuid,
        product_id: Uuid,
        delta: f64,
    ) -> Result<f64, StoreError>;

    async fn inventory_balance(
        &self,
        workspace_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<f64>, StoreError>;

    async fn insert_movement(&self, movement: NewInventoryMovement) -> Result<(), StoreError>;

    async fn sales_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sale>, StoreError>;

    async fn expenses_since(
        &self,
        workspace_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Expense>, StoreError>;

    async fn product_names(
        &self,
        workspace_id: Uuid,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, String>, StoreError>;
}
