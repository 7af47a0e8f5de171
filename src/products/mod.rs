use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::billing::PlanGate;
use crate::core::shared::models::{NewProduct, Product};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProduct {
    pub product: Product,
    pub created: bool,
}

/// Explicit value if usable, then the workspace default, then the configured fallback.
pub fn choose_threshold(explicit: Option<f64>, workspace_default: Option<f64>, fallback: f64) -> f64 {
    let usable = |v: &f64| v.is_finite() && *v >= 0.0;
    explicit
        .filter(usable)
        .or_else(|| workspace_default.filter(usable))
        .unwrap_or(fallback)
}

pub struct EntityResolver {
    store: Arc<dyn Store>,
    default_threshold: f64,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn Store>, default_threshold: f64) -> Self {
        Self {
            store,
            default_threshold,
        }
    }

    /// Finds the first product whose name contains `name` (case-insensitive,
    /// alphabetical) or creates one. The workspace row is only read when creating.
    pub async fn resolve(
        &self,
        workspace: &mut PlanGate,
        name: &str,
        explicit_threshold: Option<f64>,
    ) -> Result<ResolvedProduct, StoreError> {
        let name = name.trim();
        if let Some(product) = self
            .store
            .find_product_by_name(workspace.workspace_id(), name)
            .await?
        {
            return Ok(ResolvedProduct {
                product,
                created: false,
            });
        }

        let product = self.create(workspace, name, explicit_threshold).await?;
        Ok(ResolvedProduct {
            product,
            created: true,
        })
    }

    pub async fn create(
        &self,
        workspace: &mut PlanGate,
        name: &str,
        explicit_threshold: Option<f64>,
    ) -> Result<Product, StoreError> {
        let workspace_default = workspace
            .workspace()
            .await?
            .and_then(|w| w.default_reorder_threshold);
        let reorder_threshold =
            choose_threshold(explicit_threshold, workspace_default, self.default_threshold);

        let workspace_id = workspace.workspace_id();
        let product = self
            .store
            .insert_product(NewProduct {
                workspace_id,
                name: name.trim().to_string(),
                reorder_threshold,
            })
            .await?;
        info!(
            "Created product '{}' ({}) in workspace {}",
            product.name, product.id, workspace_id
        );
        Ok(product)
    }
}
