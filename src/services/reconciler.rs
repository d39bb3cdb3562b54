use std::{collections::HashMap, sync::Arc, time::Duration};

use serde_json::json;
use tracing::{debug, info, instrument};

use crate::{
    errors::ServiceError,
    models::{inventory::INVENTORY_COLUMNS, InventoryRecord},
    store::{select_as, Filter, Select, Table, TableStore},
};

/// How a reconciliation pass is folded into a cached inventory list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Patch cached rows by id, keeping their order; rows missing from the
    /// fresh read stay as cached
    PreserveOrder,
    /// Take the fresh read as-is
    Replace,
}

pub fn merge_inventory(
    cache: &[InventoryRecord],
    fresh: Vec<InventoryRecord>,
    mode: MergeMode,
) -> Vec<InventoryRecord> {
    match mode {
        MergeMode::Replace => fresh,
        MergeMode::PreserveOrder => {
            let mut by_id: HashMap<String, InventoryRecord> =
                fresh.into_iter().map(|r| (r.id.clone(), r)).collect();
            cache
                .iter()
                .map(|row| by_id.remove(&row.id).unwrap_or_else(|| row.clone()))
                .collect()
        }
    }
}

/// Recomputes `current_stock` for every inventory row and writes it back.
///
/// `net_movement` is maintained asynchronously by the store, so passes are
/// normally scheduled after a delay. One update per row, no transaction; the
/// first failed write ends the pass.
#[derive(Clone)]
pub struct InventoryReconciler {
    store: Arc<dyn TableStore>,
}

impl InventoryReconciler {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, delay: Duration) -> Result<Vec<InventoryRecord>, ServiceError> {
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }

        let query = Select::from(Table::Inventory).columns(INVENTORY_COLUMNS);
        let mut rows: Vec<InventoryRecord> = select_as(self.store.as_ref(), &query)
            .await
            .map_err(ServiceError::fetch)?;

        for row in rows.iter_mut() {
            let current = row.derived_current_stock().ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "current stock of inventory {} is out of range",
                    row.id
                ))
            })?;
            row.current_stock = Some(current);
            self.store
                .update(
                    Table::Inventory,
                    &Filter::eq("id", row.id.as_str()),
                    json!({ "current_stock": current }),
                )
                .await
                .map_err(ServiceError::write)?;
            debug!(id = %row.id, current_stock = current, "current stock written");
        }

        info!(rows = rows.len(), "inventory reconciled");
        Ok(rows)
    }
}
