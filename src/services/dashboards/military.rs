use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    auth::NavigationState,
    errors::ServiceError,
    models::{
        base::BASE_INFO_COLUMNS, inventory::PERSONNEL_INVENTORY_COLUMNS, Base, InventoryRecord,
    },
    store::{select_single, Select, Table, TableStore},
    tracing::{log_error, ErrorKind},
};

use super::load_section;

/// An inventory line as personnel see it
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ShelfItem {
    pub category: String,
    pub model: String,
    pub stock: i64,
}

impl From<InventoryRecord> for ShelfItem {
    fn from(record: InventoryRecord) -> Self {
        Self {
            category: record.category,
            model: record.model,
            stock: record.stock,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct MilitaryView {
    pub name: Option<String>,
    /// Code, name and location of the user's base
    pub base: Option<Base>,
    pub inventory: Vec<ShelfItem>,
}

/// Read-only view of the user's own base
#[derive(Clone)]
pub struct MilitaryService {
    store: Arc<dyn TableStore>,
}

impl MilitaryService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn load(&self, nav: &NavigationState) -> MilitaryView {
        let mut view = MilitaryView {
            name: nav.name.clone(),
            ..Default::default()
        };
        let Some(base_id) = nav.base_id.as_deref() else {
            return view;
        };

        let base_query = Select::from(Table::Bases)
            .columns(BASE_INFO_COLUMNS)
            .eq("id", base_id);
        match select_single::<Base>(self.store.as_ref(), &base_query).await {
            Ok(base) => view.base = Some(base),
            Err(e) => log_error(&ServiceError::fetch(e), ErrorKind::Fetch, Some("base info")),
        }

        let inventory_query = Select::from(Table::Inventory)
            .columns(PERSONNEL_INVENTORY_COLUMNS)
            .eq("base_id", base_id);
        let records: Vec<InventoryRecord> =
            load_section(self.store.as_ref(), &inventory_query, "inventory").await;
        view.inventory = records.into_iter().map(ShelfItem::from).collect();

        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{demo, MockTableStore, StoreError};

    fn nav(base_id: Option<&str>) -> NavigationState {
        NavigationState {
            service_id: Some("MP-0342".into()),
            role: Some("Military Personnel".into()),
            base_id: base_id.map(str::to_string),
            name: Some("L. Park".into()),
        }
    }

    #[tokio::test]
    async fn shows_own_base_and_its_shelf() {
        let service = MilitaryService::new(Arc::new(demo::seeded_store()));
        let view = service.load(&nav(Some("3"))).await;

        let base = view.base.unwrap();
        assert_eq!(base.code, "SEN");
        assert_eq!(base.name, "Camp Sentinel");
        assert_eq!(view.inventory.len(), 2);
        assert_eq!(
            view.inventory[0],
            ShelfItem {
                category: "Vehicle".into(),
                model: "LAV-25".into(),
                stock: 6,
            }
        );
    }

    #[tokio::test]
    async fn missing_base_reads_nothing() {
        let mut store = MockTableStore::new();
        store.expect_select().times(0);

        let view = MilitaryService::new(Arc::new(store)).load(&nav(None)).await;
        assert!(view.base.is_none());
        assert!(view.inventory.is_empty());
        assert_eq!(view.name.as_deref(), Some("L. Park"));
    }

    #[tokio::test]
    async fn failed_reads_leave_sections_empty() {
        let mut store = MockTableStore::new();
        store
            .expect_select()
            .times(2)
            .returning(|_| Err(StoreError::Request("offline".into())));

        let view = MilitaryService::new(Arc::new(store)).load(&nav(Some("3"))).await;
        assert!(view.base.is_none());
        assert!(view.inventory.is_empty());
    }
}
