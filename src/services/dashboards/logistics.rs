use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    auth::NavigationState,
    models::{
        consignment::LOGISTICS_CONSIGNMENT_COLUMNS, inventory::LOGISTICS_INVENTORY_COLUMNS,
        ConsignmentStatus, ConsignmentTicket, InventoryRecord,
    },
    store::{Select, Table, TableStore},
};

use super::load_section;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockLine {
    #[serde(flatten)]
    pub record: InventoryRecord,
    /// `current_stock` when set and non-zero, else `stock`
    pub display_stock: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketLine {
    #[serde(flatten)]
    pub ticket: ConsignmentTicket,
    pub display_status: ConsignmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct LogisticsView {
    pub name: Option<String>,
    pub inventory: Vec<StockLine>,
    pub consignments: Vec<TicketLine>,
    pub item_count: usize,
    pub ticket_count: usize,
}

/// Stock and outgoing tickets of the officer's base
#[derive(Clone)]
pub struct LogisticsService {
    store: Arc<dyn TableStore>,
}

impl LogisticsService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn load(&self, nav: &NavigationState) -> LogisticsView {
        let mut view = LogisticsView {
            name: nav.name.clone(),
            ..Default::default()
        };
        let Some(base_id) = nav.base_id.as_deref() else {
            return view;
        };

        let inventory_query = Select::from(Table::Inventory)
            .columns(LOGISTICS_INVENTORY_COLUMNS)
            .eq("base_id", base_id);
        let records: Vec<InventoryRecord> =
            load_section(self.store.as_ref(), &inventory_query, "inventory").await;
        view.inventory = records
            .into_iter()
            .map(|record| StockLine {
                display_stock: record.display_stock(),
                record,
            })
            .collect();

        let ticket_query = Select::from(Table::Consignment)
            .columns(LOGISTICS_CONSIGNMENT_COLUMNS)
            .eq("from_base", base_id);
        let tickets: Vec<ConsignmentTicket> =
            load_section(self.store.as_ref(), &ticket_query, "consignments").await;
        view.consignments = tickets
            .into_iter()
            .map(|ticket| TicketLine {
                display_status: ticket.display_status(),
                ticket,
            })
            .collect();

        view.item_count = view.inventory.len();
        view.ticket_count = view.consignments.len();
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, MockTableStore};
    use serde_json::json;

    fn nav(base_id: Option<&str>) -> NavigationState {
        NavigationState {
            service_id: Some("LO-0215".into()),
            role: Some("Logistics Officer".into()),
            base_id: base_id.map(str::to_string),
            name: Some("O. Saleh".into()),
        }
    }

    #[tokio::test]
    async fn lists_base_stock_and_outgoing_tickets() {
        let store = InMemoryStore::new()
            .with_rows(
                Table::Inventory,
                vec![
                    json!({ "id": 1, "base_id": 4, "category": "Medical", "model": "Kit", "stock": 10, "current_stock": 0 }),
                    json!({ "id": 2, "base_id": 4, "category": "Ammo", "model": "7.62", "stock": 5, "current_stock": 8 }),
                    json!({ "id": 3, "base_id": 2, "category": "Ammo", "model": "5.56", "stock": 1 }),
                ],
            )
            .with_rows(
                Table::Consignment,
                vec![
                    json!({ "ticket_id": 7, "from_base": 4, "to_base": 2, "status": null }),
                    json!({ "ticket_id": 8, "from_base": 2, "to_base": 4, "status": "expired" }),
                ],
            );

        let view = LogisticsService::new(Arc::new(store)).load(&nav(Some("4"))).await;

        assert_eq!(view.item_count, 2);
        assert_eq!(view.inventory[0].display_stock, 10);
        assert_eq!(view.inventory[1].display_stock, 8);
        assert_eq!(view.ticket_count, 1);
        assert_eq!(view.consignments[0].ticket.ticket_id, "7");
        assert_eq!(view.consignments[0].display_status, ConsignmentStatus::Assigned);
    }

    #[tokio::test]
    async fn missing_base_gives_an_empty_view() {
        let mut store = MockTableStore::new();
        store.expect_select().times(0);

        let view = LogisticsService::new(Arc::new(store)).load(&nav(None)).await;
        assert_eq!(view.item_count, 0);
        assert_eq!(view.ticket_count, 0);
    }
}
