use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::NavigationState,
    errors::ServiceError,
    models::{
        inventory::COMMANDER_INVENTORY_COLUMNS, user::OFFICER_COLUMNS, Base, ConsignmentStatus,
        ConsignmentTicket, CreateConsignmentRequest, InventoryRecord, NewConsignment, Role, UserRow,
    },
    store::{decode_rows, Select, Table, TableStore},
    tracing::{log_error, ErrorKind},
};

use super::load_section;

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CommanderView {
    pub name: Option<String>,
    pub bases: Vec<Base>,
    pub inventory: Vec<InventoryRecord>,
    /// Users a consignment can be assigned to
    pub officers: Vec<UserRow>,
    /// Every base except the commander's own
    pub destinations: Vec<Base>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedConsignment {
    pub message: String,
    pub ticket: Option<ConsignmentTicket>,
}

/// Base commander's overview and consignment creation
#[derive(Clone)]
pub struct CommanderService {
    store: Arc<dyn TableStore>,
}

impl CommanderService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn load(&self, nav: &NavigationState) -> CommanderView {
        let store = self.store.as_ref();

        let bases: Vec<Base> = load_section(store, &Select::from(Table::Bases), "bases").await;

        let inventory: Vec<InventoryRecord> = match nav.base_id.as_deref() {
            Some(base_id) => {
                let query = Select::from(Table::Inventory)
                    .columns(COMMANDER_INVENTORY_COLUMNS)
                    .eq("base_id", base_id);
                load_section(store, &query, "inventory").await
            }
            None => Vec::new(),
        };

        let officer_query = Select::from(Table::Users)
            .columns(OFFICER_COLUMNS)
            .neq("role", Role::BaseCommander.as_ref());
        let officers: Vec<UserRow> = load_section(store, &officer_query, "officers").await;

        let destinations = bases
            .iter()
            .filter(|b| Some(b.id.as_str()) != nav.base_id.as_deref())
            .cloned()
            .collect();

        CommanderView {
            name: nav.name.clone(),
            bases,
            inventory,
            officers,
            destinations,
        }
    }

    /// Validates the form, then inserts a ticket from the commander's base
    /// with status `assigned`. Nothing is sent when validation fails.
    #[instrument(skip(self))]
    pub async fn create_consignment(
        &self,
        nav: &NavigationState,
        request: &CreateConsignmentRequest,
    ) -> Result<CreatedConsignment, ServiceError> {
        request.validate().map_err(|_| {
            ServiceError::ValidationError("Please fill all fields correctly.".to_string())
        })?;

        let row = NewConsignment {
            from_base: nav.base_id.clone(),
            to_base: request.to_base.clone(),
            authorized_by: nav.service_id.clone(),
            assigned_to: request.assigned_to.clone(),
            purchase_orders: request.purchase_orders,
            status: ConsignmentStatus::Assigned,
        };
        let row = serde_json::to_value(row)?;

        let inserted = self
            .store
            .insert(Table::Consignment, vec![row])
            .await
            .map_err(|e| {
                let err = ServiceError::write(e);
                log_error(&err, ErrorKind::Write, Some("create consignment"));
                err
            })?;
        let ticket = decode_rows::<ConsignmentTicket>(inserted)
            .map_err(ServiceError::write)?
            .into_iter()
            .next();

        info!(ticket_id = ?ticket.as_ref().map(|t| t.ticket_id.as_str()), "consignment created");
        Ok(CreatedConsignment {
            message: "Consignment created successfully!".to_string(),
            ticket,
        })
    }
}
