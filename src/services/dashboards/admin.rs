use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, instrument, Instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::NavigationState,
    errors::ServiceError,
    models::{
        base::{base_display, BASE_COLUMNS},
        consignment::CONSIGNMENT_COLUMNS,
        inventory::INVENTORY_COLUMNS,
        user::{user_display, USER_COLUMNS},
        Base, ConsignmentEdit, ConsignmentStatus, ConsignmentTicket, CreateBaseRequest,
        InventoryEdit, InventoryRecord, UserRow,
    },
    services::{
        edit_controller::{EditController, RowMode},
        reconciler::{merge_inventory, InventoryReconciler, MergeMode},
    },
    store::{decode_rows, select_as, Select, Table, TableStore},
    tracing::{log_error, ErrorKind},
};

const ANONYMOUS_WORKSPACE: &str = "anonymous";
const DEFAULT_WORKSPACE_LIMIT: usize = 64;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AdminTab {
    #[default]
    Bases,
    Users,
    Inventory,
    Consignment,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserLine {
    #[serde(flatten)]
    pub user: UserRow,
    pub base: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryLine {
    #[serde(flatten)]
    pub record: InventoryRecord,
    pub base: String,
    pub mode: RowMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit: Option<InventoryEdit>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsignmentLine {
    #[serde(flatten)]
    pub ticket: ConsignmentTicket,
    pub from_base_name: String,
    pub to_base_name: String,
    pub authorized_by_name: String,
    pub assigned_to_name: String,
    pub updated_by_name: String,
    pub display_status: ConsignmentStatus,
    pub mode: RowMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit: Option<ConsignmentEdit>,
}

/// The admin dashboard, rendered for one tab. Only the active tab's rows
/// are included.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct AdminView {
    pub name: Option<String>,
    /// The admin's own base, resolved for display
    pub base: String,
    pub tab: AdminTab,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bases: Option<Vec<Base>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<InventoryLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignments: Option<Vec<ConsignmentLine>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventorySaveResponse {
    /// False when there was nothing to save
    pub saved: bool,
    pub row: Option<InventoryLine>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConsignmentSaveResponse {
    pub saved: bool,
    pub row: Option<ConsignmentLine>,
}

/// One admin's cached tables and edit buffers
#[derive(Default)]
pub struct AdminDashboard {
    mounted: bool,
    bases: Vec<Base>,
    users: Vec<UserRow>,
    inventory: Vec<InventoryRecord>,
    consignments: Vec<ConsignmentTicket>,
    inventory_edits: EditController<InventoryRecord>,
    consignment_edits: EditController<ConsignmentTicket>,
    load_error: Option<String>,
    pending_pass: Option<JoinHandle<()>>,
}

impl AdminDashboard {
    fn inventory_line(&self, record: &InventoryRecord) -> InventoryLine {
        InventoryLine {
            base: base_display(&self.bases, record.base_id.as_deref()),
            mode: self.inventory_edits.mode(&record.id),
            edit: self.inventory_edits.buffer(&record.id).cloned(),
            record: record.clone(),
        }
    }

    fn consignment_line(&self, ticket: &ConsignmentTicket) -> ConsignmentLine {
        let from_base = Some(ticket.from_base.as_str()).filter(|b| !b.is_empty());
        ConsignmentLine {
            from_base_name: base_display(&self.bases, from_base),
            to_base_name: base_display(&self.bases, ticket.to_base.as_deref()),
            authorized_by_name: user_display(&self.users, ticket.authorized_by.as_deref()),
            assigned_to_name: user_display(&self.users, ticket.assigned_to.as_deref()),
            updated_by_name: user_display(&self.users, ticket.updated_by.as_deref()),
            display_status: ticket.display_status(),
            mode: self.consignment_edits.mode(&ticket.ticket_id),
            edit: self.consignment_edits.buffer(&ticket.ticket_id).cloned(),
            ticket: ticket.clone(),
        }
    }

    fn find_inventory(&self, id: &str) -> Result<&InventoryRecord, ServiceError> {
        self.inventory
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("inventory {id}")))
    }

    fn find_consignment(&self, ticket_id: &str) -> Result<&ConsignmentTicket, ServiceError> {
        self.consignments
            .iter()
            .find(|t| t.ticket_id == ticket_id)
            .ok_or_else(|| ServiceError::NotFound(format!("consignment {ticket_id}")))
    }

    fn render(&self, nav: &NavigationState, tab: AdminTab) -> AdminView {
        let mut view = AdminView {
            name: nav.name.clone(),
            base: base_display(&self.bases, nav.base_id.as_deref()),
            tab,
            load_error: self.load_error.clone(),
            ..Default::default()
        };
        match tab {
            AdminTab::Bases => view.bases = Some(self.bases.clone()),
            AdminTab::Users => {
                view.users = Some(
                    self.users
                        .iter()
                        .map(|u| UserLine {
                            base: base_display(&self.bases, u.base_id.as_deref()),
                            user: u.clone(),
                        })
                        .collect(),
                )
            }
            AdminTab::Inventory => {
                view.inventory = Some(
                    self.inventory
                        .iter()
                        .map(|r| self.inventory_line(r))
                        .collect(),
                )
            }
            AdminTab::Consignment => {
                view.consignments = Some(
                    self.consignments
                        .iter()
                        .map(|t| self.consignment_line(t))
                        .collect(),
                )
            }
        }
        view
    }
}

/// Reads one admin table, recording the first failure for the banner.
async fn load_table<T: serde::de::DeserializeOwned>(
    store: &dyn TableStore,
    query: Select,
    load_error: &mut Option<String>,
) -> Vec<T> {
    match select_as(store, &query).await {
        Ok(rows) => rows,
        Err(e) => {
            let err = ServiceError::fetch(e);
            log_error(&err, ErrorKind::Fetch, Some(query.table.as_ref()));
            load_error.get_or_insert_with(|| err.to_string());
            Vec::new()
        }
    }
}

struct Workspace {
    dashboard: Arc<Mutex<AdminDashboard>>,
    last_used: u64,
}

fn workspace_key(nav: &NavigationState) -> String {
    nav.service_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ANONYMOUS_WORKSPACE.to_string())
}

/// System admin dashboard: every table, inline edits and base creation.
///
/// Each admin (keyed by service id) gets an isolated workspace; actions on
/// one workspace are serialized by its lock. At most `workspace_limit`
/// workspaces are kept; opening one more drops the least recently used.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn TableStore>,
    reconciler: InventoryReconciler,
    workspaces: Arc<DashMap<String, Workspace>>,
    clock: Arc<AtomicU64>,
    workspace_limit: usize,
    initial_delay: Duration,
    after_save_delay: Duration,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn TableStore>,
        initial_delay: Duration,
        after_save_delay: Duration,
    ) -> Self {
        Self {
            reconciler: InventoryReconciler::new(store.clone()),
            store,
            workspaces: Arc::new(DashMap::new()),
            clock: Arc::new(AtomicU64::new(0)),
            workspace_limit: DEFAULT_WORKSPACE_LIMIT,
            initial_delay,
            after_save_delay,
        }
    }

    pub fn with_workspace_limit(mut self, limit: usize) -> Self {
        self.workspace_limit = limit.max(1);
        self
    }

    /// Number of admin workspaces currently held
    pub fn workspace_count(&self) -> usize {
        self.workspaces.len()
    }

    fn workspace(&self, nav: &NavigationState) -> Arc<Mutex<AdminDashboard>> {
        let key = workspace_key(nav);
        let now = self.clock.fetch_add(1, Ordering::Relaxed);

        if let Some(mut existing) = self.workspaces.get_mut(&key) {
            existing.last_used = now;
            return Arc::clone(&existing.dashboard);
        }

        while self.workspaces.len() >= self.workspace_limit {
            let oldest = self
                .workspaces
                .iter()
                .min_by_key(|entry| entry.last_used)
                .map(|entry| entry.key().clone());
            let Some(oldest) = oldest else { break };
            self.workspaces.remove(&oldest);
            debug!(workspace = %oldest, "least recently used admin workspace dropped");
        }

        let entry = self.workspaces.entry(key).or_insert_with(|| Workspace {
            dashboard: Arc::default(),
            last_used: now,
        });
        Arc::clone(&entry.dashboard)
    }

    /// Drops the admin's workspace, e.g. on logout. A pass still in flight
    /// finishes its writes against the store.
    pub fn evict(&self, nav: &NavigationState) {
        let key = workspace_key(nav);
        if self.workspaces.remove(&key).is_some() {
            debug!(workspace = %key, "admin workspace dropped");
        }
    }

    fn schedule_reconcile(
        &self,
        workspace: &Arc<Mutex<AdminDashboard>>,
        dashboard: &mut AdminDashboard,
        delay: Duration,
        mode: MergeMode,
    ) {
        let reconciler = self.reconciler.clone();
        let target = Arc::clone(workspace);
        let span = tracing::info_span!(
            "inventory_reconcile",
            ?mode,
            delay_ms = delay.as_millis() as u64
        );

        let handle = tokio::spawn(
            async move {
                match reconciler.run(delay).await {
                    Ok(fresh) => {
                        let mut dashboard = target.lock().await;
                        let merged = merge_inventory(&dashboard.inventory, fresh, mode);
                        dashboard.inventory = merged;
                    }
                    Err(e) => log_error(&e, ErrorKind::Internal, Some("inventory reconciliation")),
                }
            }
            .instrument(span),
        );
        dashboard.pending_pass = Some(handle);
    }

    async fn reload(&self, dashboard: &mut AdminDashboard) {
        let store = self.store.as_ref();
        let mut load_error = None;

        dashboard.bases = load_table(
            store,
            Select::from(Table::Bases).columns(BASE_COLUMNS),
            &mut load_error,
        )
        .await;
        dashboard.users = load_table(
            store,
            Select::from(Table::Users).columns(USER_COLUMNS),
            &mut load_error,
        )
        .await;
        dashboard.inventory = load_table(
            store,
            Select::from(Table::Inventory).columns(INVENTORY_COLUMNS),
            &mut load_error,
        )
        .await;
        dashboard.consignments = load_table(
            store,
            Select::from(Table::Consignment).columns(CONSIGNMENT_COLUMNS),
            &mut load_error,
        )
        .await;

        dashboard.load_error = load_error;
        dashboard.inventory_edits.clear();
        dashboard.consignment_edits.clear();
        dashboard.mounted = true;
    }

    /// Opens the dashboard: reloads every table, discards edit buffers and
    /// schedules the delayed reconciliation pass.
    #[instrument(skip(self))]
    pub async fn mount(&self, nav: &NavigationState, tab: AdminTab) -> AdminView {
        let workspace = self.workspace(nav);
        let mut dashboard = workspace.lock().await;

        self.reload(&mut dashboard).await;
        self.schedule_reconcile(&workspace, &mut dashboard, self.initial_delay, MergeMode::Replace);
        info!(
            bases = dashboard.bases.len(),
            users = dashboard.users.len(),
            inventory = dashboard.inventory.len(),
            consignments = dashboard.consignments.len(),
            "admin dashboard mounted"
        );
        dashboard.render(nav, tab)
    }

    /// Renders a tab from the cache, mounting first if this admin has no
    /// workspace yet.
    pub async fn view(&self, nav: &NavigationState, tab: AdminTab) -> AdminView {
        {
            let workspace = self.workspace(nav);
            let dashboard = workspace.lock().await;
            if dashboard.mounted {
                return dashboard.render(nav, tab);
            }
        }
        self.mount(nav, tab).await
    }

    /// Waits for the most recently scheduled reconciliation pass.
    pub async fn settle(&self, nav: &NavigationState) {
        let workspace = self.workspace(nav);
        let pending = workspace.lock().await.pending_pass.take();
        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                log_error(&e, ErrorKind::Internal, Some("inventory reconciliation task"));
            }
        }
    }

    /// Inserts a base and appends the stored row to the cache without a
    /// refetch.
    #[instrument(skip(self))]
    pub async fn create_base(
        &self,
        nav: &NavigationState,
        request: &CreateBaseRequest,
    ) -> Result<Base, ServiceError> {
        request.validate()?;
        let row = serde_json::to_value(request)?;

        let workspace = self.workspace(nav);
        let mut dashboard = workspace.lock().await;

        let inserted = self.store.insert(Table::Bases, vec![row]).await.map_err(|e| {
            let err = ServiceError::write(e);
            log_error(&err, ErrorKind::Write, Some("create base"));
            err
        })?;
        let base = decode_rows::<Base>(inserted)
            .map_err(ServiceError::write)?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::WriteError("the store returned no base".to_string()))?;

        dashboard.bases.push(base.clone());
        info!(base_id = %base.id, "base created");
        Ok(base)
    }

    pub async fn begin_inventory_edit(
        &self,
        nav: &NavigationState,
        id: &str,
    ) -> Result<InventoryLine, ServiceError> {
        let workspace = self.workspace(nav);
        let mut dashboard = workspace.lock().await;
        let record = dashboard.find_inventory(id)?.clone();
        dashboard.inventory_edits.begin_edit(&record);
        Ok(dashboard.inventory_line(&record))
    }

    pub async fn update_inventory_edit(
        &self,
        nav: &NavigationState,
        id: &str,
        patch: &Value,
    ) -> Result<InventoryLine, ServiceError> {
        let workspace = self.workspace(nav);
        let mut dashboard = workspace.lock().await;
        dashboard.inventory_edits.update_buffer(id, patch)?;
        let record = dashboard.find_inventory(id)?.clone();
        Ok(dashboard.inventory_line(&record))
    }

    /// Saves an inventory row and schedules an order-preserving
    /// reconciliation pass.
    #[instrument(skip(self))]
    pub async fn save_inventory(
        &self,
        nav: &NavigationState,
        id: &str,
    ) -> Result<InventorySaveResponse, ServiceError> {
        let workspace = self.workspace(nav);
        let mut guard = workspace.lock().await;
        let dashboard = &mut *guard;

        let saved = dashboard
            .inventory_edits
            .save(self.store.as_ref(), &mut dashboard.inventory, id, None)
            .await?;

        let Some(record) = saved else {
            return Ok(InventorySaveResponse {
                saved: false,
                row: None,
            });
        };
        self.schedule_reconcile(
            &workspace,
            dashboard,
            self.after_save_delay,
            MergeMode::PreserveOrder,
        );
        Ok(InventorySaveResponse {
            saved: true,
            row: Some(dashboard.inventory_line(&record)),
        })
    }

    pub async fn begin_consignment_edit(
        &self,
        nav: &NavigationState,
        ticket_id: &str,
    ) -> Result<ConsignmentLine, ServiceError> {
        let workspace = self.workspace(nav);
        let mut dashboard = workspace.lock().await;
        let ticket = dashboard.find_consignment(ticket_id)?.clone();
        dashboard.consignment_edits.begin_edit(&ticket);
        Ok(dashboard.consignment_line(&ticket))
    }

    pub async fn update_consignment_edit(
        &self,
        nav: &NavigationState,
        ticket_id: &str,
        patch: &Value,
    ) -> Result<ConsignmentLine, ServiceError> {
        let workspace = self.workspace(nav);
        let mut dashboard = workspace.lock().await;
        dashboard.consignment_edits.update_buffer(ticket_id, patch)?;
        let ticket = dashboard.find_consignment(ticket_id)?.clone();
        Ok(dashboard.consignment_line(&ticket))
    }

    /// Saves a consignment row, stamping the admin's name as `updated_by`.
    #[instrument(skip(self))]
    pub async fn save_consignment(
        &self,
        nav: &NavigationState,
        ticket_id: &str,
    ) -> Result<ConsignmentSaveResponse, ServiceError> {
        let workspace = self.workspace(nav);
        let mut guard = workspace.lock().await;
        let dashboard = &mut *guard;

        let saved = dashboard
            .consignment_edits
            .save(
                self.store.as_ref(),
                &mut dashboard.consignments,
                ticket_id,
                nav.name.as_deref(),
            )
            .await?;

        Ok(ConsignmentSaveResponse {
            saved: saved.is_some(),
            row: saved.map(|ticket| dashboard.consignment_line(&ticket)),
        })
    }
}
