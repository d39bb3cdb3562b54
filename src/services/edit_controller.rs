use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    models::{ConsignmentEdit, ConsignmentTicket, InventoryEdit, InventoryRecord},
    store::{Filter, Table, TableStore},
    tracing::{log_error, ErrorKind},
};

/// Whether a row is shown read-only or with its edit buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RowMode {
    Viewing,
    Editing,
}

/// A cached row that can be edited inline and written back by key.
pub trait EditableRow: Clone + Send + Sync {
    /// Edited fields only; `None` means "fall back to the committed value"
    type Edit: Clone + Default + Send + Sync;

    const TABLE: Table;
    const KEY_COLUMN: &'static str;

    fn key(&self) -> &str;

    /// Buffer contents when editing starts
    fn seed_edit(&self) -> Self::Edit;

    fn apply(edit: &mut Self::Edit, patch: &Value);

    /// Merged row plus the columns to write
    fn merge(&self, edit: &Self::Edit, editor: Option<&str>) -> (Self, Value);
}

impl EditableRow for InventoryRecord {
    type Edit = InventoryEdit;

    const TABLE: Table = Table::Inventory;
    const KEY_COLUMN: &'static str = "id";

    fn key(&self) -> &str {
        &self.id
    }

    fn seed_edit(&self) -> InventoryEdit {
        InventoryEdit {
            stock: Some(self.stock),
            transfer_in: Some(self.transfer_in.unwrap_or(0)),
            transfer_out: Some(self.transfer_out.unwrap_or(0)),
        }
    }

    fn apply(edit: &mut InventoryEdit, patch: &Value) {
        edit.apply(patch);
    }

    fn merge(&self, edit: &InventoryEdit, _editor: Option<&str>) -> (Self, Value) {
        edit.merge_over(self)
    }
}

impl EditableRow for ConsignmentTicket {
    type Edit = ConsignmentEdit;

    const TABLE: Table = Table::Consignment;
    const KEY_COLUMN: &'static str = "ticket_id";

    fn key(&self) -> &str {
        &self.ticket_id
    }

    fn seed_edit(&self) -> ConsignmentEdit {
        ConsignmentEdit {
            status: self.status,
            purchase_orders: Some(self.purchase_orders.unwrap_or(0)),
        }
    }

    fn apply(edit: &mut ConsignmentEdit, patch: &Value) {
        edit.apply(patch);
    }

    fn merge(&self, edit: &ConsignmentEdit, editor: Option<&str>) -> (Self, Value) {
        edit.merge_over(self, editor)
    }
}

/// Per-row edit buffers for one cached table.
///
/// A row with a buffer is Editing, any other row is Viewing. Buffers are
/// independent, so several rows can be Editing at the same time.
pub struct EditController<R: EditableRow> {
    buffers: HashMap<String, R::Edit>,
}

impl<R: EditableRow> Default for EditController<R> {
    fn default() -> Self {
        Self {
            buffers: HashMap::new(),
        }
    }
}

impl<R: EditableRow> EditController<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self, key: &str) -> RowMode {
        if self.buffers.contains_key(key) {
            RowMode::Editing
        } else {
            RowMode::Viewing
        }
    }

    pub fn buffer(&self, key: &str) -> Option<&R::Edit> {
        self.buffers.get(key)
    }

    /// Drops every buffer
    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    /// Starts (or restarts) editing `row`, seeding the buffer from its
    /// committed values.
    pub fn begin_edit(&mut self, row: &R) -> &R::Edit {
        let key = row.key().to_string();
        self.buffers.insert(key.clone(), row.seed_edit());
        &self.buffers[&key]
    }

    /// Writes a partial field update into the buffer of a row being edited.
    pub fn update_buffer(&mut self, key: &str, patch: &Value) -> Result<&R::Edit, ServiceError> {
        let edit = self.buffers.get_mut(key).ok_or_else(|| {
            ServiceError::InvalidOperation(format!("{} {} is not being edited", R::TABLE, key))
        })?;
        R::apply(edit, patch);
        Ok(edit)
    }

    /// Writes the merged buffer back to the store.
    ///
    /// Returns `Ok(None)` without touching the store when the row has no
    /// buffer or is no longer cached. On failure the buffer is kept so the
    /// row stays in Editing.
    #[instrument(skip(self, store, rows, editor), fields(table = %R::TABLE))]
    pub async fn save(
        &mut self,
        store: &dyn TableStore,
        rows: &mut [R],
        key: &str,
        editor: Option<&str>,
    ) -> Result<Option<R>, ServiceError> {
        let Some(edit) = self.buffers.get(key) else {
            debug!("no edit buffer; nothing to save");
            return Ok(None);
        };
        let Some(position) = rows.iter().position(|r| r.key() == key) else {
            debug!("row not in cache; nothing to save");
            return Ok(None);
        };

        let (merged, patch) = rows[position].merge(edit, editor);
        store
            .update(R::TABLE, &Filter::eq(R::KEY_COLUMN, key), patch)
            .await
            .map_err(|e| {
                let err = ServiceError::write(e);
                log_error(&err, ErrorKind::Write, Some("inline save failed"));
                err
            })?;

        rows[position] = merged.clone();
        self.buffers.remove(key);
        Ok(Some(merged))
    }
}
