use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::lenient;

/// Full projection used by the admin table and the reconciler
pub const INVENTORY_COLUMNS: &str =
    "id, base_id, category, model, stock, metadata, transfer_in, transfer_out, net_movement, current_stock";
/// Base commander's inventory projection
pub const COMMANDER_INVENTORY_COLUMNS: &str =
    "id, category, model, stock, metadata, transfer_in, transfer_out, net_movement, current_stock";
/// Logistics officer's inventory projection
pub const LOGISTICS_INVENTORY_COLUMNS: &str =
    "id, category, model, stock, transfer_in, transfer_out, net_movement, current_stock";
/// Military personnel only see what is on the shelf
pub const PERSONNEL_INVENTORY_COLUMNS: &str = "category, model, stock";

/// One inventory line at a base.
///
/// `net_movement` is maintained by a trigger in the hosted store;
/// `current_stock` is a snapshot written back by the reconciler and is only
/// expected to equal `stock + transfer_in - transfer_out` once settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub base_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub model: String,
    #[serde(default, deserialize_with = "lenient::i64_or_zero")]
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub transfer_in: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub transfer_out: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub net_movement: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub current_stock: Option<i64>,
}

impl InventoryRecord {
    /// `stock + transfer_in - transfer_out`, absent counters read as zero.
    /// `None` when the result does not fit in an `i64`.
    pub fn derived_current_stock(&self) -> Option<i64> {
        self.stock
            .checked_add(self.transfer_in.unwrap_or(0))?
            .checked_sub(self.transfer_out.unwrap_or(0))
    }

    /// Stock figure shown to read-only roles: the snapshot when it is set and
    /// non-zero, otherwise the baseline stock.
    pub fn display_stock(&self) -> i64 {
        match self.current_stock {
            Some(current) if current != 0 => current,
            _ => self.stock,
        }
    }
}

/// Edit buffer for an inventory row. Only the stock counters are editable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InventoryEdit {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub stock: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub transfer_in: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub transfer_out: Option<i64>,
}

impl InventoryEdit {
    /// Applies a partial field update. Keys absent from `patch` are left
    /// alone; keys present with a value that is not an integer are cleared.
    pub fn apply(&mut self, patch: &Value) {
        let field = |key: &str| patch.get(key).map(lenient::value_to_i64);
        if let Some(v) = field("stock") {
            self.stock = v;
        }
        if let Some(v) = field("transfer_in") {
            self.transfer_in = v;
        }
        if let Some(v) = field("transfer_out") {
            self.transfer_out = v;
        }
    }

    /// Buffer values over committed values, returning the merged row and the
    /// columns to write.
    pub fn merge_over(&self, committed: &InventoryRecord) -> (InventoryRecord, Value) {
        let stock = self.stock.unwrap_or(committed.stock);
        let transfer_in = self.transfer_in.or(committed.transfer_in).unwrap_or(0);
        let transfer_out = self.transfer_out.or(committed.transfer_out).unwrap_or(0);

        let merged = InventoryRecord {
            stock,
            transfer_in: Some(transfer_in),
            transfer_out: Some(transfer_out),
            ..committed.clone()
        };
        let patch = json!({
            "stock": stock,
            "transfer_in": transfer_in,
            "transfer_out": transfer_out,
        });
        (merged, patch)
    }
}
