use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use super::lenient;

/// Full projection used by the admin consignment table
pub const CONSIGNMENT_COLUMNS: &str =
    "ticket_id, from_base, to_base, authorized_by, assigned_to, status, updated_by, purchase_orders";
/// Logistics officer's ticket projection
pub const LOGISTICS_CONSIGNMENT_COLUMNS: &str = "ticket_id, from_base, to_base, status, updated_by";

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
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConsignmentStatus {
    #[default]
    Assigned,
    Expired,
    Damaged,
    Delivered,
}

/// Inter-base transfer ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConsignmentTicket {
    #[serde(default, deserialize_with = "lenient::id")]
    pub ticket_id: String,
    #[serde(default, deserialize_with = "lenient::id")]
    pub from_base: String,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub to_base: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub authorized_by: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub status: Option<ConsignmentStatus>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub purchase_orders: Option<i64>,
}

impl ConsignmentTicket {
    /// Tickets without a stored status read as freshly assigned.
    pub fn display_status(&self) -> ConsignmentStatus {
        self.status.unwrap_or_default()
    }
}

/// Edit buffer for a consignment row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConsignmentEdit {
    #[serde(default)]
    pub status: Option<ConsignmentStatus>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub purchase_orders: Option<i64>,
}

impl ConsignmentEdit {
    /// Applies a partial field update. An unparseable purchase-order count
    /// becomes zero; an unknown status leaves the buffered status untouched.
    pub fn apply(&mut self, patch: &Value) {
        if let Some(status) = patch.get("status") {
            match status {
                Value::Null => self.status = None,
                Value::String(s) => {
                    if let Ok(parsed) = s.parse() {
                        self.status = Some(parsed);
                    }
                }
                _ => {}
            }
        }
        if let Some(count) = patch.get("purchase_orders") {
            self.purchase_orders = Some(lenient::value_to_i64(count).unwrap_or(0));
        }
    }

    /// Buffer values over committed values; the editor's name is stamped
    /// into `updated_by`.
    pub fn merge_over(
        &self,
        committed: &ConsignmentTicket,
        editor: Option<&str>,
    ) -> (ConsignmentTicket, Value) {
        let status = self.status.or(committed.status);
        let purchase_orders = self
            .purchase_orders
            .or(committed.purchase_orders)
            .unwrap_or(0);
        let updated_by = editor.map(str::to_string);

        let merged = ConsignmentTicket {
            status,
            purchase_orders: Some(purchase_orders),
            updated_by: updated_by.clone(),
            ..committed.clone()
        };
        let patch = json!({
            "status": status,
            "purchase_orders": purchase_orders,
            "updated_by": updated_by,
        });
        (merged, patch)
    }
}

/// Base commander's consignment creation form
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "to_base": "2", "assigned_to": "SVC-0042", "purchase_orders": 3 }))]
pub struct CreateConsignmentRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Select a destination base"))]
    pub to_base: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Select an officer"))]
    pub assigned_to: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "Purchase orders must be a positive number"))]
    pub purchase_orders: i64,
}

/// Row inserted into the `consignment` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConsignment {
    pub from_base: Option<String>,
    pub to_base: String,
    pub authorized_by: Option<String>,
    pub assigned_to: String,
    pub purchase_orders: i64,
    pub status: ConsignmentStatus,
}
