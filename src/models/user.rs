use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::lenient;

/// Columns read for the admin users table
pub const USER_COLUMNS: &str = "service_id, name, email, role, base_id";
/// Columns read for the login profile lookup
pub const PROFILE_COLUMNS: &str = "email, role, service_id, base_id, name";
/// Columns read for the commander's officer picker
pub const OFFICER_COLUMNS: &str = "service_id, name, role";

/// The four portal roles, spelled exactly as stored in the `users` table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum Role {
    #[serde(rename = "Logistics Officer")]
    #[strum(serialize = "Logistics Officer")]
    LogisticsOfficer,
    #[serde(rename = "Military Personnel")]
    #[strum(serialize = "Military Personnel")]
    MilitaryPersonnel,
    #[serde(rename = "Base Commander")]
    #[strum(serialize = "Base Commander")]
    BaseCommander,
    #[serde(rename = "System Admin")]
    #[strum(serialize = "System Admin")]
    SystemAdmin,
}

/// A row of the `users` table. Views project different column subsets,
/// so every column other than `service_id` may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserRow {
    #[serde(default, deserialize_with = "lenient::id")]
    pub service_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Stored role text; kept raw so an unexpected value can be compared
    /// against the claimed role instead of failing the read.
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient::opt_id")]
    pub base_id: Option<String>,
}

impl UserRow {
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

/// Resolves a user reference to a display name: the user's name when the
/// service id is known, otherwise the raw id, otherwise a dash.
pub fn user_display(users: &[UserRow], service_id: Option<&str>) -> String {
    let Some(id) = service_id.filter(|id| !id.is_empty()) else {
        return super::MISSING_DISPLAY.to_string();
    };
    users
        .iter()
        .find(|u| u.service_id == id)
        .and_then(|u| u.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.to_string())
}
