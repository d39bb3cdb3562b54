use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use super::lenient;

/// Columns read for the admin bases table
pub const BASE_COLUMNS: &str = "id, name, code, location";
/// Columns read for the base information card
pub const BASE_INFO_COLUMNS: &str = "code, name, location";

/// A military base. Reference data from the dashboards' point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Base {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl Base {
    /// Name, then code, then identity.
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.code.is_empty() {
            &self.code
        } else {
            &self.id
        }
    }
}

/// Resolves a base reference for display, falling back to the raw id when
/// the base is not in the cached list.
pub fn base_display(bases: &[Base], base_id: Option<&str>) -> String {
    match base_id {
        None => super::MISSING_DISPLAY.to_string(),
        Some(id) => bases
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.display_name().to_string())
            .unwrap_or_else(|| id.to_string()),
    }
}

/// Admin base creation form
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "name": "Alpha", "code": "A1", "location": "Sector 7" }))]
pub struct CreateBaseRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(id: &str, code: &str, name: &str) -> Base {
        Base {
            id: id.into(),
            code: code.into(),
            name: name.into(),
            location: None,
        }
    }

    #[test]
    fn display_prefers_name_then_code_then_id() {
        assert_eq!(base("1", "IC", "Ironclad").display_name(), "Ironclad");
        assert_eq!(base("1", "IC", "").display_name(), "IC");
        assert_eq!(base("1", "", "").display_name(), "1");
    }

    #[test]
    fn unknown_base_reference_shows_raw_id() {
        let bases = vec![base("1", "IC", "Ironclad")];
        assert_eq!(base_display(&bases, Some("1")), "Ironclad");
        assert_eq!(base_display(&bases, Some("9")), "9");
        assert_eq!(base_display(&bases, None), "—");
    }

    #[test]
    fn create_base_requires_name_and_code() {
        let ok = CreateBaseRequest {
            name: "Alpha".into(),
            code: "A1".into(),
            location: None,
        };
        assert!(ok.validate().is_ok());

        let missing_code = CreateBaseRequest {
            code: String::new(),
            ..ok
        };
        assert!(missing_code.validate().is_err());
    }
}
