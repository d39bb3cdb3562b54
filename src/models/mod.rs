// Core models
pub mod base;
pub mod consignment;
pub mod inventory;
pub mod user;

pub use base::{Base, CreateBaseRequest};
pub use consignment::{
    ConsignmentEdit, ConsignmentStatus, ConsignmentTicket, CreateConsignmentRequest,
    NewConsignment,
};
pub use inventory::{InventoryEdit, InventoryRecord};
pub use user::{Role, UserRow};

/// Serde helpers for rows coming back from the hosted store.
///
/// Row identities may be integers or strings depending on how a table was
/// declared, and numeric columns occasionally arrive as strings from form
/// posts. Both are coerced rather than rejected.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_id(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_id(value).unwrap_or_default())
    }

    /// Text columns that may come back `null`.
    pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(value_to_id).unwrap_or_default())
    }

    pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(value_to_id))
    }

    pub fn i64_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(value_to_i64).unwrap_or(0))
    }

    pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(value_to_i64))
    }
}

/// Falls back to an em dash when nothing displayable is available.
pub const MISSING_DISPLAY: &str = "—";

#[cfg(test)]
mod tests {
    use super::lenient;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient::id")]
        id: String,
        #[serde(default, deserialize_with = "lenient::opt_i64")]
        count: Option<i64>,
        #[serde(default, deserialize_with = "lenient::string_or_empty")]
        label: String,
    }

    #[test]
    fn integer_ids_become_strings() {
        let sample: Sample = serde_json::from_value(json!({ "id": 42, "count": 3 })).unwrap();
        assert_eq!(sample.id, "42");
        assert_eq!(sample.count, Some(3));
    }

    #[test]
    fn numeric_strings_are_coerced_and_garbage_is_dropped() {
        let sample: Sample = serde_json::from_value(json!({ "id": "a", "count": "17" })).unwrap();
        assert_eq!(sample.count, Some(17));

        let sample: Sample = serde_json::from_value(json!({ "id": "a", "count": "abc" })).unwrap();
        assert_eq!(sample.count, None);

        let sample: Sample = serde_json::from_value(json!({ "count": null })).unwrap();
        assert_eq!(sample.id, "");
        assert_eq!(sample.count, None);
    }

    #[test]
    fn null_text_columns_read_as_empty() {
        let sample: Sample = serde_json::from_value(json!({ "id": 7, "label": null })).unwrap();
        assert_eq!(sample.label, "");

        let sample: Sample = serde_json::from_value(json!({ "id": 7, "label": "M1A2" })).unwrap();
        assert_eq!(sample.label, "M1A2");

        let sample: Sample = serde_json::from_value(json!({ "id": 7 })).unwrap();
        assert_eq!(sample.label, "");
    }
}
