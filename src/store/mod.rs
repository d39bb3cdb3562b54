/*!
 * # External Store
 *
 * The portal owns no data. Every row lives in a hosted tables+auth service
 * and is reached through the two traits below:
 *
 * - [`TableStore`]: projected, filtered reads plus insert and update-by-key
 * - [`AuthProvider`]: password sign-in and sign-out
 *
 * [`HostedStore`] talks to the real service over HTTP; [`InMemoryStore`]
 * backs local runs and tests.
 */

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

pub mod demo;
pub mod memory;
pub mod rest;

pub use memory::InMemoryStore;
pub use rest::HostedStore;

/// Errors raised by a store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never produced a response
    #[error("store request failed: {0}")]
    Request(String),
    /// The service answered with a non-success status; `message` is the
    /// service's own explanation and is shown to users verbatim.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
}

/// The four row-sets the portal reads and writes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Table {
    Bases,
    Users,
    Inventory,
    Consignment,
}

impl Table {
    /// Column holding the row identity
    pub fn key_column(&self) -> &'static str {
        match self {
            Table::Bases | Table::Inventory => "id",
            Table::Users => "service_id",
            Table::Consignment => "ticket_id",
        }
    }
}

/// Row filter. Values are compared in their textual form so integer and
/// string identities match the same way the hosted service matches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn neq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Neq(column.into(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Neq(c, _) => c,
        }
    }

    /// Query-string form, e.g. `("base_id", "eq.7")`
    pub fn to_query_pair(&self) -> (String, String) {
        match self {
            Filter::Eq(c, v) => (c.clone(), format!("eq.{}", v)),
            Filter::Neq(c, v) => (c.clone(), format!("neq.{}", v)),
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        let cell = row.get(self.column()).and_then(cell_text);
        match self {
            Filter::Eq(_, v) => cell.as_deref() == Some(v.as_str()),
            // SQL semantics: NULL is neither equal nor unequal to anything
            Filter::Neq(_, v) => cell.map_or(false, |c| c != *v),
        }
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A projected, filtered read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: Table,
    pub columns: String,
    pub filters: Vec<Filter>,
}

impl Select {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn neq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::neq(column, value));
        self
    }

    /// Column list with whitespace removed, as sent on the wire
    pub fn column_list(&self) -> String {
        self.columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `None` for `*`
    pub fn projected_columns(&self) -> Option<Vec<String>> {
        let list = self.column_list();
        if list == "*" {
            None
        } else {
            Some(list.split(',').map(str::to_string).collect())
        }
    }
}

/// Session returned by a successful password sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, query: &Select) -> Result<Vec<Value>, StoreError>;

    /// Inserts rows and returns them as stored, identities included.
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    /// Patches every row matching `filter`.
    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> Result<(), StoreError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError>;
}

/// Decodes raw rows into a typed model.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string())))
        .collect()
}

/// Reads and decodes in one step.
pub async fn select_as<T: DeserializeOwned>(
    store: &dyn TableStore,
    query: &Select,
) -> Result<Vec<T>, StoreError> {
    decode_rows(store.select(query).await?)
}

/// Reads exactly one row; zero or several rows is an error, as with a
/// single-row request against the hosted service.
pub async fn select_single<T: DeserializeOwned>(
    store: &dyn TableStore,
    query: &Select,
) -> Result<T, StoreError> {
    let mut rows = store.select(query).await?;
    if rows.len() != 1 {
        return Err(StoreError::Rejected {
            status: 406,
            message: format!(
                "JSON object requested, multiple (or no) rows returned ({} rows)",
                rows.len()
            ),
        });
    }
    let row = rows.remove(0);
    serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string()))
}
