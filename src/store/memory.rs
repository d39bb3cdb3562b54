use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthProvider, AuthSession, Filter, Select, StoreError, Table, TableStore};

/// In-process stand-in for the hosted service.
///
/// Rows are kept as JSON objects in insertion order. Integer identities are
/// assigned on insert and the inventory `net_movement` column is maintained
/// the way the hosted trigger maintains it.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    accounts: RwLock<HashMap<String, String>>,
    sessions: RwLock<HashSet<String>>,
    rejected_writes: RwLock<HashSet<Table>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: Table, rows: Vec<Value>) -> Self {
        let stored = self.tables.get_mut().entry(table).or_default();
        stored.extend(rows.into_iter().map(|mut row| {
            if table == Table::Inventory {
                apply_net_movement(&mut row);
            }
            row
        }));
        self
    }

    pub fn with_account(mut self, email: &str, password: &str) -> Self {
        self.accounts
            .get_mut()
            .insert(email.to_string(), password.to_string());
        self
    }

    /// Copy of every row in `table`, unprojected
    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every later insert or update on `table` fail.
    pub async fn reject_writes(&self, table: Table) {
        self.rejected_writes.write().await.insert(table);
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn check_writable(&self, table: Table) -> Result<(), StoreError> {
        if self.rejected_writes.read().await.contains(&table) {
            return Err(StoreError::Rejected {
                status: 403,
                message: format!("permission denied for table {table}"),
            });
        }
        Ok(())
    }
}

fn project(row: &Value, columns: Option<&[String]>) -> Value {
    match columns {
        None => row.clone(),
        Some(columns) => {
            let projected: Map<String, Value> = columns
                .iter()
                .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                .collect();
            Value::Object(projected)
        }
    }
}

// Out-of-range movement is stored as null, like a failed trigger.
fn apply_net_movement(row: &mut Value) {
    let counter = |row: &Value, key: &str| row.get(key).and_then(Value::as_i64).unwrap_or(0);
    let net = counter(row, "transfer_in").checked_sub(counter(row, "transfer_out"));
    if let Some(object) = row.as_object_mut() {
        object.insert("net_movement".to_string(), net.map_or(Value::Null, Value::from));
    }
}

fn next_identity(rows: &[Value], key: &str) -> i64 {
    rows.iter()
        .filter_map(|r| r.get(key).and_then(Value::as_i64))
        .max()
        .unwrap_or(0)
        + 1
}

#[async_trait]
impl TableStore for InMemoryStore {
    async fn select(&self, query: &Select) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.read().await;
        let columns = query.projected_columns();
        Ok(tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| f.matches(row)))
                    .map(|row| project(row, columns.as_deref()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        self.check_writable(table).await?;

        let mut tables = self.tables.write().await;
        let stored = tables.entry(table).or_default();
        let key = table.key_column();
        let mut inserted = Vec::with_capacity(rows.len());

        for row in rows {
            let Value::Object(mut object) = row else {
                return Err(StoreError::Rejected {
                    status: 400,
                    message: "row must be a JSON object".to_string(),
                });
            };
            if table != Table::Users && object.get(key).map_or(true, Value::is_null) {
                object.insert(key.to_string(), Value::from(next_identity(stored, key)));
            }
            let mut row = Value::Object(object);
            if table == Table::Inventory {
                apply_net_movement(&mut row);
            }
            stored.push(row.clone());
            inserted.push(row);
        }

        Ok(inserted)
    }

    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> Result<(), StoreError> {
        self.check_writable(table).await?;

        let Value::Object(patch) = patch else {
            return Err(StoreError::Rejected {
                status: 400,
                message: "patch must be a JSON object".to_string(),
            });
        };

        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                if let Some(object) = row.as_object_mut() {
                    object.extend(patch.clone());
                }
                if table == Table::Inventory {
                    apply_net_movement(row);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for InMemoryStore {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        let accounts = self.accounts.read().await;
        if accounts.get(email).map(String::as_str) != Some(password) {
            return Err(StoreError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            });
        }

        let access_token = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(access_token.clone());

        Ok(AuthSession {
            access_token,
            token_type: Some("bearer".to_string()),
            expires_in: Some(3600),
            user_id: None,
            email: Some(email.to_string()),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(access_token);
        Ok(())
    }
}
