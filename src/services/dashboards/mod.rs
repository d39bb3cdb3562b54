//! Role dashboards. Each one performs a fixed set of reads when opened and
//! renders the result as a view model; a failed read leaves its section
//! empty and is only logged.

pub mod admin;
pub mod commander;
pub mod logistics;
pub mod military;

pub use admin::{AdminService, AdminTab, AdminView};
pub use commander::{CommanderService, CommanderView, CreatedConsignment};
pub use logistics::{LogisticsService, LogisticsView};
pub use military::{MilitaryService, MilitaryView};

use serde::de::DeserializeOwned;

use crate::{
    errors::ServiceError,
    store::{select_as, Select, TableStore},
    tracing::{log_error, ErrorKind},
};

/// Reads one dashboard section, logging and swallowing any failure.
pub(crate) async fn load_section<T: DeserializeOwned>(
    store: &dyn TableStore,
    query: &Select,
    section: &str,
) -> Vec<T> {
    match select_as(store, query).await {
        Ok(rows) => rows,
        Err(e) => {
            log_error(&ServiceError::fetch(e), ErrorKind::Fetch, Some(section));
            Vec::new()
        }
    }
}
