// Role dashboards
pub mod dashboards;

// Inline editing and stock reconciliation
pub mod edit_controller;
pub mod reconciler;

pub use dashboards::{AdminService, CommanderService, LogisticsService, MilitaryService};
pub use edit_controller::{EditController, EditableRow, RowMode};
pub use reconciler::{merge_inventory, InventoryReconciler, MergeMode};
