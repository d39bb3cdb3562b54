pub mod admin;
pub mod auth;
pub mod commander;
pub mod common;
pub mod logistics;
pub mod military;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
