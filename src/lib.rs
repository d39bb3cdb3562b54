//! MAMS Portal Library
//!
//! Role-scoped portal over a hosted tables and auth backend: login with role
//! verification, four role dashboards, inline row editing for system admins
//! and reconciliation of derived inventory stock.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod store;
pub mod tracing;

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{
    auth::SessionResolver,
    services::{AdminService, CommanderService, LogisticsService, MilitaryService},
    store::{AuthProvider, TableStore},
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub store: Arc<dyn TableStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: SessionResolver,
    pub admin: AdminService,
    pub commander: CommanderService,
    pub logistics: LogisticsService,
    pub military: MilitaryService,
}

impl AppState {
    /// Wires every service to the given store and auth provider.
    pub fn new(
        config: config::AppConfig,
        store: Arc<dyn TableStore>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            sessions: SessionResolver::new(auth.clone(), store.clone()),
            admin: AdminService::new(
                store.clone(),
                config.reconcile_initial_delay(),
                config.reconcile_after_save_delay(),
            )
            .with_workspace_limit(config.admin_workspace_limit),
            commander: CommanderService::new(store.clone()),
            logistics: LogisticsService::new(store.clone()),
            military: MilitaryService::new(store.clone()),
            config,
            store,
            auth,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_carries_the_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("oops"));
        assert!(response.meta.is_some_and(|m| m.request_id.is_none()));
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every portal route: login, the four dashboards and status.
pub fn portal_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .merge(handlers::auth::auth_routes())
        .merge(handlers::admin::admin_routes())
        .merge(handlers::commander::commander_routes())
        .merge(handlers::logistics::logistics_routes())
        .merge(handlers::military::military_routes())
}

/// Service version and environment
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Service is up", body = ApiResponse<Value>)
    ),
    tag = "Status"
)]
pub async fn api_status(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "mams-portal",
        "environment": state.config.environment,
        "store_backend": state.config.store_backend,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}
