use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::NavigationState,
    errors::ServiceError,
    handlers::common::{created_response, success_response},
    models::{Base, CreateBaseRequest},
    services::dashboards::{
        admin::{ConsignmentLine, ConsignmentSaveResponse, InventoryLine, InventorySaveResponse},
        AdminTab, AdminView,
    },
    AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TabQuery {
    /// Tab to render from the cache; omit to (re)open the dashboard
    pub tab: Option<AdminTab>,
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin-dashboard", get(admin_dashboard))
        .route("/admin-dashboard/bases", post(create_base))
        .route(
            "/admin-dashboard/inventory/:id/edit",
            post(begin_inventory_edit).patch(update_inventory_edit),
        )
        .route("/admin-dashboard/inventory/:id/save", post(save_inventory))
        .route(
            "/admin-dashboard/consignment/:ticket_id/edit",
            post(begin_consignment_edit).patch(update_consignment_edit),
        )
        .route(
            "/admin-dashboard/consignment/:ticket_id/save",
            post(save_consignment),
        )
}

/// Open the admin dashboard, or switch tabs
///
/// Without `tab` every table is reloaded, edit buffers are discarded and a
/// delayed stock reconciliation is scheduled.
#[utoipa::path(
    get,
    path = "/admin-dashboard",
    params(NavigationState, TabQuery),
    responses(
        (status = 200, description = "Active tab of the admin dashboard", body = crate::ApiResponse<AdminView>)
    ),
    tag = "Admin"
)]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    Query(nav): Query<NavigationState>,
    Query(query): Query<TabQuery>,
) -> impl IntoResponse {
    let view = match query.tab {
        None => state.admin.mount(&nav, AdminTab::default()).await,
        Some(tab) => state.admin.view(&nav, tab).await,
    };
    success_response(view)
}

#[utoipa::path(
    post,
    path = "/admin-dashboard/bases",
    params(NavigationState),
    request_body = CreateBaseRequest,
    responses(
        (status = 201, description = "Base created and appended to the list", body = crate::ApiResponse<Base>),
        (status = 400, description = "Name or code missing", body = crate::errors::ErrorResponse),
        (status = 502, description = "Store rejected the insert", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn create_base(
    State(state): State<AppState>,
    Query(nav): Query<NavigationState>,
    Json(payload): Json<CreateBaseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let base = state.admin.create_base(&nav, &payload).await?;
    Ok(created_response(base))
}

/// Put an inventory row into Editing, seeding its buffer
#[utoipa::path(
    post,
    path = "/admin-dashboard/inventory/{id}/edit",
    params(("id" = String, Path, description = "Inventory row id"), NavigationState),
    responses(
        (status = 200, description = "Row is editing", body = crate::ApiResponse<InventoryLine>),
        (status = 404, description = "Row not cached", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn begin_inventory_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(nav): Query<NavigationState>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.admin.begin_inventory_edit(&nav, &id).await?;
    Ok(success_response(line))
}

#[utoipa::path(
    patch,
    path = "/admin-dashboard/inventory/{id}/edit",
    params(("id" = String, Path, description = "Inventory row id"), NavigationState),
    request_body = crate::models::InventoryEdit,
    responses(
        (status = 200, description = "Buffer updated", body = crate::ApiResponse<InventoryLine>),
        (status = 400, description = "Row is not being edited", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn update_inventory_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(nav): Query<NavigationState>,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.admin.update_inventory_edit(&nav, &id, &patch).await?;
    Ok(success_response(line))
}

/// Write an inventory row's buffer back to the store
#[utoipa::path(
    post,
    path = "/admin-dashboard/inventory/{id}/save",
    params(("id" = String, Path, description = "Inventory row id"), NavigationState),
    responses(
        (status = 200, description = "Saved, or nothing to save", body = crate::ApiResponse<InventorySaveResponse>),
        (status = 502, description = "Store rejected the update; row stays editing", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn save_inventory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(nav): Query<NavigationState>,
) -> Result<impl IntoResponse, ServiceError> {
    let saved = state.admin.save_inventory(&nav, &id).await?;
    Ok(success_response(saved))
}

#[utoipa::path(
    post,
    path = "/admin-dashboard/consignment/{ticket_id}/edit",
    params(("ticket_id" = String, Path, description = "Consignment ticket id"), NavigationState),
    responses(
        (status = 200, description = "Row is editing", body = crate::ApiResponse<ConsignmentLine>),
        (status = 404, description = "Row not cached", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn begin_consignment_edit(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
    Query(nav): Query<NavigationState>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.admin.begin_consignment_edit(&nav, &ticket_id).await?;
    Ok(success_response(line))
}

#[utoipa::path(
    patch,
    path = "/admin-dashboard/consignment/{ticket_id}/edit",
    params(("ticket_id" = String, Path, description = "Consignment ticket id"), NavigationState),
    request_body = crate::models::ConsignmentEdit,
    responses(
        (status = 200, description = "Buffer updated", body = crate::ApiResponse<ConsignmentLine>),
        (status = 400, description = "Row is not being edited", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn update_consignment_edit(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
    Query(nav): Query<NavigationState>,
    Json(patch): Json<Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state
        .admin
        .update_consignment_edit(&nav, &ticket_id, &patch)
        .await?;
    Ok(success_response(line))
}

/// Write a consignment row's buffer back, recording the admin as editor
#[utoipa::path(
    post,
    path = "/admin-dashboard/consignment/{ticket_id}/save",
    params(("ticket_id" = String, Path, description = "Consignment ticket id"), NavigationState),
    responses(
        (status = 200, description = "Saved, or nothing to save", body = crate::ApiResponse<ConsignmentSaveResponse>),
        (status = 502, description = "Store rejected the update; row stays editing", body = crate::errors::ErrorResponse)
    ),
    tag = "Admin"
)]
pub async fn save_consignment(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
    Query(nav): Query<NavigationState>,
) -> Result<impl IntoResponse, ServiceError> {
    let saved = state.admin.save_consignment(&nav, &ticket_id).await?;
    Ok(success_response(saved))
}
