use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use crate::{
    auth::NavigationState,
    errors::ServiceError,
    handlers::common::{created_response, success_response},
    models::CreateConsignmentRequest,
    services::dashboards::{CommanderView, CreatedConsignment},
    AppState,
};

pub fn commander_routes() -> Router<AppState> {
    Router::new()
        .route("/commander-dashboard", get(commander_dashboard))
        .route("/commander-dashboard/consignments", post(create_consignment))
}

/// Bases, own-base inventory and assignable officers
#[utoipa::path(
    get,
    path = "/commander-dashboard",
    params(NavigationState),
    responses(
        (status = 200, description = "Commander overview", body = crate::ApiResponse<CommanderView>)
    ),
    tag = "Commander"
)]
pub async fn commander_dashboard(
    State(state): State<AppState>,
    Query(nav): Query<NavigationState>,
) -> impl IntoResponse {
    success_response(state.commander.load(&nav).await)
}

/// Create a consignment from the commander's base
#[utoipa::path(
    post,
    path = "/commander-dashboard/consignments",
    params(NavigationState),
    request_body = CreateConsignmentRequest,
    responses(
        (status = 201, description = "Consignment created", body = crate::ApiResponse<CreatedConsignment>),
        (status = 400, description = "Please fill all fields correctly.", body = crate::errors::ErrorResponse),
        (status = 502, description = "Store rejected the insert", body = crate::errors::ErrorResponse)
    ),
    tag = "Commander"
)]
pub async fn create_consignment(
    State(state): State<AppState>,
    Query(nav): Query<NavigationState>,
    Json(payload): Json<CreateConsignmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.commander.create_consignment(&nav, &payload).await?;
    Ok(created_response(created))
}
