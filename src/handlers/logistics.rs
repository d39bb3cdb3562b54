use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{
    auth::NavigationState, handlers::common::success_response,
    services::dashboards::LogisticsView, AppState,
};

pub fn logistics_routes() -> Router<AppState> {
    Router::new().route("/logistics-dashboard", get(logistics_dashboard))
}

/// Stock and outgoing consignments of the officer's base
#[utoipa::path(
    get,
    path = "/logistics-dashboard",
    params(NavigationState),
    responses(
        (status = 200, description = "Logistics overview", body = crate::ApiResponse<LogisticsView>)
    ),
    tag = "Logistics"
)]
pub async fn logistics_dashboard(
    State(state): State<AppState>,
    Query(nav): Query<NavigationState>,
) -> impl IntoResponse {
    success_response(state.logistics.load(&nav).await)
}
