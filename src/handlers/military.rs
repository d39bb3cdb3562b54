use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::{
    auth::NavigationState, handlers::common::success_response,
    services::dashboards::MilitaryView, AppState,
};

pub fn military_routes() -> Router<AppState> {
    Router::new().route("/military-dashboard", get(military_dashboard))
}

#[utoipa::path(
    get,
    path = "/military-dashboard",
    params(NavigationState),
    responses(
        (status = 200, description = "Base card and shelf inventory", body = crate::ApiResponse<MilitaryView>)
    ),
    tag = "Military"
)]
pub async fn military_dashboard(
    State(state): State<AppState>,
    Query(nav): Query<NavigationState>,
) -> impl IntoResponse {
    success_response(state.military.load(&nav).await)
}
