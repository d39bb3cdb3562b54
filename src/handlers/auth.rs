use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::{LoginOutcome, LoginRequest, NavigationState},
    errors::ServiceError,
    handlers::common::success_response,
    models::Role,
    store::demo::{DemoAccount, DEMO_ACCOUNTS},
    AppState,
};

/// A login that pre-fills the form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DemoLogin {
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl From<&DemoAccount> for DemoLogin {
    fn from(account: &DemoAccount) -> Self {
        Self {
            email: account.email.to_string(),
            password: account.password.to_string(),
            role: account.role,
        }
    }
}

/// What the login page needs to render its form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginForm {
    pub roles: Vec<Role>,
    pub demo_accounts: Vec<DemoLogin>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// Provider token returned by login
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub location: String,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(login_form))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Login form descriptor: selectable roles and demo accounts
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Roles and demo accounts", body = crate::ApiResponse<LoginForm>)
    ),
    tag = "Auth"
)]
pub async fn login_form() -> impl IntoResponse {
    success_response(LoginForm {
        roles: Role::iter().collect(),
        demo_accounts: DEMO_ACCOUNTS.iter().map(DemoLogin::from).collect(),
    })
}

/// Sign in and resolve the dashboard for the claimed role
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; navigate to `location`", body = crate::ApiResponse<LoginOutcome>),
        (status = 400, description = "No role selected or form incomplete", body = crate::errors::ErrorResponse),
        (status = 401, description = "Credentials rejected or no user record", body = crate::errors::ErrorResponse),
        (status = 403, description = "Claimed role differs from the stored role", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state.sessions.resolve(&payload).await?;
    info!(location = %outcome.location, "user logged in");
    Ok(success_response(outcome))
}

/// End the provider session and drop the admin workspace held for the
/// navigating user; always navigates back to the login page
#[utoipa::path(
    post,
    path = "/auth/logout",
    params(NavigationState),
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Signed out", body = crate::ApiResponse<LogoutResponse>)
    ),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    Query(nav): Query<NavigationState>,
    payload: Option<Json<LogoutRequest>>,
) -> impl IntoResponse {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    state.sessions.logout(request.access_token.as_deref()).await;
    state.admin.evict(&nav);
    success_response(LogoutResponse {
        location: "/".to_string(),
    })
}
