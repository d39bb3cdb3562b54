use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{user::PROFILE_COLUMNS, Role, UserRow},
    store::{select_single, AuthProvider, Select, Table, TableStore},
};

/// Sign-in form
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "sysadmin1@defensehq.mil",
    "password": "hashed_pw",
    "role": "System Admin"
}))]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    /// Role the user claims; empty when nothing was selected
    #[serde(default)]
    pub role: String,
}

/// Identity handed from the login page to a dashboard. Clients echo it back
/// as query parameters; the portal never stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NavigationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NavigationState {
    fn from_profile(profile: &UserRow) -> Self {
        Self {
            service_id: Some(profile.service_id.clone()).filter(|s| !s.is_empty()),
            role: Some(profile.role.clone()),
            base_id: profile.base_id.clone(),
            name: profile.name.clone(),
        }
    }

    /// Query-string form of the state, without the leading `?`
    pub fn to_query(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("service_id", &self.service_id),
            ("role", &self.role),
            ("base_id", &self.base_id),
            ("name", &self.name),
        ] {
            if let Some(value) = value {
                query.append_pair(key, value);
            }
        }
        query.finish()
    }
}

/// Dashboard a resolved session lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Destination {
    #[serde(rename = "/admin-dashboard")]
    AdminDashboard,
    #[serde(rename = "/commander-dashboard")]
    CommanderDashboard,
    #[serde(rename = "/logistics-dashboard")]
    LogisticsDashboard,
    #[serde(rename = "/military-dashboard")]
    MilitaryDashboard,
}

impl Destination {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::SystemAdmin => Destination::AdminDashboard,
            Role::BaseCommander => Destination::CommanderDashboard,
            Role::LogisticsOfficer => Destination::LogisticsDashboard,
            Role::MilitaryPersonnel => Destination::MilitaryDashboard,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Destination::AdminDashboard => "/admin-dashboard",
            Destination::CommanderDashboard => "/commander-dashboard",
            Destination::LogisticsDashboard => "/logistics-dashboard",
            Destination::MilitaryDashboard => "/military-dashboard",
        }
    }
}

/// Successful login
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginOutcome {
    pub destination: Destination,
    /// Destination path with the navigation state as its query string
    pub location: String,
    pub state: NavigationState,
    /// Provider token, opaque to the portal; handed back on logout
    pub access_token: String,
}

/// Authenticates a user and checks the claimed role against the stored one.
#[derive(Clone)]
pub struct SessionResolver {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn TableStore>,
}

impl SessionResolver {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn TableStore>) -> Self {
        Self { auth, store }
    }

    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn resolve(&self, request: &LoginRequest) -> Result<LoginOutcome, ServiceError> {
        if request.role.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Please select a role".to_string(),
            ));
        }
        request.validate()?;

        let session = self
            .auth
            .sign_in_with_password(&request.email, &request.password)
            .await
            .map_err(|e| ServiceError::AuthError(e.to_string()))?;

        let query = Select::from(Table::Users)
            .columns(PROFILE_COLUMNS)
            .eq("email", request.email.as_str());
        let profile: UserRow = select_single(self.store.as_ref(), &query)
            .await
            .map_err(|e| {
                warn!(error = %e, "profile lookup failed");
                ServiceError::ProfileNotFound
            })?;

        // Compared as stored text; any other spelling is a mismatch.
        if profile.role != request.role {
            warn!(stored_role = %profile.role, "claimed role does not match profile");
            return Err(ServiceError::RoleMismatch(request.role.clone()));
        }
        let Some(role) = profile.parsed_role() else {
            warn!(stored_role = %profile.role, "profile role has no dashboard");
            return Err(ServiceError::RoleMismatch(request.role.clone()));
        };

        let destination = Destination::for_role(role);
        let state = NavigationState::from_profile(&profile);
        info!(destination = destination.path(), "login resolved");

        Ok(LoginOutcome {
            destination,
            location: format!("{}?{}", destination.path(), state.to_query()),
            state,
            access_token: session.access_token,
        })
    }

    /// Ends the provider session. Failures are logged and otherwise ignored;
    /// the caller always returns to the login page.
    #[instrument(skip_all)]
    pub async fn logout(&self, access_token: Option<&str>) {
        let Some(token) = access_token.filter(|t| !t.is_empty()) else {
            return;
        };
        if let Err(e) = self.auth.sign_out(token).await {
            warn!(error = %e, "sign-out failed");
        }
    }
}
