use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MAMS Portal",
        version = "0.1.0",
        description = r#"
# Military Asset Management System portal

Role-scoped access to bases, users, inventory and inter-base consignments.

## Identity

`POST /auth/login` returns a `location` such as
`/admin-dashboard?service_id=SA-0001&role=System%20Admin&base_id=1&name=R.%20Hale`.
Dashboards read `service_id`, `role`, `base_id` and `name` from the query
string; the portal keeps no session of its own.

## Error Handling

Failed actions return a consistent body with a user-visible message:

```json
{
  "error": "Forbidden",
  "message": "You are not assigned the role \"System Admin\".",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-03-09T10:30:00.000Z"
}
```

Dashboard reads never fail the request; a section that could not be loaded
is returned empty.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Login form, sign-in and sign-out"),
        (name = "Admin", description = "System admin dashboard with inline editing"),
        (name = "Commander", description = "Base commander overview and consignments"),
        (name = "Logistics", description = "Logistics officer stock and tickets"),
        (name = "Military", description = "Personnel view of their base"),
        (name = "Status", description = "Service status")
    ),
    paths(
        // Auth
        crate::handlers::auth::login_form,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,

        // Admin
        crate::handlers::admin::admin_dashboard,
        crate::handlers::admin::create_base,
        crate::handlers::admin::begin_inventory_edit,
        crate::handlers::admin::update_inventory_edit,
        crate::handlers::admin::save_inventory,
        crate::handlers::admin::begin_consignment_edit,
        crate::handlers::admin::update_consignment_edit,
        crate::handlers::admin::save_consignment,

        // Role dashboards
        crate::handlers::commander::commander_dashboard,
        crate::handlers::commander::create_consignment,
        crate::handlers::logistics::logistics_dashboard,
        crate::handlers::military::military_dashboard,

        crate::api_status,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::auth::NavigationState,
            crate::auth::Destination,
            crate::models::Role,
            crate::models::ConsignmentStatus,
            crate::services::RowMode,
            crate::services::dashboards::AdminTab,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_portal_route() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("MAMS Portal"));
        for path in [
            "/auth/login",
            "/auth/logout",
            "/admin-dashboard",
            "/admin-dashboard/inventory/{id}/save",
            "/admin-dashboard/consignment/{ticket_id}/edit",
            "/commander-dashboard/consignments",
            "/logistics-dashboard",
            "/military-dashboard",
            "/status",
        ] {
            assert!(
                openapi.paths.paths.contains_key(path),
                "missing path {path}"
            );
        }
    }
}
