use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    middleware,
    response::Response,
    Router,
};
use mams_portal::{
    auth::NavigationState,
    config::AppConfig,
    middleware_helpers::request_id::request_id_middleware,
    portal_routes,
    store::{demo, InMemoryStore},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

/// Helper harness running the portal router over the seeded in-memory store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    /// Fresh demo data; reconciliation passes run without delay.
    pub fn new() -> Self {
        let mut cfg = AppConfig::in_memory();
        cfg.reconcile_initial_delay_ms = 0;
        cfg.reconcile_after_save_delay_ms = 0;

        let store = Arc::new(demo::seeded_store());
        let state = AppState::new(cfg, store.clone(), store.clone());
        let router = portal_routes()
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(state.clone());

        Self {
            router,
            state,
            store,
        }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Logs a demo account in and returns the login payload's `data`.
    pub async fn login(&self, email: &str, role: &str) -> Value {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(serde_json::json!({
                    "email": email,
                    "password": demo::DEMO_PASSWORD,
                    "role": role,
                })),
            )
            .await;
        assert_eq!(response.status(), 200, "demo login should succeed");
        response_json(response).await["data"].take()
    }

    /// Waits for the admin's pending reconciliation pass.
    pub async fn settle_admin(&self, nav: &NavigationState) {
        self.state.admin.settle(nav).await;
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub fn admin_nav() -> NavigationState {
    NavigationState {
        service_id: Some("SA-0001".into()),
        role: Some("System Admin".into()),
        base_id: Some("1".into()),
        name: Some("R. Hale".into()),
    }
}

pub fn commander_nav() -> NavigationState {
    NavigationState {
        service_id: Some("BC-0107".into()),
        role: Some("Base Commander".into()),
        base_id: Some("2".into()),
        name: Some("E. Johansen".into()),
    }
}
