use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use super::{AuthProvider, AuthSession, Filter, Select, StoreError, Table, TableStore};

const REST_PREFIX: &str = "rest/v1";
const AUTH_PREFIX: &str = "auth/v1";

/// Client for the hosted tables+auth service.
///
/// Every request carries the project's anonymous key both as `apikey` and as
/// the bearer token; sign-out substitutes the user's access token.
#[derive(Clone)]
pub struct HostedStore {
    client: Client,
    base_url: Url,
    anon_key: String,
}

impl HostedStore {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Request(format!("invalid store url {base_url}: {e}")))?;
        let client = Client::builder()
            .user_agent(concat!("mams-portal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            anon_key: anon_key.into(),
        })
    }

    fn endpoint(&self, prefix: &str, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            prefix,
            path
        )
    }

    fn authorized(&self, request: RequestBuilder, bearer: &str) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
    }

    fn table_request(&self, method: reqwest::Method, table: Table) -> RequestBuilder {
        let url = self.endpoint(REST_PREFIX, table.as_ref());
        self.authorized(self.client.request(method, url), &self.anon_key)
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            }),
        })
    }

    async fn rows(response: Response) -> Result<Vec<Value>, StoreError> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// Pulls the human-readable message out of an error body. The table API
/// answers `{"message": ..}`; the auth API uses `error_description` or `msg`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<TokenUser>,
}

#[derive(Deserialize)]
struct TokenUser {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[async_trait]
impl TableStore for HostedStore {
    #[instrument(skip(self), fields(table = %query.table))]
    async fn select(&self, query: &Select) -> Result<Vec<Value>, StoreError> {
        let mut params = vec![("select".to_string(), query.column_list())];
        params.extend(query.filters.iter().map(Filter::to_query_pair));

        let request = self.table_request(reqwest::Method::GET, query.table).query(&params);
        let rows = Self::rows(Self::send(request).await?).await?;
        debug!(rows = rows.len(), "select completed");
        Ok(rows)
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let request = self
            .table_request(reqwest::Method::POST, table)
            .header("Prefer", "return=representation")
            .json(&rows);
        Self::rows(Self::send(request).await?).await
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> Result<(), StoreError> {
        let request = self
            .table_request(reqwest::Method::PATCH, table)
            .header("Prefer", "return=minimal")
            .query(&[filter.to_query_pair()])
            .json(&patch);
        Self::send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for HostedStore {
    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        let url = self.endpoint(AUTH_PREFIX, "token");
        let request = self
            .authorized(self.client.post(url), &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));

        let token: TokenResponse = Self::send(request)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let (user_id, user_email) = token
            .user
            .map(|u| (u.id, u.email))
            .unwrap_or((None, None));

        Ok(AuthSession {
            access_token: token.access_token,
            token_type: token.token_type,
            expires_in: token.expires_in,
            user_id,
            email: user_email,
        })
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        let url = self.endpoint(AUTH_PREFIX, "logout");
        let request = self.authorized(self.client.post(url), access_token);
        Self::send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "anon-key";

    async fn store(server: &MockServer) -> HostedStore {
        HostedStore::new(&server.uri(), KEY).unwrap()
    }

    #[tokio::test]
    async fn select_sends_projection_filters_and_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("select", "service_id,name,role"))
            .and(query_param("role", "neq.Base Commander"))
            .and(header("apikey", KEY))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "service_id": "SVC-3", "name": "L. Park", "role": "Military Personnel" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let query = Select::from(Table::Users)
            .columns("service_id, name, role")
            .neq("role", "Base Commander");
        let rows = store(&server).await.select(&query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["service_id"], "SVC-3");
    }

    #[tokio::test]
    async fn insert_asks_for_the_stored_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/bases"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!([{ "name": "Alpha", "code": "A1" }])))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                { "id": 5, "name": "Alpha", "code": "A1", "location": null }
            ])))
            .mount(&server)
            .await;

        let inserted = store(&server)
            .await
            .insert(Table::Bases, vec![json!({ "name": "Alpha", "code": "A1" })])
            .await
            .unwrap();
        assert_eq!(inserted[0]["id"], 5);
    }

    #[tokio::test]
    async fn update_filters_by_key() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/inventory"))
            .and(query_param("id", "eq.inv-1"))
            .and(body_json(json!({ "current_stock": 13 })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .await
            .update(
                Table::Inventory,
                &Filter::eq("id", "inv-1"),
                json!({ "current_stock": 13 }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_requests_surface_the_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/consignment"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({ "message": "permission denied for table consignment" })),
            )
            .mount(&server)
            .await;

        let err = store(&server)
            .await
            .update(
                Table::Consignment,
                &Filter::eq("ticket_id", "T-1"),
                json!({ "status": "delivered" }),
            )
            .await
            .unwrap_err();

        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "permission denied for table consignment");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn password_sign_in_returns_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(body_json(json!({ "email": "a@b.mil", "password": "pw" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-token",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": { "id": "u-1", "email": "a@b.mil" }
            })))
            .mount(&server)
            .await;

        let session = store(&server)
            .await
            .sign_in_with_password("a@b.mil", "pw")
            .await
            .unwrap();
        assert_eq!(session.access_token, "jwt-token");
        assert_eq!(session.user_id.as_deref(), Some("u-1"));
        assert_eq!(session.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn bad_credentials_use_the_provider_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = store(&server)
            .await
            .sign_in_with_password("a@b.mil", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn sign_out_presents_the_user_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).await.sign_out("user-token").await.unwrap();
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HostedStore::new("not a url", KEY),
            Err(StoreError::Request(_))
        ));
    }
}
