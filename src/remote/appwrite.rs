//! Appwrite REST client for documents, accounts and sessions.
//!
//! The session credential travels in the `x-fallback-cookies` header, which
//! the server hands out on session creation for clients without a browser
//! cookie jar.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{Account, Document, DocumentStore, Query, RetryPolicy, Session};
use crate::config::Config;
use crate::error::RemoteError;

const RESPONSE_FORMAT: &str = "1.5.0";
const FALLBACK_COOKIES: &str = "x-fallback-cookies";

/// `{"total": n, "documents": [...]}`
#[derive(Debug, Deserialize)]
struct DocumentList {
    documents: Vec<Document>,
}

/// Error body: `{"message": "...", "code": 401, "type": "user_unauthorized"}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct AppwriteClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    platform: String,
    retry: RetryPolicy,
    session: RwLock<Option<String>>,
}

impl AppwriteClient {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            platform: config.platform.clone(),
            retry: RetryPolicy::with_attempts(config.retry_attempts),
            session: RwLock::new(None),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn documents_path(database_id: &str, collection_id: &str) -> String {
        format!("/databases/{}/collections/{}/documents", database_id, collection_id)
    }

    async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header("x-appwrite-project", &self.project_id)
            .header("x-appwrite-response-format", RESPONSE_FORMAT)
            .header("origin", format!("appwrite-android://{}", self.platform));
        if let Some(token) = self.session.read().await.as_deref() {
            builder = builder.header(FALLBACK_COOKIES, token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send(builder).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    /// GET with bounded retry on transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let url = self.url(path);
        let mut attempt = 1;
        loop {
            let builder = self.request(Method::GET, &url).await.query(query);
            match self.send_json(builder).await {
                Err(err) if err.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(url = %url, attempt, delay_ms = delay.as_millis() as u64, error = %err, "Transient remote failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::CONFLICT => RemoteError::Conflict(message),
        _ => RemoteError::Service {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<Vec<Document>, RemoteError> {
        let params: Vec<(&str, String)> = queries.iter().map(|q| ("queries[]", q.to_wire())).collect();
        let list: DocumentList = self
            .get_json(&Self::documents_path(database_id, collection_id), &params)
            .await?;
        Ok(list.documents)
    }

    async fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Document, RemoteError> {
        let path = format!("{}/{}", Self::documents_path(database_id, collection_id), document_id);
        self.get_json(&path, &[]).await
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Document, RemoteError> {
        let url = self.url(&Self::documents_path(database_id, collection_id));
        let body = serde_json::json!({
            "documentId": document_id,
            "data": data,
        });
        let builder = self.request(Method::POST, &url).await.json(&body);
        self.send_json(builder).await
    }

    async fn create_account(
        &self,
        user_id: &str,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Account, RemoteError> {
        let url = self.url("/account");
        let body = serde_json::json!({
            "userId": user_id,
            "email": email,
            "password": password,
            "name": name,
        });
        let builder = self.request(Method::POST, &url).await.json(&body);
        self.send_json(builder).await
    }

    async fn get_account(&self) -> Result<Account, RemoteError> {
        self.get_json("/account", &[]).await
    }

    async fn create_email_session(&self, email: &str, password: &str) -> Result<Session, RemoteError> {
        let url = self.url("/account/sessions/email");
        let body = serde_json::json!({
            "email": email,
            "password": password,
        });
        let builder = self.request(Method::POST, &url).await.json(&body);
        let response = self.send(builder).await?;

        let token = response
            .headers()
            .get(FALLBACK_COOKIES)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if token.is_none() {
            warn!("Session created without a fallback cookie; later calls may be unauthenticated");
        }

        let session: Session = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        *self.session.write().await = token;

        info!(user_id = %session.user_id, "Session created");
        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), RemoteError> {
        let url = self.url(&format!("/account/sessions/{}", session_id));
        let builder = self.request(Method::DELETE, &url).await;
        self.send(builder).await?;
        if session_id == super::CURRENT_SESSION {
            *self.session.write().await = None;
        }
        Ok(())
    }

    fn avatar_initials_url(&self, name: &str) -> String {
        let mut url = match reqwest::Url::parse(&self.url("/avatars/initials")) {
            Ok(url) => url,
            Err(_) => return format!("{}/avatars/initials", self.endpoint),
        };
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("project", &self.project_id);
        url.to_string()
    }

    async fn session_token(&self) -> Option<String> {
        self.session.read().await.clone()
    }

    async fn restore_session(&self, token: Option<String>) {
        *self.session.write().await = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> AppwriteClient {
        let config = Config {
            endpoint: format!("http://localhost:{}/v1", server.port()),
            project_id: "proj".to_string(),
            ..Config::default()
        };
        AppwriteClient::new(&config).unwrap().with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        })
    }

    #[tokio::test]
    async fn test_list_documents_sends_project_and_query() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/databases/db/collections/users/documents")
                .header("x-appwrite-project", "proj")
                .query_param_exists("queries[]");
            then.status(200).json_body(json!({
                "total": 1,
                "documents": [{ "$id": "u-doc", "accountId": "acc-1", "username": "sam" }]
            }));
        });

        let client = client_for(&server);
        let docs = client
            .list_documents("db", "users", &[Query::equal("accountId", "acc-1")])
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "u-doc");
        assert_eq!(docs[0].field("username"), Some(&json!("sam")));
        mock.assert();
    }

    #[tokio::test]
    async fn test_get_document_not_found_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/databases/db/collections/tips/documents/nope");
            then.status(404).json_body(json!({
                "message": "Document with the requested ID could not be found.",
                "code": 404,
                "type": "document_not_found"
            }));
        });

        let client = client_for(&server);
        let err = client.get_document("db", "tips", "nope").await.unwrap_err();

        assert!(matches!(err, RemoteError::NotFound(msg) if msg.contains("could not be found")));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried_up_to_budget() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/databases/db/collections/tips/documents");
            then.status(503).body("unavailable");
        });

        let client = client_for(&server);
        let err = client.list_documents("db", "tips", &[]).await.unwrap_err();

        assert!(matches!(err, RemoteError::Service { status: 503, .. }));
        mock.assert_calls(3);
    }

    #[tokio::test]
    async fn test_writes_are_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/databases/db/collections/users/documents");
            then.status(500).json_body(json!({ "message": "boom", "code": 500 }));
        });

        let client = client_for(&server);
        let err = client
            .create_document("db", "users", "unique()", json!({ "username": "sam" }))
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::Service { status: 500, message } if message == "boom"));
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn test_session_cookie_is_captured_and_replayed() {
        let server = MockServer::start();
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/account/sessions/email")
                .json_body(json!({ "email": "sam@example.com", "password": "secret" }));
            then.status(201)
                .header(FALLBACK_COOKIES, r#"{"a_session_proj":"tok"}"#)
                .json_body(json!({ "$id": "sess-1", "userId": "acc-1" }));
        });
        let account = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/account")
                .header(FALLBACK_COOKIES, r#"{"a_session_proj":"tok"}"#);
            then.status(200)
                .json_body(json!({ "$id": "acc-1", "name": "sam", "email": "sam@example.com" }));
        });

        let client = client_for(&server);
        let session = client
            .create_email_session("sam@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(session.user_id, "acc-1");
        assert_eq!(
            client.session_token().await.as_deref(),
            Some(r#"{"a_session_proj":"tok"}"#)
        );

        let me = client.get_account().await.unwrap();
        assert_eq!(me.id, "acc-1");
        login.assert();
        account.assert();
    }

    #[tokio::test]
    async fn test_delete_current_session_forgets_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/v1/account/sessions/current");
            then.status(204);
        });

        let client = client_for(&server);
        client.restore_session(Some("tok".to_string())).await;
        client.delete_session("current").await.unwrap();

        assert_eq!(client.session_token().await, None);
        mock.assert();
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_error_variant() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/account");
            then.status(401).json_body(json!({
                "message": "User (role: guests) missing scope (account)",
                "code": 401
            }));
        });

        let client = client_for(&server);
        let err = client.get_account().await.unwrap_err();
        assert!(matches!(err, RemoteError::Unauthorized(_)));
    }

    #[test]
    fn test_avatar_initials_url() {
        let config = Config {
            endpoint: "https://cloud.example.com/v1".to_string(),
            project_id: "proj".to_string(),
            ..Config::default()
        };
        let client = AppwriteClient::new(&config).unwrap();
        assert_eq!(
            client.avatar_initials_url("Sam Lee"),
            "https://cloud.example.com/v1/avatars/initials?name=Sam+Lee&project=proj"
        );
    }
}
