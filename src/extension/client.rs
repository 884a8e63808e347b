//! Typed reqwest client for the backend, sending the session cookies the
//! jar holds for the backend host.

use super::auth::{IdentityClient, IdentityOutcome};
use super::cookies::CookieStore;
use crate::api::{
    DeleteResponse, ErrorBody, QueryEnvelope, QueryRecord, QuerySubmission, UserInfo,
};
use crate::error::ClientError;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The overall timeout has to cover a full server-side generation.
pub fn build_backend_client() -> Client {
    build_backend_client_with_timeout(120)
}

pub fn build_backend_client_with_timeout(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub struct BackendClient {
    base: Url,
    client: Client,
    cookies: Arc<dyn CookieStore>,
}

impl BackendClient {
    pub fn new(base: Url, cookies: Arc<dyn CookieStore>) -> Self {
        Self::with_client(base, cookies, build_backend_client())
    }

    pub fn with_client(base: Url, cookies: Arc<dyn CookieStore>, client: Client) -> Self {
        Self {
            base,
            client,
            cookies,
        }
    }

    /// Host the session cookies are scoped to.
    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or("localhost")
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        let now = Utc::now();
        let cookie_header = self
            .cookies
            .cookies_for_domain(self.host())
            .iter()
            .filter(|c| c.is_live_at(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        if cookie_header.is_empty() {
            request
        } else {
            request.header(header::COOKIE, cookie_header)
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        self.with_session(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    pub async fn submit_query(
        &self,
        submission: &QuerySubmission,
    ) -> Result<QueryRecord, ClientError> {
        let url = self.endpoint("/api/query")?;
        let response = self.send(self.client.post(url).json(submission)).await?;
        let envelope: QueryEnvelope = decode(response).await?;
        Ok(envelope.query)
    }

    pub async fn get_query(&self, id: &str) -> Result<QueryRecord, ClientError> {
        let url = self.endpoint("/api/query")?;
        let response = self
            .send(self.client.get(url).query(&[("id", id)]))
            .await?;
        decode(response).await
    }

    pub async fn list_queries(&self) -> Result<Vec<QueryRecord>, ClientError> {
        let url = self.endpoint("/api/query")?;
        let response = self.send(self.client.get(url)).await?;
        decode(response).await
    }

    pub async fn delete_query(&self, id: &str) -> Result<DeleteResponse, ClientError> {
        let url = self.endpoint(&format!("/api/query/{id}"))?;
        let response = self.send(self.client.delete(url)).await?;
        decode(response).await
    }

    pub async fn current_user(&self) -> IdentityOutcome {
        let url = match self.endpoint("/api/user") {
            Ok(url) => url,
            Err(e) => return IdentityOutcome::Transient(e.to_string()),
        };
        let response = match self.send(self.client.get(url)).await {
            Ok(response) => response,
            Err(e) => return IdentityOutcome::Transient(e.to_string()),
        };
        match response.status() {
            StatusCode::UNAUTHORIZED => IdentityOutcome::Unauthenticated,
            status if status.is_success() => match response.json::<UserInfo>().await {
                Ok(user) => IdentityOutcome::Authenticated(user),
                Err(e) => IdentityOutcome::Transient(format!("malformed user payload: {e}")),
            },
            status => IdentityOutcome::Transient(format!("identity endpoint returned {status}")),
        }
    }
}

impl IdentityClient for BackendClient {
    fn fetch_user(&self) -> Pin<Box<dyn Future<Output = IdentityOutcome> + Send + '_>> {
        Box::pin(self.current_user())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Transport(format!("malformed response: {e}")));
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("HTTP error! status: {status}"));

    Err(match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
        StatusCode::NOT_FOUND => ClientError::NotFound,
        StatusCode::BAD_REQUEST => ClientError::Validation(message),
        StatusCode::BAD_GATEWAY => ClientError::UpstreamGeneration(message),
        _ => ClientError::Transport(message),
    })
}
