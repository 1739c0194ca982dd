//! HTTP transport shared by the Kusto client, the lookup webhook and the
//! schema registry client.
//!
//! Callers depend on the narrow [`Transport`] trait (send a request, get a
//! status and a body) rather than on a concrete client, so tests can swap in
//! a fake without a network.

use crate::BoxError;
use crate::query::BoxFuture;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Statuses the transport retries on its own.
pub const RETRY_STATUS_CODES: [StatusCode; 6] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Returned when a response has an unexpected status.
#[derive(Debug, Error)]
#[error("unexpected status {status}: {body}")]
pub struct StatusError {
    pub status: StatusCode,
    pub body: String,
}

impl TransportResponse {
    /// Fail unless the status is `expected`.
    pub fn expect_status(self, expected: StatusCode) -> Result<Self, StatusError> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(self.into_status_error())
        }
    }

    /// Fail unless the status is 2xx.
    pub fn expect_success(self) -> Result<Self, StatusError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.into_status_error())
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    fn into_status_error(self) -> StatusError {
        StatusError {
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        }
    }
}

/// Sends HTTP requests.
pub trait Transport: Send + Sync {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<TransportResponse, BoxError>>;
}

/// Build a request, with `body` serialized as JSON when present.
pub fn json_request<T: Serialize + ?Sized>(
    method: Method,
    url: &str,
    body: Option<&T>,
) -> Result<Request, BoxError> {
    let mut request = Request::new(method, Url::parse(url)?);
    if let Some(body) = body {
        let bytes = serde_json::to_vec(body)?;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *request.body_mut() = Some(bytes.into());
    }
    Ok(request)
}

/// How many times to retry a response with a status in
/// [`RETRY_STATUS_CODES`], and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// [`Transport`] backed by a `reqwest::Client`.
///
/// Attaches a bearer token when one is configured and retries retryable
/// statuses according to its [`RetryPolicy`]. Requests with streaming bodies
/// cannot be cloned and are sent once.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    token: Option<String>,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            token: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn send_with_retry(&self, mut request: Request) -> Result<TransportResponse, BoxError> {
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let mut attempt = 0;
        loop {
            let retry = if attempt < self.retry.attempts {
                request.try_clone()
            } else {
                None
            };

            let response = self.client.execute(request).await?;
            let status = response.status();

            if let Some(next) = retry.filter(|_| RETRY_STATUS_CODES.contains(&status)) {
                attempt += 1;
                tracing::warn!(%status, attempt, "retrying request");
                tokio::time::sleep(self.retry.delay).await;
                request = next;
                continue;
            }

            let body = response.bytes().await?;
            return Ok(TransportResponse { status, body });
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<TransportResponse, BoxError>> {
        Box::pin(self.send_with_retry(request))
    }
}
