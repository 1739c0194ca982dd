//! Delegated target lookup.
//!
//! A lookup service decides which databases of a cluster carry a given label.
//! kustard only builds the request key (cluster short name and label) and
//! passes the answer through.

use crate::BoxError;
use crate::query::BoxFuture;
use crate::transport::{Transport, json_request};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Looks up target database names in an external service.
pub trait TargetProvider: Send + Sync {
    fn lookup<'a>(
        &'a self,
        endpoint: &'a str,
        cluster: &'a str,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, BoxError>>;
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    cluster: &'a str,
    label: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LookupResponse {
    Names(Vec<String>),
    Wrapped { databases: Vec<String> },
}

impl From<LookupResponse> for Vec<String> {
    fn from(response: LookupResponse) -> Self {
        match response {
            LookupResponse::Names(names) => names,
            LookupResponse::Wrapped { databases } => databases,
        }
    }
}

/// [`TargetProvider`] that POSTs `{"cluster": .., "label": ..}` to the
/// endpoint and expects a JSON array of names (or `{"databases": [..]}`).
#[derive(Clone)]
pub struct WebhookClient {
    transport: Arc<dyn Transport>,
}

impl WebhookClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn perform_query(
        &self,
        endpoint: &str,
        cluster: &str,
        label: &str,
    ) -> Result<Vec<String>, BoxError> {
        let request = json_request(
            Method::POST,
            endpoint,
            Some(&LookupRequest { cluster, label }),
        )?;
        let response = self.transport.send(request).await?.expect_success()?;
        let names: LookupResponse = response.json()?;
        Ok(names.into())
    }
}

impl TargetProvider for WebhookClient {
    fn lookup<'a>(
        &'a self,
        endpoint: &'a str,
        cluster: &'a str,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, BoxError>> {
        Box::pin(self.perform_query(endpoint, cluster, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportResponse;
    use bytes::Bytes;
    use reqwest::{Request, StatusCode};
    use std::sync::Mutex;

    struct Canned {
        status: StatusCode,
        body: &'static str,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Transport for Canned {
        fn send(&self, request: Request) -> BoxFuture<'_, Result<TransportResponse, BoxError>> {
            let body = request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            self.seen
                .lock()
                .unwrap()
                .push((request.url().to_string(), body));
            let response = TransportResponse {
                status: self.status,
                body: Bytes::from_static(self.body.as_bytes()),
            };
            Box::pin(async move { Ok(response) })
        }
    }

    fn canned(status: StatusCode, body: &'static str) -> Arc<Canned> {
        Arc::new(Canned {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_sends_cluster_and_label() {
        let transport = canned(StatusCode::OK, r#"["db2","db1"]"#);
        let client = WebhookClient::new(transport.clone());
        let names = client
            .lookup("https://lookup.example.com/targets", "fabrikam", "blue")
            .await
            .unwrap();
        assert_eq!(names, vec!["db2", "db1"]);

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "https://lookup.example.com/targets");
        assert_eq!(seen[0].1, r#"{"cluster":"fabrikam","label":"blue"}"#);
    }

    #[tokio::test]
    async fn test_accepts_wrapped_response() {
        let transport = canned(StatusCode::OK, r#"{"databases":["a"]}"#);
        let names = WebhookClient::new(transport)
            .lookup("https://lookup.example.com", "c", "")
            .await
            .unwrap();
        assert_eq!(names, vec!["a"]);
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let transport = canned(StatusCode::BAD_GATEWAY, "upstream down");
        let err = WebhookClient::new(transport)
            .lookup("https://lookup.example.com", "c", "l")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_malformed_body_fails() {
        let transport = canned(StatusCode::OK, r#"{"unexpected": true}"#);
        let result = WebhookClient::new(transport)
            .lookup("https://lookup.example.com", "c", "l")
            .await;
        assert!(result.is_err());
    }
}
