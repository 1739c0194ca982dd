//! Event Hubs schema registry: list the schema groups of a namespace.

use crate::BoxError;
use crate::transport::{Transport, json_request};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

pub const SCHEMA_GROUPS_API_VERSION: &str = "2021-10";

/// Schema group identifiers, as returned by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaGroups {
    #[serde(rename = "schemaGroups", default)]
    pub schema_groups: Vec<String>,
}

#[derive(Clone)]
pub struct SchemaGroupsClient {
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl SchemaGroupsClient {
    /// `endpoint` is the namespace host, e.g. `myns.servicebus.windows.net`.
    /// A leading `https://` is accepted and ignored.
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    pub fn url(&self) -> String {
        let host = self.endpoint.trim_start_matches("https://");
        format!(
            "https://{}/$schemaGroups?api-version={SCHEMA_GROUPS_API_VERSION}",
            host.trim_end_matches('/')
        )
    }

    pub async fn list(&self) -> Result<SchemaGroups, BoxError> {
        let request = json_request::<()>(Method::GET, &self.url(), None)?;
        let response = self
            .transport
            .send(request)
            .await?
            .expect_status(StatusCode::OK)?;
        let groups: SchemaGroups = response.json()?;
        tracing::debug!(endpoint = %self.endpoint, count = groups.schema_groups.len(), "listed schema groups");
        Ok(groups)
    }
}
