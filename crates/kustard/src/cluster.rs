//! Clusters and their identity.

use crate::query::QueryClient;
use crate::{Error, Result};
use indexmap::IndexSet;
use std::fmt;

const SCHEME: &str = "https://";

/// Extract the short name of a cluster from its URI.
///
/// The short name is the first DNS label after the scheme:
/// `https://fabrikam.kusto.windows.net` is `fabrikam`. URIs without the
/// `https://` prefix or with an empty first label are rejected.
pub fn cluster_name_from_uri(uri: &str) -> Result<&str> {
    let rest = uri.strip_prefix(SCHEME).ok_or_else(|| Error::InvalidCluster {
        uri: uri.to_string(),
        reason: "missing https:// scheme",
    })?;
    let name = rest
        .split(['.', '/', ':'])
        .next()
        .unwrap_or_default();
    if name.is_empty() {
        return Err(Error::InvalidCluster {
            uri: uri.to_string(),
            reason: "empty host name",
        });
    }
    Ok(name)
}

/// A single Kusto cluster hosting many databases.
///
/// A cluster owns its query client exclusively. Operations that talk to the
/// cluster take `&mut self`, so calls against one instance are serialized;
/// independent instances can be driven concurrently.
pub struct Cluster {
    uri: String,
    name: String,
    client: Box<dyn QueryClient>,
    databases: Option<IndexSet<String>>,
}

impl Cluster {
    /// Create a cluster from its URI and a client connected to it.
    pub fn new(uri: impl Into<String>, client: impl QueryClient + 'static) -> Result<Self> {
        Self::with_client(uri, Box::new(client))
    }

    pub fn with_client(uri: impl Into<String>, client: Box<dyn QueryClient>) -> Result<Self> {
        let uri = uri.into();
        let name = cluster_name_from_uri(&uri)?.to_string();
        Ok(Self {
            uri,
            name,
            client,
            databases: None,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Short name, e.g. `fabrikam` for `https://fabrikam.kusto.windows.net`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn client(&self) -> &dyn QueryClient {
        self.client.as_ref()
    }

    /// Every database seen by the last successful listing, if any.
    pub fn cached_databases(&self) -> Option<&IndexSet<String>> {
        self.databases.as_ref()
    }

    pub(crate) fn set_cached_databases(&mut self, databases: IndexSet<String>) {
        self.databases = Some(databases);
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("endpoint", &self.client.endpoint())
            .field("databases", &self.databases)
            .finish()
    }
}
