//! Target resolution: which databases of a cluster a change applies to.

use crate::targets::{ClusterTargets, TargetFilter, TargetStrategy};
use crate::webhook::TargetProvider;
use crate::{Cluster, Error, Result};
use indexmap::IndexSet;
use std::sync::Arc;

/// Resolves a [`TargetFilter`] against a cluster.
///
/// Strategies, in precedence order:
///
/// 1. `db`: live databases matching the pattern.
/// 2. `dbs`: the listed names, verbatim, without checking the cluster.
/// 3. `webhook`: whatever the lookup service returns for
///    (cluster short name, label).
/// 4. nothing set: every live database.
///
/// Failures short-circuit; a failed resolution never yields a partial set.
#[derive(Clone)]
pub struct TargetResolver {
    provider: Arc<dyn TargetProvider>,
    allow_implicit_all: bool,
}

impl TargetResolver {
    pub fn new(provider: Arc<dyn TargetProvider>) -> Self {
        Self {
            provider,
            allow_implicit_all: true,
        }
    }

    /// Whether an empty filter may select every database (the default).
    ///
    /// When disabled, an empty filter fails with [`Error::InvalidFilter`].
    pub fn allow_implicit_all(mut self, allow: bool) -> Self {
        self.allow_implicit_all = allow;
        self
    }

    pub async fn resolve(
        &self,
        cluster: &mut Cluster,
        filter: &TargetFilter,
    ) -> Result<ClusterTargets> {
        let dbs: Result<IndexSet<String>> = match filter.strategy() {
            TargetStrategy::Pattern(pattern) => cluster.list_databases(pattern).await,
            TargetStrategy::Explicit(names) => Ok(names.iter().cloned().collect()),
            TargetStrategy::Webhook { endpoint, label } => self
                .provider
                .lookup(endpoint, cluster.name(), label)
                .await
                .map(|names| names.into_iter().collect())
                .map_err(|source| Error::Lookup {
                    endpoint: endpoint.to_string(),
                    cluster: cluster.name().to_string(),
                    label: label.to_string(),
                    source,
                }),
            TargetStrategy::All if !self.allow_implicit_all => Err(Error::InvalidFilter {
                filter: String::new(),
                reason: "no target filter set and selecting every database is disabled"
                    .to_string(),
                source: None,
            }),
            TargetStrategy::All => {
                tracing::warn!(
                    cluster = %cluster.name(),
                    "missing db filter - taking all dbs in the cluster"
                );
                cluster.list_databases("").await
            }
        };

        let dbs = dbs.inspect_err(|e| {
            tracing::error!(cluster = %cluster.name(), "failed retrieving list of dbs from cluster: {e}");
        })?;

        tracing::debug!(cluster = %cluster.name(), count = dbs.len(), "resolved targets");
        Ok(ClusterTargets::new(cluster.uri(), dbs))
    }
}
