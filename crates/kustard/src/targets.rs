//! Target filters and resolved targets.

use indexmap::IndexSet;

/// Selects which databases of a cluster a schema change applies to.
///
/// Only one mode is meant to be set. When several are, the precedence is
/// `db`, then `dbs`, then `webhook`; with none set every database is
/// selected. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    /// Regular expression matched against live database names.
    pub db: Option<String>,
    /// Explicit database names, taken verbatim.
    pub dbs: Vec<String>,
    /// Endpoint of a lookup service that returns the names.
    pub webhook: Option<String>,
    /// Label sent to the lookup service alongside the cluster name.
    pub label: Option<String>,
}

/// The strategy a [`TargetFilter`] resolves with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStrategy<'a> {
    Pattern(&'a str),
    Explicit(&'a [String]),
    Webhook { endpoint: &'a str, label: &'a str },
    All,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl TargetFilter {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            db: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn explicit<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dbs: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn webhook(endpoint: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            webhook: Some(endpoint.into()),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// The strategy this filter resolves with, after precedence.
    pub fn strategy(&self) -> TargetStrategy<'_> {
        if let Some(pattern) = non_empty(&self.db) {
            TargetStrategy::Pattern(pattern)
        } else if !self.dbs.is_empty() {
            TargetStrategy::Explicit(&self.dbs)
        } else if let Some(endpoint) = non_empty(&self.webhook) {
            TargetStrategy::Webhook {
                endpoint,
                label: self.label.as_deref().unwrap_or_default(),
            }
        } else {
            TargetStrategy::All
        }
    }
}

/// Databases of one cluster that a schema change applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTargets {
    cluster_uri: String,
    databases: IndexSet<String>,
    applied: bool,
}

impl ClusterTargets {
    pub fn new<I, S>(cluster_uri: impl Into<String>, databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cluster_uri: cluster_uri.into(),
            databases: databases.into_iter().map(Into::into).collect(),
            applied: false,
        }
    }

    pub fn cluster_uri(&self) -> &str {
        &self.cluster_uri
    }

    /// Resolved names, deduplicated, in the order they were produced.
    pub fn databases(&self) -> &IndexSet<String> {
        &self.databases
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// Whether a job built from these targets has been applied successfully.
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub(crate) fn mark_applied(&mut self) {
        self.applied = true;
    }
}
