//! Live database listing.

use crate::query::{RowEvent, RowIterator, SHOW_DATABASES, Stmt};
use crate::{Cluster, Error, Result};
use indexmap::IndexSet;
use regex::Regex;

/// Stops the wrapped iterator when dropped, whichever way the listing exits.
struct StopOnDrop<'a>(Box<dyn RowIterator + 'a>);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

impl Cluster {
    /// List the databases on this cluster whose name matches `pattern`.
    ///
    /// `pattern` is an unanchored regular expression; `""` matches every
    /// database. A malformed pattern fails before the cluster is contacted.
    ///
    /// Inline row errors and rows with a null or blank name are logged and
    /// skipped. A terminal error while iterating discards everything
    /// collected so far: the caller gets the error and no names.
    ///
    /// On success the full, unfiltered listing replaces
    /// [`Cluster::cached_databases`].
    pub async fn list_databases(&mut self, pattern: &str) -> Result<IndexSet<String>> {
        let filter = Regex::new(pattern).map_err(|e| {
            tracing::error!(%pattern, "pattern provided is not a valid regexp: {e}");
            Error::invalid_pattern(pattern, e)
        })?;

        let all = self.fetch_database_names().await?;
        let matched = all
            .iter()
            .filter(|name| filter.is_match(name))
            .cloned()
            .collect();
        self.set_cached_databases(all);
        Ok(matched)
    }

    async fn fetch_database_names(&self) -> Result<IndexSet<String>> {
        let query_error = |source| Error::Query {
            cluster: self.uri().to_string(),
            source,
        };

        let stmt = Stmt::new(SHOW_DATABASES);
        let iter = self.client().mgmt("", &stmt).await.map_err(|e| {
            tracing::error!(cluster = %self.name(), "failed to query mgmt api: {e}");
            query_error(e)
        })?;
        let mut rows = StopOnDrop(iter);

        let mut names = IndexSet::new();
        loop {
            match rows.0.next_row().await {
                Ok(Some(RowEvent::Row(row))) => match row.get(0) {
                    Some(name) if !name.trim().is_empty() => {
                        names.insert(name.to_string());
                    }
                    _ => tracing::warn!(cluster = %self.name(), "skipping row without a database name"),
                },
                Ok(Some(RowEvent::Inline(err))) => {
                    tracing::error!(cluster = %self.name(), "got inline error: {err}");
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(cluster = %self.name(), "failed to iterate results: {e}");
                    return Err(query_error(e));
                }
            }
        }

        tracing::debug!(cluster = %self.name(), count = names.len(), "listed databases");
        Ok(names)
    }
}
