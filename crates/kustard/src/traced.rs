//! Traced query client wrapper.
//!
//! Wraps a [`QueryClient`] and logs every management call via tracing.

use crate::BoxError;
use crate::query::{BoxFuture, QueryClient, RowEvent, RowIterator, Stmt};
use tracing::{Instrument, Span};

/// A wrapper around a query client that opens a `kusto.mgmt` span per call.
///
/// The span records the endpoint, database and statement up front, and the
/// number of rows and inline errors once the iterator is stopped.
///
/// # Example
///
/// ```ignore
/// use kustard::{KustoClient, QueryClientExt};
///
/// let client = KustoClient::new(uri, transport).traced();
/// let mut cluster = Cluster::new(uri, client)?;
/// ```
pub struct TracedClient<C: QueryClient> {
    inner: C,
}

impl<C: QueryClient> TracedClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// Get the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: QueryClient> QueryClient for TracedClient<C> {
    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    fn mgmt<'a>(
        &'a self,
        database: &'a str,
        stmt: &'a Stmt,
    ) -> BoxFuture<'a, Result<Box<dyn RowIterator + 'a>, BoxError>> {
        let span = tracing::debug_span!(
            "kusto.mgmt",
            endpoint = %self.inner.endpoint(),
            database = %database,
            stmt = %stmt,
            rows = tracing::field::Empty,
            inline_errors = tracing::field::Empty,
        );
        Box::pin(async move {
            let inner = self.inner.mgmt(database, stmt).instrument(span.clone()).await?;
            Ok(Box::new(TracedRows {
                inner,
                span,
                rows: 0,
                inline_errors: 0,
            }) as Box<dyn RowIterator + 'a>)
        })
    }
}

struct TracedRows<'a> {
    inner: Box<dyn RowIterator + 'a>,
    span: Span,
    rows: u64,
    inline_errors: u64,
}

impl RowIterator for TracedRows<'_> {
    fn next_row(&mut self) -> BoxFuture<'_, Result<Option<RowEvent>, BoxError>> {
        Box::pin(async move {
            let next = self.inner.next_row().instrument(self.span.clone()).await;
            match &next {
                Ok(Some(RowEvent::Row(_))) => self.rows += 1,
                Ok(Some(RowEvent::Inline(_))) => self.inline_errors += 1,
                Ok(None) | Err(_) => {}
            }
            next
        })
    }

    fn stop(&mut self) {
        self.span.record("rows", self.rows);
        self.span.record("inline_errors", self.inline_errors);
        self.inner.stop();
    }
}

/// Extension trait to get a traced wrapper from a query client.
pub trait QueryClientExt: QueryClient + Sized {
    /// Wrap this client in a [`TracedClient`].
    fn traced(self) -> TracedClient<Self> {
        TracedClient::new(self)
    }
}

impl<C: QueryClient> QueryClientExt for C {}
