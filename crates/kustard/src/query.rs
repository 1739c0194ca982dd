//! Query capability consumed by the database catalog.
//!
//! A [`QueryClient`] runs a management statement against a cluster and hands
//! back a [`RowIterator`]. Iterators yield rows or inline (per-row) errors; an
//! `Err` from [`RowIterator::next_row`] is terminal. Callers must call
//! [`RowIterator::stop`] on every exit path so server-side cursors are released.

use crate::BoxError;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future used by the capability traits so they stay object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Lists every database of a cluster, one name per row.
pub const SHOW_DATABASES: &str = ".show databases | project DatabaseName";

/// A management statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt(String);

impl Stmt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A result row, with every cell rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Cell at `idx`, if the row has that many columns.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// An error reported in place of a row. The stream continues after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineError {
    pub message: String,
}

impl fmt::Display for InlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// One item of a row stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    Row(Row),
    Inline(InlineError),
}

/// A stream of rows produced by a management call.
pub trait RowIterator: Send {
    /// Next row or inline error; `Ok(None)` once exhausted, `Err` on a
    /// terminal failure.
    fn next_row(&mut self) -> BoxFuture<'_, Result<Option<RowEvent>, BoxError>>;

    /// Release the iterator. Called exactly once, on every exit path.
    fn stop(&mut self);
}

/// Something that can run management statements against one cluster.
///
/// Implementations own their transport; a `Cluster` owns its client
/// exclusively, so no state is shared between clusters.
pub trait QueryClient: Send + Sync {
    /// The cluster URI this client talks to.
    fn endpoint(&self) -> &str;

    /// Run a management statement against `database` (`""` for cluster scope).
    fn mgmt<'a>(
        &'a self,
        database: &'a str,
        stmt: &'a Stmt,
    ) -> BoxFuture<'a, Result<Box<dyn RowIterator + 'a>, BoxError>>;
}

/// A [`RowIterator`] over rows that have already been received.
///
/// A queued `Err` is delivered as the terminal error; anything queued after it
/// is discarded.
pub struct BufferedRows {
    events: VecDeque<Result<RowEvent, BoxError>>,
    stopped: bool,
}

impl BufferedRows {
    pub fn new(events: impl IntoIterator<Item = Result<RowEvent, BoxError>>) -> Self {
        Self {
            events: events.into_iter().collect(),
            stopped: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn advance(&mut self) -> Result<Option<RowEvent>, BoxError> {
        if self.stopped {
            return Ok(None);
        }
        match self.events.pop_front() {
            Some(Ok(event)) => Ok(Some(event)),
            Some(Err(e)) => {
                self.events.clear();
                Err(e)
            }
            None => Ok(None),
        }
    }
}

impl RowIterator for BufferedRows {
    fn next_row(&mut self) -> BoxFuture<'_, Result<Option<RowEvent>, BoxError>> {
        let next = self.advance();
        Box::pin(std::future::ready(next))
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.events.clear();
    }
}
