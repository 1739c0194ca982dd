//! Fakes for the capability traits, shared by the integration tests.

#![allow(dead_code)]

use kustard::query::{BufferedRows, InlineError, Row};
use kustard::{
    ApplyEngine, BoxError, BoxFuture, Cluster, JobFileRef, QueryClient, RowEvent, RowIterator,
    Stmt, TargetProvider,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CLUSTER_URI: &str = "https://fabrikam.kusto.windows.net";

/// One scripted row of a `.show databases` answer.
#[derive(Debug, Clone)]
pub enum Scripted {
    Db(String),
    Inline(String),
    Fail(String),
}

pub fn dbs<I, S>(names: I) -> Vec<Scripted>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(|n| Scripted::Db(n.into())).collect()
}

#[derive(Debug, Default)]
pub struct Counters {
    pub mgmt_calls: AtomicUsize,
    pub stops: AtomicUsize,
}

impl Counters {
    pub fn mgmt_calls(&self) -> usize {
        self.mgmt_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Query client answering every statement with the same scripted rows.
pub struct ScriptedClient {
    rows: Vec<Scripted>,
    counters: Arc<Counters>,
}

struct CountingRows {
    inner: BufferedRows,
    counters: Arc<Counters>,
}

impl RowIterator for CountingRows {
    fn next_row(&mut self) -> BoxFuture<'_, Result<Option<RowEvent>, BoxError>> {
        self.inner.next_row()
    }

    fn stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        self.inner.stop();
    }
}

impl QueryClient for ScriptedClient {
    fn endpoint(&self) -> &str {
        CLUSTER_URI
    }

    fn mgmt<'a>(
        &'a self,
        _database: &'a str,
        _stmt: &'a Stmt,
    ) -> BoxFuture<'a, Result<Box<dyn RowIterator + 'a>, BoxError>> {
        self.counters.mgmt_calls.fetch_add(1, Ordering::SeqCst);
        let events = self.rows.iter().map(|row| match row {
            Scripted::Db(name) => Ok(RowEvent::Row(Row::new(vec![name.clone()]))),
            Scripted::Inline(message) => Ok(RowEvent::Inline(InlineError {
                message: message.clone(),
            })),
            Scripted::Fail(message) => Err(BoxError::from(message.clone())),
        });
        let rows: Box<dyn RowIterator + 'a> = Box::new(CountingRows {
            inner: BufferedRows::new(events.collect::<Vec<_>>()),
            counters: self.counters.clone(),
        });
        Box::pin(async move { Ok(rows) })
    }
}

/// A cluster backed by [`ScriptedClient`], plus its call counters.
pub fn scripted_cluster(rows: Vec<Scripted>) -> (Cluster, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let client = ScriptedClient {
        rows,
        counters: counters.clone(),
    };
    let cluster = Cluster::new(CLUSTER_URI, client).expect("valid cluster uri");
    (cluster, counters)
}

/// Target provider returning fixed names and recording its requests.
#[derive(Default)]
pub struct RecordingProvider {
    pub answer: Vec<String>,
    pub fail: bool,
    pub calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingProvider {
    pub fn answering<I, S>(names: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            answer: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl TargetProvider for RecordingProvider {
    fn lookup<'a>(
        &'a self,
        endpoint: &'a str,
        cluster: &'a str,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<String>, BoxError>> {
        self.calls.lock().unwrap().push((
            endpoint.to_string(),
            cluster.to_string(),
            label.to_string(),
        ));
        let result = if self.fail {
            Err(BoxError::from("lookup service unavailable"))
        } else {
            Ok(self.answer.clone())
        };
        Box::pin(async move { result })
    }
}

/// Apply engine recording the job files it was handed.
#[derive(Default)]
pub struct RecordingEngine {
    pub fail: bool,
    pub applied: Mutex<Vec<JobFileRef>>,
}

impl RecordingEngine {
    pub fn applied(&self) -> Vec<JobFileRef> {
        self.applied.lock().unwrap().clone()
    }
}

impl ApplyEngine for RecordingEngine {
    fn apply<'a>(&'a self, job_file: &'a JobFileRef) -> BoxFuture<'a, Result<(), BoxError>> {
        self.applied.lock().unwrap().push(job_file.clone());
        let result = if self.fail {
            Err(BoxError::from("delta-kusto exited with 1"))
        } else {
            Ok(())
        };
        Box::pin(async move { result })
    }
}
