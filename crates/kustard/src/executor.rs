//! Handing execution configurations to the apply engine.

use crate::builder::ExecutionConfiguration;
use crate::query::BoxFuture;
use crate::schema::JobFileRef;
use crate::{BoxError, Error, Result};
use std::sync::Arc;

/// The external engine that diffs and applies a job file.
pub trait ApplyEngine: Send + Sync {
    fn apply<'a>(&'a self, job_file: &'a JobFileRef) -> BoxFuture<'a, Result<(), BoxError>>;
}

/// Runs execution configurations. Failures are reported as-is; retrying is
/// up to the caller.
#[derive(Clone)]
pub struct JobExecutor {
    engine: Arc<dyn ApplyEngine>,
}

impl JobExecutor {
    pub fn new(engine: Arc<dyn ApplyEngine>) -> Self {
        Self { engine }
    }

    pub async fn execute(&self, config: ExecutionConfiguration) -> Result<()> {
        let job_file = config.job_file();
        tracing::info!(%job_file, schema_file = %config.schema_file(), "applying job");

        self.engine.apply(job_file).await.map_err(|source| {
            tracing::error!(%job_file, "apply engine failed: {source}");
            Error::Execution {
                job_file: job_file.path().to_owned(),
                source,
            }
        })
    }
}
