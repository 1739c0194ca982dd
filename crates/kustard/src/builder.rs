//! Assembling execution configurations from resolved targets.

use crate::BoxError;
use crate::query::BoxFuture;
use crate::schema::{JobFileRef, SchemaDefinition, SchemaFileRef};
use crate::store::SchemaStore;
use crate::targets::ClusterTargets;
use crate::{Error, Result};
use std::sync::Arc;

/// Everything a job generator needs to produce a job file.
#[derive(Debug, Clone, Copy)]
pub struct JobRequest<'a> {
    pub cluster_uri: &'a str,
    pub databases: &'a [String],
    pub schema_file: &'a SchemaFileRef,
    /// Passed through to the apply engine untouched.
    pub fail_if_data_loss: bool,
}

/// Produces a job file for the apply engine.
pub trait JobGenerator: Send + Sync {
    fn generate<'a>(&'a self, request: JobRequest<'a>) -> BoxFuture<'a, Result<JobFileRef, BoxError>>;
}

/// A schema file plus the job file that applies it. Built once, consumed once
/// by [`JobExecutor::execute`](crate::JobExecutor::execute).
#[derive(Debug, PartialEq, Eq)]
pub struct ExecutionConfiguration {
    schema_file: SchemaFileRef,
    job_file: JobFileRef,
}

impl ExecutionConfiguration {
    pub fn schema_file(&self) -> &SchemaFileRef {
        &self.schema_file
    }

    pub fn job_file(&self) -> &JobFileRef {
        &self.job_file
    }
}

/// Turns (cluster, targets, schema) into an [`ExecutionConfiguration`].
#[derive(Clone)]
pub struct ExecutionConfigBuilder {
    store: Arc<dyn SchemaStore>,
    generator: Arc<dyn JobGenerator>,
}

impl ExecutionConfigBuilder {
    pub fn new(store: Arc<dyn SchemaStore>, generator: Arc<dyn JobGenerator>) -> Self {
        Self { store, generator }
    }

    /// Build a configuration for an already stored schema.
    ///
    /// An empty target list is allowed: the resulting job changes nothing.
    pub async fn build(
        &self,
        cluster_uri: &str,
        databases: &[String],
        schema_file: SchemaFileRef,
        fail_if_data_loss: bool,
    ) -> Result<ExecutionConfiguration> {
        if databases.is_empty() {
            tracing::warn!(%cluster_uri, "building execution configuration without targets");
        }

        let request = JobRequest {
            cluster_uri,
            databases,
            schema_file: &schema_file,
            fail_if_data_loss,
        };
        let job_file = self.generator.generate(request).await.map_err(|e| {
            tracing::error!(%cluster_uri, "failed generating delta kusto configuration file: {e}");
            Error::Build {
                cluster: cluster_uri.to_string(),
                reason: "job generator failed".to_string(),
                source: Some(e),
            }
        })?;

        let malformed = |reason: &str| Error::Build {
            cluster: cluster_uri.to_string(),
            reason: format!("{reason}: `{job_file}`"),
            source: None,
        };
        if job_file.path().as_str().trim().is_empty() {
            return Err(malformed("generator returned an empty job file reference"));
        }
        if job_file.path().as_str().contains('\n') {
            return Err(malformed("generator returned a multi-line job file reference"));
        }

        tracing::debug!(%cluster_uri, %job_file, "built execution configuration");
        Ok(ExecutionConfiguration {
            schema_file,
            job_file,
        })
    }

    /// Store `schema`, then build a configuration for `targets`.
    pub async fn prepare(
        &self,
        targets: &ClusterTargets,
        schema: &SchemaDefinition,
        fail_if_data_loss: bool,
    ) -> Result<ExecutionConfiguration> {
        let schema_file = self.store.store(schema).inspect_err(|e| {
            tracing::error!("failed storing schema to file: {e}");
        })?;
        let databases: Vec<String> = targets.databases().iter().cloned().collect();
        self.build(targets.cluster_uri(), &databases, schema_file, fail_if_data_loss)
            .await
    }
}
