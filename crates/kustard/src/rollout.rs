//! Rolling a schema out to one cluster: resolve, build, apply.

use crate::builder::{ExecutionConfigBuilder, ExecutionConfiguration};
use crate::executor::JobExecutor;
use crate::resolver::TargetResolver;
use crate::schema::SchemaDefinition;
use crate::targets::{ClusterTargets, TargetFilter};
use crate::{Cluster, Result};

/// Resolved targets plus the configuration that applies the schema to them.
#[derive(Debug)]
pub struct Plan {
    pub targets: ClusterTargets,
    pub config: ExecutionConfiguration,
}

/// Wires the resolver, builder and executor together for a single cluster.
#[derive(Clone)]
pub struct Rollout {
    resolver: TargetResolver,
    builder: ExecutionConfigBuilder,
    executor: JobExecutor,
}

impl Rollout {
    pub fn new(
        resolver: TargetResolver,
        builder: ExecutionConfigBuilder,
        executor: JobExecutor,
    ) -> Self {
        Self {
            resolver,
            builder,
            executor,
        }
    }

    /// Resolve targets for `filter`, store `schema` and build the job.
    /// Nothing is applied.
    pub async fn plan(
        &self,
        cluster: &mut Cluster,
        filter: &TargetFilter,
        schema: &SchemaDefinition,
        fail_if_data_loss: bool,
    ) -> Result<Plan> {
        let targets = self.resolver.resolve(cluster, filter).await?;
        tracing::info!(
            cluster = %cluster.name(),
            targets = targets.len(),
            "resolved target databases"
        );

        let config = self
            .builder
            .prepare(&targets, schema, fail_if_data_loss)
            .await?;
        tracing::info!(
            cluster = %cluster.name(),
            job_file = %config.job_file(),
            "built execution configuration"
        );

        Ok(Plan { targets, config })
    }

    /// Apply a plan. On success the returned targets are marked applied.
    pub async fn apply(&self, plan: Plan) -> Result<ClusterTargets> {
        let Plan {
            mut targets,
            config,
        } = plan;
        self.executor.execute(config).await?;
        targets.mark_applied();
        tracing::info!(
            cluster = %targets.cluster_uri(),
            targets = targets.len(),
            "applied schema"
        );
        Ok(targets)
    }
}
