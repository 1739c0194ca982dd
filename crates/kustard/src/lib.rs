//! Schema rollout planning for fleets of Kusto clusters.
//!
//! This crate provides:
//! - Database listing with regex filters, against the live cluster
//! - Target resolution: pattern, explicit list, webhook lookup, or everything
//! - Schema storage and delta-kusto job generation
//! - Handing the job to an apply engine
//!
//! # Target filters
//!
//! A [`TargetFilter`] picks exactly one strategy, in precedence order
//! `db` > `dbs` > `webhook` > all databases. Only the first one set is used:
//!
//! ```ignore
//! let filter = TargetFilter::pattern("^sales_");
//! let targets = resolver.resolve(&mut cluster, &filter).await?;
//! ```
//!
//! # Rollouts
//!
//! [`Rollout`] strings the stages together for one cluster:
//!
//! ```ignore
//! let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(timeout)?);
//! let mut cluster = Cluster::connect("https://fabrikam.kusto.windows.net", transport.clone())?;
//!
//! let rollout = Rollout::new(
//!     TargetResolver::new(Arc::new(WebhookClient::new(transport))),
//!     ExecutionConfigBuilder::new(
//!         Arc::new(FsSchemaStore::new(work_dir.clone())),
//!         Arc::new(DeltaJobGenerator::new(work_dir)),
//!     ),
//!     JobExecutor::new(Arc::new(DeltaKustoEngine::new("delta-kusto"))),
//! );
//!
//! let plan = rollout.plan(&mut cluster, &filter, &schema, true).await?;
//! let applied = rollout.apply(plan).await?;
//! ```

mod builder;
mod catalog;
mod cluster;
pub mod delta;
mod error;
mod executor;
mod kusto;
pub mod query;
pub mod registry;
mod resolver;
mod rollout;
mod schema;
mod store;
mod targets;
mod traced;
pub mod transport;
mod webhook;

pub use builder::{ExecutionConfigBuilder, ExecutionConfiguration, JobGenerator, JobRequest};
pub use cluster::{Cluster, cluster_name_from_uri};
pub use delta::{CommandGenerator, DeltaJobGenerator, DeltaKustoEngine};
pub use error::{BoxError, Error, ErrorKind};
pub use executor::{ApplyEngine, JobExecutor};
pub use kusto::{KustoClient, parse_v1_rows};
pub use query::{BoxFuture, QueryClient, RowEvent, RowIterator, Stmt};
pub use registry::{SchemaGroups, SchemaGroupsClient};
pub use resolver::TargetResolver;
pub use rollout::{Plan, Rollout};
pub use schema::{JobFileRef, SchemaDefinition, SchemaDialect, SchemaFileRef};
pub use store::{FsSchemaStore, SchemaStore};
pub use targets::{ClusterTargets, TargetFilter, TargetStrategy};
pub use traced::{QueryClientExt, TracedClient};
pub use transport::{HttpTransport, RetryPolicy, Transport};
pub use webhook::{TargetProvider, WebhookClient};

/// Result type for kustard operations. Capability traits pass `BoxError` as
/// the second parameter.
pub type Result<T, E = Error> = std::result::Result<T, E>;
