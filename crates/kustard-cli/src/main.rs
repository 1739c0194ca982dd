//! kustard: roll a Kusto schema out to the databases of many clusters.

mod config;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use kustard::{
    BoxError, Cluster, CommandGenerator, DeltaJobGenerator, DeltaKustoEngine,
    ExecutionConfigBuilder, FsSchemaStore, HttpTransport, JobExecutor, JobGenerator, RetryPolicy,
    Rollout, SchemaDefinition, SchemaGroupsClient, TargetResolver, Transport, WebhookClient,
};
use kustard_config::ClusterConfig;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, BoxError>;

/// Roll a Kusto schema out to the databases of many clusters.
#[derive(Parser, Debug)]
#[command(name = "kustard", version)]
struct Cli {
    /// Configuration file (default: `.config/kustard.styx`, searched upward)
    #[arg(long, global = true, env = "KUSTARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve and print the target databases of each cluster
    Targets {
        /// Only this cluster (URI or short name)
        #[arg(long)]
        cluster: Option<String>,
    },
    /// Store the schema and generate job files without applying them
    Plan {
        /// Only this cluster (URI or short name)
        #[arg(long)]
        cluster: Option<String>,
    },
    /// Generate job files and apply them with delta-kusto
    Apply {
        /// Only this cluster (URI or short name)
        #[arg(long)]
        cluster: Option<String>,
    },
    /// List the schema groups of an Event Hubs namespace
    Groups {
        /// Namespace host; defaults to `registry.endpoint` from the config
        #[arg(long)]
        endpoint: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Targets,
    Plan,
    Apply,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kustard=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), report(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let loaded = match &cli.config {
        Some(path) => config::load_file(path)?,
        None => config::load()?,
    };
    tracing::debug!(path = %loaded.path.display(), "loaded configuration");
    let ctx = Context::new(loaded)?;

    match cli.command {
        Commands::Targets { cluster } => run_clusters(&ctx, cluster.as_deref(), Stage::Targets).await,
        Commands::Plan { cluster } => run_clusters(&ctx, cluster.as_deref(), Stage::Plan).await,
        Commands::Apply { cluster } => run_clusters(&ctx, cluster.as_deref(), Stage::Apply).await,
        Commands::Groups { endpoint } => list_groups(&ctx, endpoint).await,
    }
}

/// Everything derived from the configuration that commands share.
struct Context {
    loaded: config::Loaded,
    transport: Arc<dyn Transport>,
}

impl Context {
    fn new(loaded: config::Loaded) -> CliResult<Self> {
        let http = loaded.config.http();
        let mut transport = HttpTransport::new(Duration::from_secs(http.timeout_secs()))?
            .with_retry(RetryPolicy {
                attempts: http.retry_attempts(),
                delay: Duration::from_millis(http.retry_delay_ms()),
            });

        let token_env = loaded.config.token_env();
        match std::env::var(token_env) {
            Ok(token) if !token.is_empty() => transport = transport.with_bearer_token(token),
            _ => tracing::warn!(%token_env, "no bearer token set, requests are unauthenticated"),
        }

        Ok(Self {
            loaded,
            transport: Arc::new(transport),
        })
    }

    fn work_dir(&self) -> CliResult<Utf8PathBuf> {
        let path = self.loaded.resolve(self.loaded.config.work_dir());
        Utf8PathBuf::from_path_buf(path)
            .map_err(|p| format!("work directory is not UTF-8: {}", p.display()).into())
    }

    fn resolver(&self) -> TargetResolver {
        TargetResolver::new(Arc::new(WebhookClient::new(self.transport.clone())))
            .allow_implicit_all(self.loaded.config.allow_all_databases())
    }

    fn rollout(&self) -> CliResult<Rollout> {
        let work_dir = self.work_dir()?;
        let delta = self.loaded.config.delta();

        let generator: Arc<dyn JobGenerator> = match delta.generator.as_deref() {
            Some([program, args @ ..]) => Arc::new(CommandGenerator::new(program, args.to_vec())),
            _ => Arc::new(DeltaJobGenerator::new(work_dir.join("jobs"))),
        };
        let builder = ExecutionConfigBuilder::new(
            Arc::new(FsSchemaStore::new(work_dir.join("schemas"))),
            generator,
        );
        let executor = JobExecutor::new(Arc::new(DeltaKustoEngine::new(delta.binary())));

        Ok(Rollout::new(self.resolver(), builder, executor))
    }

    fn schema(&self) -> CliResult<SchemaDefinition> {
        let schema = self
            .loaded
            .config
            .schema
            .as_ref()
            .ok_or_else(|| config::ConfigError::Invalid("no `schema` configured".to_string()))?;
        let dialect = config::schema_dialect(schema.dialect.as_deref())?;
        let path = self.loaded.resolve(&schema.path);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("reading schema {}: {e}", path.display()))?;
        Ok(SchemaDefinition::new(dialect, text))
    }

    fn clusters(&self, key: Option<&str>) -> CliResult<Vec<&ClusterConfig>> {
        let config = &self.loaded.config;
        match key {
            Some(key) => config
                .cluster(key)
                .map(|c| vec![c])
                .ok_or_else(|| format!("no cluster `{key}` in {}", self.loaded.path.display()).into()),
            None if config.clusters.is_empty() => {
                Err(config::ConfigError::Invalid("no `clusters` configured".to_string()).into())
            }
            None => Ok(config.clusters.iter().collect()),
        }
    }
}

/// The rollout pipeline and schema for `plan` and `apply`; `targets` needs neither.
fn prepare(ctx: &Context, stage: Stage) -> CliResult<Option<(Rollout, SchemaDefinition)>> {
    match stage {
        Stage::Targets => Ok(None),
        Stage::Plan | Stage::Apply => Ok(Some((ctx.rollout()?, ctx.schema()?))),
    }
}

async fn run_clusters(ctx: &Context, key: Option<&str>, stage: Stage) -> CliResult<()> {
    let prepared = prepare(ctx, stage)?;

    let clusters = ctx.clusters(key)?;
    let mut failed = 0;
    for cluster_config in &clusters {
        let prepared = prepared.as_ref().map(|(rollout, schema)| (rollout, schema));
        if let Err(err) = run_cluster(ctx, cluster_config, prepared, stage).await {
            failed += 1;
            eprintln!(
                "{} {}: {}",
                "✗".red(),
                cluster_config.uri.bold(),
                report(err.as_ref())
            );
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} clusters failed", clusters.len()).into());
    }
    Ok(())
}

async fn run_cluster(
    ctx: &Context,
    cluster_config: &ClusterConfig,
    prepared: Option<(&Rollout, &SchemaDefinition)>,
    stage: Stage,
) -> CliResult<()> {
    let mut cluster = Cluster::connect(&cluster_config.uri, ctx.transport.clone())?;
    let filter = config::target_filter(&cluster_config.filter);
    let fail_if_data_loss = ctx.loaded.config.fail_if_data_loss;

    let Some((rollout, schema)) = prepared else {
        let targets = ctx.resolver().resolve(&mut cluster, &filter).await?;
        println!(
            "{} {}",
            cluster.name().bold(),
            format!("({} databases)", targets.len()).dimmed()
        );
        for db in targets.databases() {
            println!("  {db}");
        }
        return Ok(());
    };

    let plan = rollout
        .plan(&mut cluster, &filter, schema, fail_if_data_loss)
        .await?;
    println!(
        "{} {} {}",
        cluster.name().bold(),
        format!("({} databases)", plan.targets.len()).dimmed(),
        plan.config.job_file()
    );

    if stage == Stage::Apply {
        let applied = rollout.apply(plan).await?;
        println!(
            "{} {} {}",
            "✓".green(),
            cluster.name().bold(),
            format!("applied to {} databases", applied.len()).dimmed()
        );
    }
    Ok(())
}

async fn list_groups(ctx: &Context, endpoint: Option<String>) -> CliResult<()> {
    let endpoint = endpoint
        .or_else(|| {
            ctx.loaded
                .config
                .registry
                .as_ref()
                .map(|r| r.endpoint.clone())
        })
        .ok_or("no registry endpoint given and none configured")?;

    let groups = SchemaGroupsClient::new(&endpoint, ctx.transport.clone())
        .list()
        .await?;
    println!(
        "{} {}",
        endpoint.bold(),
        format!("({} schema groups)", groups.schema_groups.len()).dimmed()
    );
    for group in &groups.schema_groups {
        println!("  {group}");
    }
    Ok(())
}

/// An error followed by its chain of causes.
fn report(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply_for_one_cluster() {
        let cli = Cli::try_parse_from([
            "kustard",
            "--config",
            "/work/.config/kustard.styx",
            "apply",
            "--cluster",
            "fabrikam",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/work/.config/kustard.styx")));
        assert!(matches!(
            cli.command,
            Commands::Apply { cluster: Some(ref c) } if c == "fabrikam"
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_targets_needs_no_rollout() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        // A non-UTF-8 root makes the work directory, and so the rollout, unbuildable.
        let root = std::env::temp_dir().join(OsStr::from_bytes(b"kustard-\xff"));
        let ctx = Context::new(config::Loaded {
            config: config::Config::default(),
            path: root.join(".config/kustard.styx"),
        })
        .unwrap();

        assert!(prepare(&ctx, Stage::Targets).unwrap().is_none());
        let Err(err) = prepare(&ctx, Stage::Plan) else {
            panic!("plan should need a UTF-8 work directory");
        };
        assert!(err.to_string().contains("not UTF-8"), "{err}");
    }

    #[test]
    fn test_report_includes_causes() {
        let err = kustard::Error::Query {
            cluster: "https://fabrikam.kusto.windows.net".into(),
            source: "connection reset".into(),
        };
        assert_eq!(
            report(&err),
            "listing databases on https://fabrikam.kusto.windows.net failed: connection reset"
        );
    }
}
