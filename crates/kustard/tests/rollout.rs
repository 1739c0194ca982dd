//! Building, executing and rolling out schema changes end to end, with a
//! recording apply engine in place of delta-kusto.

mod common;

use camino::Utf8PathBuf;
use common::{RecordingEngine, RecordingProvider, dbs, scripted_cluster};
use kustard::{
    DeltaJobGenerator, ErrorKind, ExecutionConfigBuilder, FsSchemaStore, JobExecutor, Rollout,
    SchemaDefinition, SchemaFileRef, SchemaStore, TargetFilter, TargetResolver,
};
use std::sync::Arc;

const SCHEMA: &str = ".create-merge table Orders (id: long, placed: datetime)";

struct Workspace {
    _dir: tempfile::TempDir,
    path: Utf8PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    Workspace { _dir: dir, path }
}

fn builder(work_dir: &Utf8PathBuf) -> ExecutionConfigBuilder {
    ExecutionConfigBuilder::new(
        Arc::new(FsSchemaStore::new(work_dir.join("schemas"))),
        Arc::new(DeltaJobGenerator::new(work_dir.join("jobs"))),
    )
}

#[tokio::test]
async fn executor_receives_the_built_job_file() {
    let ws = workspace();
    let store = FsSchemaStore::new(ws.path.join("schemas"));
    let schema_file: SchemaFileRef = store.store(&SchemaDefinition::kql(SCHEMA)).unwrap();

    let config = builder(&ws.path)
        .build(
            common::CLUSTER_URI,
            &["sales".to_string(), "ops".to_string()],
            schema_file.clone(),
            false,
        )
        .await
        .unwrap();
    assert_eq!(config.schema_file(), &schema_file);
    let job_file = config.job_file().clone();

    let job: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(job_file.path()).unwrap()).unwrap();
    assert_eq!(job["failIfDataLoss"].as_bool(), Some(false));
    assert_eq!(
        job["jobs"]["ops"]["target"]["scripts"][0]["filePath"].as_str(),
        Some(schema_file.path().as_str())
    );

    let engine = Arc::new(RecordingEngine::default());
    JobExecutor::new(engine.clone()).execute(config).await.unwrap();
    assert_eq!(engine.applied(), vec![job_file]);
}

#[tokio::test]
async fn engine_failure_is_an_execution_error() {
    let ws = workspace();
    let targets = kustard::ClusterTargets::new(common::CLUSTER_URI, ["sales"]);
    let config = builder(&ws.path)
        .prepare(&targets, &SchemaDefinition::kql(SCHEMA), true)
        .await
        .unwrap();

    let engine = Arc::new(RecordingEngine {
        fail: true,
        ..Default::default()
    });
    let err = JobExecutor::new(engine).execute(config).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(!err.kind().is_retryable());
}

#[tokio::test]
async fn empty_schema_is_a_storage_error() {
    let ws = workspace();
    let targets = kustard::ClusterTargets::new(common::CLUSTER_URI, ["sales"]);
    let err = builder(&ws.path)
        .prepare(&targets, &SchemaDefinition::kql("  \n"), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[tokio::test]
async fn rollout_plans_then_applies() {
    let ws = workspace();
    let (mut cluster, _) = scripted_cluster(dbs(["a", "ab", "b"]));
    let engine = Arc::new(RecordingEngine::default());
    let rollout = Rollout::new(
        TargetResolver::new(RecordingProvider::answering(Vec::<String>::new())),
        builder(&ws.path),
        JobExecutor::new(engine.clone()),
    );

    let plan = rollout
        .plan(
            &mut cluster,
            &TargetFilter::pattern("^a"),
            &SchemaDefinition::kql(SCHEMA),
            true,
        )
        .await
        .unwrap();
    let targets: Vec<_> = plan.targets.databases().iter().cloned().collect();
    assert_eq!(targets, vec!["a", "ab"]);
    assert!(engine.applied().is_empty());

    let job_file = plan.config.job_file().clone();
    let applied = rollout.apply(plan).await.unwrap();
    assert!(applied.is_applied());
    assert_eq!(applied.len(), 2);
    assert_eq!(engine.applied(), vec![job_file]);
}

#[tokio::test]
async fn failed_resolution_builds_nothing() {
    let ws = workspace();
    let (mut cluster, _) = scripted_cluster(dbs(["a"]));
    let engine = Arc::new(RecordingEngine::default());
    let rollout = Rollout::new(
        TargetResolver::new(RecordingProvider::failing()),
        builder(&ws.path),
        JobExecutor::new(engine.clone()),
    );

    let err = rollout
        .plan(
            &mut cluster,
            &TargetFilter::webhook("https://lookup.example.com", "tier1"),
            &SchemaDefinition::kql(SCHEMA),
            true,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
    assert!(!ws.path.join("schemas").exists());
    assert!(!ws.path.join("jobs").exists());
    assert!(engine.applied().is_empty());
}
