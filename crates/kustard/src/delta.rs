//! delta-kusto integration: job files in, schema changes out.
//!
//! [`DeltaJobGenerator`] writes delta-kusto job files itself,
//! [`CommandGenerator`] delegates to an external generator program, and
//! [`DeltaKustoEngine`] runs `delta-kusto -p <job file>`.

use crate::BoxError;
use crate::builder::{JobGenerator, JobRequest};
use crate::executor::ApplyEngine;
use crate::query::BoxFuture;
use crate::schema::JobFileRef;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;
use std::process::{ExitStatus, Output};
use thiserror::Error;
use tokio::process::Command;

/// An external program exited unsuccessfully.
#[derive(Debug, Error)]
#[error("`{program}` exited with {status}: {stderr}")]
pub struct ProcessError {
    pub program: String,
    pub status: ExitStatus,
    pub stderr: String,
}

fn check_output(program: &str, output: &Output) -> Result<(), ProcessError> {
    if output.status.success() {
        return Ok(());
    }
    Err(ProcessError {
        program: program.to_string(),
        status: output.status,
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobFile<'a> {
    send_error_opt_in: bool,
    fail_if_data_loss: bool,
    jobs: IndexMap<&'a str, Job<'a>>,
}

#[derive(Debug, Serialize)]
struct Job<'a> {
    current: Current<'a>,
    target: Target<'a>,
    action: Action,
}

#[derive(Debug, Serialize)]
struct Current<'a> {
    adx: Adx<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Adx<'a> {
    cluster_uri: &'a str,
    database: &'a str,
}

#[derive(Debug, Serialize)]
struct Target<'a> {
    scripts: Vec<Script<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Script<'a> {
    file_path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Action {
    push_to_current: bool,
}

/// Render the delta-kusto job file for `request`: one job per database,
/// each pushing the schema file onto that database.
pub fn render_job_file(request: &JobRequest<'_>) -> Result<String, serde_yaml::Error> {
    let jobs = request
        .databases
        .iter()
        .map(|database| {
            let job = Job {
                current: Current {
                    adx: Adx {
                        cluster_uri: request.cluster_uri,
                        database,
                    },
                },
                target: Target {
                    scripts: vec![Script {
                        file_path: request.schema_file.path().as_str(),
                    }],
                },
                action: Action {
                    push_to_current: true,
                },
            };
            (database.as_str(), job)
        })
        .collect();

    serde_yaml::to_string(&JobFile {
        send_error_opt_in: false,
        fail_if_data_loss: request.fail_if_data_loss,
        jobs,
    })
}

/// Writes delta-kusto job files into a work directory.
#[derive(Debug, Clone)]
pub struct DeltaJobGenerator {
    work_dir: Utf8PathBuf,
}

impl DeltaJobGenerator {
    pub fn new(work_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    fn write_job_file(&self, request: &JobRequest<'_>) -> Result<JobFileRef, BoxError> {
        let contents = render_job_file(request)?;
        std::fs::create_dir_all(&self.work_dir)?;

        let mut file = tempfile::Builder::new()
            .prefix("delta-job-")
            .suffix(".yaml")
            .tempfile_in(&self.work_dir)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;

        let (_, path) = file.keep()?;
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|p| format!("job file path is not UTF-8: {}", p.display()))?;
        Ok(JobFileRef::new(path))
    }
}

impl JobGenerator for DeltaJobGenerator {
    fn generate<'a>(
        &'a self,
        request: JobRequest<'a>,
    ) -> BoxFuture<'a, Result<JobFileRef, BoxError>> {
        let result = self.write_job_file(&request);
        Box::pin(std::future::ready(result))
    }
}

/// Asks an external program to generate the job file.
///
/// The program is called with its configured arguments followed by
/// `--cluster <uri> --schema <path> --fail-if-data-loss <bool>` and one
/// `--db <name>` per target, and must print the job file path on stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments passed to the program for `request`.
    pub fn command_args(&self, request: &JobRequest<'_>) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--cluster".to_string(),
            request.cluster_uri.to_string(),
            "--schema".to_string(),
            request.schema_file.path().to_string(),
            "--fail-if-data-loss".to_string(),
            request.fail_if_data_loss.to_string(),
        ]);
        for db in request.databases {
            args.push("--db".to_string());
            args.push(db.clone());
        }
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<JobFileRef, BoxError> {
        tracing::debug!(program = %self.program, ?args, "running job generator");
        let output = Command::new(&self.program).args(&args).output().await?;
        check_output(&self.program, &output)?;

        let stdout = String::from_utf8(output.stdout)?;
        Ok(JobFileRef::new(stdout.trim()))
    }
}

impl JobGenerator for CommandGenerator {
    fn generate<'a>(
        &'a self,
        request: JobRequest<'a>,
    ) -> BoxFuture<'a, Result<JobFileRef, BoxError>> {
        let args = self.command_args(&request);
        Box::pin(self.run(args))
    }
}

/// Applies job files by running the delta-kusto binary.
#[derive(Debug, Clone)]
pub struct DeltaKustoEngine {
    binary: Utf8PathBuf,
}

impl DeltaKustoEngine {
    pub fn new(binary: impl Into<Utf8PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, job_file: &JobFileRef) -> Result<(), BoxError> {
        let output = Command::new(&self.binary)
            .arg("-p")
            .arg(job_file.path())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(%job_file, "delta-kusto output:\n{}", stdout.trim_end());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!(%job_file, "delta-kusto stderr:\n{}", stderr.trim_end());
        }

        check_output(self.binary.as_str(), &output)?;
        Ok(())
    }
}

impl ApplyEngine for DeltaKustoEngine {
    fn apply<'a>(&'a self, job_file: &'a JobFileRef) -> BoxFuture<'a, Result<(), BoxError>> {
        Box::pin(self.run(job_file))
    }
}
