// Local crates
use crate::{
    git::git::GitContextProvider,
    helpers::{build_info, load_config::Config, load_config::SqlMeshConfig},
    process::{
        health::{PollPolicy, wait_until_ready},
        supervisor::SupervisedProcess,
    },
    sqlmesh::{
        api::ApiClient,
        collector::collect_metadata,
        execution_log::{ExecutionCommand, collect_execution_log},
        models::MetadataAggregate,
    },
    synq::{credentials::CredentialProvider, dump, shipper::Shipper},
};

// External crates
use anyhow::{Context, Result, anyhow};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Time the SQLMesh UI gets to exit after the interrupt before it is killed.
const UI_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Run `f` against the SQLMesh UI described by `config`.
///
/// With `ui_start` the UI is launched inside the project directory first and
/// `f` only runs once `/health` answers. The UI is stopped again however `f`
/// ends, including on Ctrl-C. Without `ui_start` an already running UI is
/// assumed.
#[instrument(
    name = "runtime::with_sqlmesh",
    target = "runtime::runtime",
    skip_all,
    level = "debug"
)]
pub async fn with_sqlmesh<F, Fut, T>(config: &SqlMeshConfig, f: F) -> Result<T>
where
    F: FnOnce(ApiClient) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let client = ApiClient::with_timeout(config.base_url()?, config.request_timeout());
    info!(base_url = %client.base_url(), "SQLMesh UI base URL");

    if !config.ui_start {
        return f(client).await;
    }

    let cancel = CancellationToken::new();
    let ui = SupervisedProcess::start(
        &config.command,
        &config.ui_args(),
        &config.project_dir,
        &cancel,
    )
    .with_context(|| format!("failed to launch SQLMesh UI with {}", config.command))?;

    let result = tokio::select! {
        res = async {
            wait_until_ready(&client, PollPolicy::default()).await?;
            f(client).await
        } => res,
        _ = signal::ctrl_c() => Err(anyhow!("interrupted")),
    };

    match ui.shutdown(UI_SHUTDOWN_GRACE).await {
        Ok(output) => info!(status = %output.status, "SQLMesh UI stopped"),
        Err(e) => tracing::warn!(error = %e, "Failed to stop SQLMesh UI cleanly"),
    }
    cancel.cancel();

    result
}

/// Crawl the SQLMesh UI and attach the git context `git` resolves.
pub async fn collect<G: GitContextProvider>(
    config: &Config,
    git: &G,
) -> Result<MetadataAggregate> {
    let filter = config.files.filter();
    let uploader = build_info::uploader();

    let res = with_sqlmesh(&config.sqlmesh, |client| async move {
        collect_metadata(&client, &filter, &uploader).await
    })
    .await?;

    Ok(res.with_git_context(git.git_context().await))
}

/// `collect <OUTPUT>`
pub async fn collect_to_file<G: GitContextProvider>(
    config: &Config,
    git: &G,
    output: &Path,
) -> Result<()> {
    let res = collect(config, git).await?;
    dump::write_json(&res, output).await
}

/// `upload`
pub async fn upload<G, C>(config: &Config, git: &G, credentials: C) -> Result<()>
where
    G: GitContextProvider,
    C: CredentialProvider + Sync,
{
    let res = collect(config, git).await?;
    Shipper::new(&config.synq.endpoint, credentials)?
        .upload_metadata(res)
        .await
        .context("failed to upload metadata to Synq")
}

/// `upload-run` and `upload-audit`. Writes the aggregate to `output` instead
/// of uploading it when given.
#[instrument(
    name = "runtime::upload_execution",
    target = "runtime::runtime",
    skip(config, git, credentials),
    level = "debug"
)]
pub async fn upload_execution<G, C>(
    config: &Config,
    git: &G,
    credentials: C,
    command: ExecutionCommand,
    log_file: &Path,
    output: Option<&Path>,
) -> Result<()>
where
    G: GitContextProvider,
    C: CredentialProvider + Sync,
{
    let git_context = git.git_context().await;
    let log = collect_execution_log(command, log_file, git_context, &build_info::uploader())
        .await
        .with_context(|| format!("failed to read {command} log"))?;

    match output {
        Some(output) => dump::write_json(&log, output).await,
        None => Shipper::new(&config.synq.endpoint, credentials)?
            .upload_execution(log)
            .await
            .with_context(|| format!("failed to upload {command} log to Synq")),
    }
}
