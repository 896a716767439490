// Local crates
use crate::{
    git::git::GitContext,
    sqlmesh::models::{ExecutionLogAggregate, Uploader},
};

// External crates
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::path::Path;
use tracing::instrument;

/// SQLMesh commands whose logs can be uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionCommand {
    /// `sqlmesh run`
    Run,
    /// `sqlmesh audit`
    Audit,
}

impl ExecutionCommand {
    /// Command name sent to Synq.
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionCommand::Run => "run",
            ExecutionCommand::Audit => "audit",
        }
    }
}

impl fmt::Display for ExecutionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to build an execution log aggregate.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionLogError {
    /// The log file could not be read.
    #[error("{path}: {source}")]
    Read {
        /// Log file as given on the command line.
        path: String,
        /// Error returned by the OS.
        #[source]
        source: io::Error,
    },
}

/// Build an execution log aggregate from the log file written by
/// `sqlmesh run` or `sqlmesh audit`.
///
/// The run window comes from file metadata: it starts at the birth time
/// (falling back to the modification time) and finishes at the inode change
/// time (falling back to the modification time). Without usable metadata both
/// ends are the current time.
#[instrument(
    name = "execution_log::collect",
    target = "sqlmesh::execution_log",
    skip(git_context, uploader),
    level = "debug"
)]
pub async fn collect_execution_log(
    command: ExecutionCommand,
    path: &Path,
    git_context: Option<GitContext>,
    uploader: &Uploader,
) -> Result<ExecutionLogAggregate, ExecutionLogError> {
    let std_out = tokio::fs::read(path)
        .await
        .map_err(|source| ExecutionLogError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let (started_at, finished_at) = match tokio::fs::metadata(path).await {
        Ok(metadata) => run_window(&metadata),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to stat execution log, using current time");
            let now = Utc::now();
            (now, now)
        }
    };

    tracing::debug!(
        bytes = std_out.len(),
        started_at = %started_at,
        finished_at = %finished_at,
        "Collected execution log"
    );
    Ok(ExecutionLogAggregate {
        command: command.as_str().to_string(),
        git_context,
        std_out: Bytes::from(std_out),
        started_at,
        finished_at,
        uploader_version: uploader.version.clone(),
        uploader_build_time: uploader.build_time.clone(),
    })
}

fn run_window(metadata: &Metadata) -> (DateTime<Utc>, DateTime<Utc>) {
    let modified: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());

    let started_at = metadata.created().map(DateTime::from).unwrap_or(modified);
    let finished_at = change_time(metadata).unwrap_or(modified);

    // A modification time set into the future can outrun the change time.
    (started_at.min(finished_at), finished_at)
}

#[cfg(unix)]
fn change_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;

    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    DateTime::from_timestamp(metadata.ctime(), nanos)
}

#[cfg(not(unix))]
fn change_time(_metadata: &Metadata) -> Option<DateTime<Utc>> {
    None
}
