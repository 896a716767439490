// External crates
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::instrument;

/// Source control coordinates of the SQLMesh project being collected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GitContext {
    /// `remote.origin.url`, empty without an origin remote.
    pub clone_url: String,
    /// Checked out branch, `HEAD` when detached.
    pub branch: String,
    /// Full sha of `HEAD`.
    pub commit_sha: String,
}

/// Resolves the git context attached to uploads. `None` means the project is
/// not in a repository, or the context could not be determined.
pub trait GitContextProvider {
    /// Resolve the context. Never fails; missing data is `None` or empty.
    fn git_context(&self) -> impl Future<Output = Option<GitContext>> + Send;
}

/// [`GitContextProvider`] backed by the `git` executable, run inside the
/// project directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    /// Run `git` inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn run(&self, args: &[&str]) -> Option<String> {
        run_git(&self.dir, args).await
    }
}

impl GitContextProvider for GitCli {
    #[instrument(
        name = "git_context::resolve",
        target = "git::git",
        skip_all,
        level = "debug"
    )]
    async fn git_context(&self) -> Option<GitContext> {
        let commit_sha = self.run(&["rev-parse", "HEAD"]).await?;
        let branch = self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])
            .await
            .unwrap_or_default();
        let clone_url = self
            .run(&["config", "--get", "remote.origin.url"])
            .await
            .unwrap_or_default();

        tracing::debug!(
            clone_url = %clone_url,
            branch = %branch,
            commit_sha = %commit_sha,
            "Resolved git context of SQLMesh project"
        );
        Some(GitContext {
            clone_url,
            branch,
            commit_sha,
        })
    }
}

/// Provider that never attaches a git context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGitContext;

impl GitContextProvider for NoGitContext {
    async fn git_context(&self) -> Option<GitContext> {
        None
    }
}

async fn run_git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to execute git");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            args = ?args,
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "git command failed"
        );
        return None;
    }

    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!value.is_empty()).then_some(value)
}
