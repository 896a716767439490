//! Readiness polling for the SQLMesh UI.

// Local crates
use crate::sqlmesh::api::{Api, ApiError};

// External crates
use std::time::Duration;
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::instrument;

/// Fixed-interval polling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two health checks.
    pub interval: Duration,
    /// Budget for the whole wait, measured from the first health check.
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            deadline: Duration::from_secs(30),
        }
    }
}

/// The SQLMesh UI never became ready.
#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// No health check succeeded before the deadline.
    #[error("SQLMesh UI did not start within {deadline:?} ({attempts} health checks failed)")]
    Timeout {
        /// Configured wait budget.
        deadline: Duration,
        /// Health checks started, including one still pending at the deadline.
        attempts: u32,
        /// `None` when the last health check was still pending at the deadline.
        #[source]
        last_error: Option<ApiError>,
    },
}

/// Block until `/health` answers 200, checking once per `policy.interval`.
///
/// `policy.deadline` bounds the whole wait, including a health check the UI
/// accepts but never answers.
///
/// Running out of `policy.deadline` is fatal for the run: nothing after this
/// point can reach the UI, so the caller is expected to propagate the error
/// and exit.
#[instrument(
    name = "health_poller::wait_until_ready",
    target = "process::health",
    skip_all,
    level = "debug"
)]
pub async fn wait_until_ready<A: Api>(api: &A, policy: PollPolicy) -> Result<(), HealthError> {
    tracing::info!("Waiting for SQLMesh UI to start");

    let started = Instant::now();
    let deadline = started + policy.deadline;
    let mut attempts = 0;
    let mut last_error = None;

    while Instant::now() < deadline {
        attempts += 1;
        match timeout_at(deadline, api.health()).await {
            Ok(Ok(_)) => {
                tracing::info!(attempts, "SQLMesh UI is ready");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, attempt = attempts, "Failed to get health of SQLMesh UI");
                last_error = Some(e);
            }
            Err(_) => {
                tracing::error!(attempt = attempts, "Health check of SQLMesh UI still pending at deadline");
                break;
            }
        }
        sleep_until((Instant::now() + policy.interval).min(deadline)).await;
    }

    tracing::error!(deadline = ?policy.deadline, "SQLMesh UI did not start in time");
    Err(HealthError::Timeout {
        deadline: policy.deadline,
        attempts,
        last_error,
    })
}
