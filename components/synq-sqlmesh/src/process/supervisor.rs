//! Supervision of the `sqlmesh ui` background process.
//!
//! The child runs under a [`CancellationToken`]: cancelling it force-kills the
//! child. Two reader tasks drain stdout and stderr line by line for the whole
//! lifetime of the process, echoing every non-empty line to our own stream of
//! the same kind and keeping a copy. Each reader owns its buffer and hands it
//! back when joined, so nothing observes a partially written buffer.

// External crates
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// How long reader tasks may keep draining pipes after the process exited.
/// Grandchildren can inherit the pipes and keep them open indefinitely.
const READER_DRAIN_PERIOD: Duration = Duration::from_secs(2);

/// Failures while starting, signalling or reaping a supervised process.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The launcher could not be executed.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// Launcher as configured.
        command: String,
        /// Error returned by the OS.
        #[source]
        source: io::Error,
    },
    /// A standard stream was not captured.
    #[error("failed to capture {stream} of `{command}`")]
    Pipe {
        /// Launcher as configured.
        command: String,
        /// `"stdout"` or `"stderr"`
        stream: &'static str,
    },
    /// The process has no pid left to signal.
    #[error("process has no pid, it already exited")]
    NotRunning,
    /// Sending the interrupt failed.
    #[error("failed to interrupt process {pid}: {reason}")]
    Signal {
        /// Target process.
        pid: u32,
        /// Error reported by `kill(2)`.
        reason: String,
    },
    /// Reaping the process failed.
    #[error("failed to wait for process exit: {0}")]
    Wait(#[source] io::Error),
    /// A reader or exit-watcher task panicked or was cancelled.
    #[error("process supervision task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a running supervised process.
#[derive(Debug)]
pub struct SupervisedProcess {
    command: String,
    pid: Option<u32>,
    cancel: CancellationToken,
    readers_stop: CancellationToken,
    exit: JoinHandle<io::Result<ExitStatus>>,
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
}

/// What a supervised process left behind once it stopped.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit status reported by the OS.
    pub status: ExitStatus,
    stdout: String,
    stderr: String,
}

impl ProcessOutput {
    /// Non-empty stdout lines, each terminated by `\n`.
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Non-empty stderr lines, each terminated by `\n`.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

impl SupervisedProcess {
    /// Start `command` with `args` inside `working_dir`.
    ///
    /// The process is bound to a child token of `cancel`, so cancelling the
    /// parent token terminates it. Must be called from within a tokio runtime.
    #[instrument(
        name = "process_supervisor::start",
        target = "process::supervisor",
        skip(cancel),
        level = "debug"
    )]
    pub fn start(
        command: &str,
        args: &[String],
        working_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Self, SupervisorError> {
        let mut child = Command::new(command)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| SupervisorError::Pipe {
            command: command.to_string(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| SupervisorError::Pipe {
            command: command.to_string(),
            stream: "stderr",
        })?;

        let pid = child.id();
        tracing::info!(command = %command, pid = ?pid, "Started supervised process");

        let cancel = cancel.child_token();
        let readers_stop = CancellationToken::new();

        Ok(Self {
            command: command.to_string(),
            pid,
            exit: tokio::spawn(watch_exit(child, cancel.clone())),
            stdout: spawn_stream_reader(stdout, tokio::io::stdout(), readers_stop.clone(), "stdout"),
            stderr: spawn_stream_reader(stderr, tokio::io::stderr(), readers_stop.clone(), "stderr"),
            cancel,
            readers_stop,
        })
    }

    /// OS process id, `None` when the process exited before it was read.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the process to stop with an interrupt and stop reading its output.
    /// Returns without waiting for the process to exit.
    #[instrument(
        name = "process_supervisor::kill",
        target = "process::supervisor",
        skip_all,
        level = "debug"
    )]
    pub fn kill(&self) -> Result<(), SupervisorError> {
        self.readers_stop.cancel();
        let pid = self.pid.ok_or(SupervisorError::NotRunning)?;
        tracing::info!(command = %self.command, pid, "Interrupting supervised process");
        self.interrupt(pid)
    }

    #[cfg(unix)]
    fn interrupt(&self, pid: u32) -> Result<(), SupervisorError> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid).map_err(|e| SupervisorError::Signal {
            pid,
            reason: e.to_string(),
        })?;
        match kill(Pid::from_raw(raw), Signal::SIGINT) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(SupervisorError::Signal {
                pid,
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn interrupt(&self, _pid: u32) -> Result<(), SupervisorError> {
        // No interrupt signal to deliver, fall back to terminating.
        self.cancel.cancel();
        Ok(())
    }

    /// Wait for the process to exit and collect its captured output.
    #[instrument(
        name = "process_supervisor::wait",
        target = "process::supervisor",
        skip_all,
        level = "debug"
    )]
    pub async fn wait(self) -> Result<ProcessOutput, SupervisorError> {
        let status = self.exit.await?.map_err(SupervisorError::Wait)?;
        tracing::info!(command = %self.command, status = %status, "Supervised process exited");

        let readers_stop = self.readers_stop.clone();
        let drain_deadline = tokio::spawn(async move {
            sleep(READER_DRAIN_PERIOD).await;
            readers_stop.cancel();
        });
        let stdout = self.stdout.await?;
        let stderr = self.stderr.await?;
        drain_deadline.abort();

        Ok(ProcessOutput {
            status,
            stdout,
            stderr,
        })
    }

    /// Interrupt the process and wait up to `grace` for it to exit, then
    /// force-kill it.
    pub async fn shutdown(self, grace: Duration) -> Result<ProcessOutput, SupervisorError> {
        self.kill()?;

        let cancel = self.cancel.clone();
        let command = self.command.clone();
        let escalation = tokio::spawn(async move {
            sleep(grace).await;
            tracing::warn!(
                command = %command,
                grace_period = ?grace,
                "Supervised process ignored interrupt, killing it"
            );
            cancel.cancel();
        });

        let output = self.wait().await;
        escalation.abort();
        output
    }
}

async fn watch_exit(mut child: Child, cancel: CancellationToken) -> io::Result<ExitStatus> {
    tokio::select! {
        status = child.wait() => status,
        _ = cancel.cancelled() => {
            tracing::debug!("Supervision cancelled, killing process");
            child.kill().await?;
            child.wait().await
        }
    }
}

/// Read `stream` line by line until EOF or `stop`, echoing non-empty lines to
/// `echo`. Lines are decoded lossily, invalid UTF-8 must not end the reader.
fn spawn_stream_reader<R, W>(
    stream: R,
    mut echo: W,
    stop: CancellationToken,
    stream_type: &'static str,
) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut captured = String::new();
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            let read = tokio::select! {
                _ = stop.cancelled() => break,
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => break,
                Ok(_) => {
                    while matches!(buf.last(), Some(b'\n' | b'\r')) {
                        buf.pop();
                    }
                    if buf.is_empty() {
                        continue;
                    }

                    let line = String::from_utf8_lossy(&buf);
                    captured.push_str(&line);
                    captured.push('\n');

                    if echo.write_all(line.as_bytes()).await.is_ok() {
                        let _ = echo.write_all(b"\n").await;
                        let _ = echo.flush().await;
                    }
                }
                Err(e) => {
                    tracing::debug!(%stream_type, error = %e, "Stream reader exiting on read error");
                    break;
                }
            }
        }

        tracing::debug!(%stream_type, "Stream reader task exiting");
        captured
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr_separately() {
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        let process = SupervisedProcess::start(
            "sh",
            &sh("echo one; echo; echo two; echo oops >&2"),
            dir.path(),
            &cancel,
        )
        .unwrap();

        let output = process.wait().await.unwrap();

        assert!(output.status.success());
        assert_eq!(output.stdout(), "one\ntwo\n");
        assert_eq!(output.stderr(), "oops\n");
    }

    #[tokio::test]
    async fn runs_inside_the_working_directory() {
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();

        let process = SupervisedProcess::start("ls", &[], dir.path(), &cancel).unwrap();
        let output = process.wait().await.unwrap();

        assert_eq!(output.stdout(), "marker.txt\n");
    }

    #[tokio::test]
    async fn kill_interrupts_a_long_running_process() {
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        let process =
            SupervisedProcess::start("sleep", &["30".to_string()], dir.path(), &cancel).unwrap();

        process.kill().unwrap();
        let output = tokio::time::timeout(Duration::from_secs(10), process.wait())
            .await
            .unwrap()
            .unwrap();

        assert!(!output.status.success());
    }

    #[tokio::test]
    async fn cancelling_the_parent_token_terminates_the_process() {
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        let process =
            SupervisedProcess::start("sleep", &["30".to_string()], dir.path(), &cancel).unwrap();

        cancel.cancel();
        let output = tokio::time::timeout(Duration::from_secs(10), process.wait())
            .await
            .unwrap()
            .unwrap();

        assert!(!output.status.success());
    }

    #[tokio::test]
    async fn shutdown_escalates_when_interrupt_is_ignored() {
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        let process = SupervisedProcess::start(
            "sh",
            &sh("trap '' INT; sleep 30"),
            dir.path(),
            &cancel,
        )
        .unwrap();
        // Give the shell time to install its trap.
        sleep(Duration::from_millis(200)).await;

        let output = tokio::time::timeout(
            Duration::from_secs(10),
            process.shutdown(Duration::from_millis(300)),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(!output.status.success());
    }

    #[tokio::test]
    async fn missing_executable_fails_to_start() {
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();

        let err = SupervisedProcess::start("definitely-not-a-real-binary", &[], dir.path(), &cancel)
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Spawn { .. }));
    }
}
