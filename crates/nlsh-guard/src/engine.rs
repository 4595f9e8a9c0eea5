use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Runs a single command under `sh -c` with a hard wall-clock timeout.
///
/// The engine never retries and never interprets the command: blocking and
/// confirmation happen upstream in the gate. A non-zero exit status is a
/// normal result, not an error.
#[derive(Debug, Clone)]
pub struct Engine {
    shell: String,
    timeout: Duration,
}

#[derive(Debug)]
pub struct RunOutput {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Debug)]
pub enum RunStatus {
    /// Process ran to completion. `code` is `None` when killed by a signal.
    Exited { code: Option<i32> },
    /// Deadline expired; the process tree was killed.
    TimedOut,
    /// The shell could not be launched, or there was nothing to run.
    SpawnFailed { error: String },
}

impl Engine {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            shell: "sh".to_owned(),
            timeout,
        }
    }

    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(&self, command: &str) -> RunOutput {
        let start = Instant::now();

        if command.trim().is_empty() {
            return RunOutput {
                status: RunStatus::SpawnFailed {
                    error: "empty command".to_owned(),
                },
                stdout: String::new(),
                stderr: String::new(),
                duration: start.elapsed(),
            };
        }

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group so the timeout kill reaches the shell's children
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return RunOutput {
                    status: RunStatus::SpawnFailed {
                        error: e.to_string(),
                    },
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: start.elapsed(),
                };
            }
        };

        let stdout_task = child.stdout.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf).await;
                buf
            })
        });
        let stderr_task = child.stderr.take().map(|mut pipe| {
            tokio::spawn(async move {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf).await;
                buf
            })
        });

        let deadline = tokio::time::Instant::now() + self.timeout;

        let status = tokio::select! {
            status = child.wait() => match status {
                Ok(s) => RunStatus::Exited { code: s.code() },
                Err(e) => RunStatus::SpawnFailed { error: e.to_string() },
            },
            () = tokio::time::sleep_until(deadline) => {
                kill_tree(&mut child).await;
                RunStatus::TimedOut
            }
        };

        let stdout = match stdout_task {
            Some(h) => h.await.unwrap_or_default(),
            None => String::new(),
        };
        let stderr = match stderr_task {
            Some(h) => h.await.unwrap_or_default(),
            None => String::new(),
        };

        RunOutput {
            status,
            stdout,
            stderr,
            duration: start.elapsed(),
        }
    }
}

async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        #[allow(clippy::cast_possible_wrap)]
        let pgid = pid as i32;
        unsafe {
            let _ = libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::new(Duration::from_secs(30))
    }

    #[tokio::test]
    #[cfg(not(target_os = "windows"))]
    async fn captures_stdout() {
        let out = engine().run("echo hello").await;
        assert!(matches!(out.status, RunStatus::Exited { code: Some(0) }));
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    #[cfg(not(target_os = "windows"))]
    async fn stdout_and_stderr_kept_separate() {
        let out = engine().run("echo out && echo err >&2").await;
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[tokio::test]
    #[cfg(not(target_os = "windows"))]
    async fn nonzero_exit_is_a_result_not_an_error() {
        let out = engine().run("exit 3").await;
        assert!(matches!(out.status, RunStatus::Exited { code: Some(3) }));
    }

    #[tokio::test]
    #[cfg(not(target_os = "windows"))]
    async fn timeout_kills_command() {
        let out = Engine::new(Duration::from_secs(1)).run("sleep 60").await;
        assert!(matches!(out.status, RunStatus::TimedOut));
        assert!(out.duration < Duration::from_secs(10));
    }

    #[tokio::test]
    #[cfg(not(target_os = "windows"))]
    async fn timeout_kills_shell_children_too() {
        // the sleep is a child of the shell; group kill must reach it
        let out = Engine::new(Duration::from_secs(1))
            .run("sleep 60 & wait")
            .await;
        assert!(matches!(out.status, RunStatus::TimedOut));
        assert!(out.duration < Duration::from_secs(10));
    }

    #[tokio::test]
    #[cfg(not(target_os = "windows"))]
    async fn partial_output_preserved_on_timeout() {
        let out = Engine::new(Duration::from_secs(1))
            .run("echo before; sleep 60")
            .await;
        assert!(matches!(out.status, RunStatus::TimedOut));
        assert!(out.stdout.contains("before"));
    }

    #[tokio::test]
    async fn missing_shell_reports_spawn_failure() {
        let out = Engine::new(Duration::from_secs(5))
            .with_shell("nlsh-no-such-shell")
            .run("echo hi")
            .await;
        assert!(matches!(out.status, RunStatus::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn empty_command_rejected_without_spawning() {
        let out = engine().run("   ").await;
        match out.status {
            RunStatus::SpawnFailed { error } => assert!(error.contains("empty")),
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    #[cfg(not(target_os = "windows"))]
    async fn no_output_yields_empty_strings() {
        let out = engine().run("true").await;
        assert!(out.stdout.is_empty());
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn with_shell_overrides_default() {
        let engine = Engine::new(Duration::from_secs(5)).with_shell("bash");
        assert_eq!(engine.shell, "bash");
    }
}
