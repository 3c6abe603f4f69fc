//! Async Docker CLI driver: the full build/run/exec/lifecycle surface,
//! generalised from `docker_runtime.rs`'s synchronous single-shot
//! `docker run` driver into the long-lived-container lifecycle the
//! pipeline and monitor need. Every invocation is wrapped in
//! `tokio::time::timeout`; on expiry the child is killed by dropping its
//! `wait_with_output` future with `kill_on_drop(true)` set, per the design
//! note on externally enforced CLI deadlines.

use crate::errors::DockerError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// Per-operation timeouts: build 300s, run 60s, exec/stop/remove/restart
/// 30s (the verification task in the pipeline runner overrides `exec`
/// with its own 10s deadline per call).
#[derive(Debug, Clone, Copy)]
pub struct DockerTimeouts {
    pub build: Duration,
    pub run: Duration,
    pub exec: Duration,
}

impl Default for DockerTimeouts {
    fn default() -> Self {
        Self {
            build: Duration::from_secs(300),
            run: Duration::from_secs(60),
            exec: Duration::from_secs(30),
        }
    }
}

/// Options for `docker run`, distinct per call since memory/CPU caps come
/// from host configuration and port mappings vary per sandbox.
#[derive(Debug, Clone, Default)]
pub struct RunOpts {
    pub memory_limit: String,
    pub cpu_limit: String,
    pub port_mappings: Vec<(u16, u16)>,
    /// `--add-host=host.docker.internal:host-gateway`; enabled on Linux so
    /// containers can reach the host's web-search proxy.
    pub add_host_gateway: bool,
}

pub struct DockerDriver {
    timeouts: DockerTimeouts,
}

impl Default for DockerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerDriver {
    pub fn new() -> Self {
        Self {
            timeouts: DockerTimeouts::default(),
        }
    }

    pub fn with_timeouts(timeouts: DockerTimeouts) -> Self {
        Self { timeouts }
    }

    pub async fn is_available(&self) -> bool {
        self.run_with_timeout(&["version"], Duration::from_secs(5), "version").await.is_ok()
    }

    pub async fn build_image(&self, context_dir: &Path, tag: &str) -> Result<(), DockerError> {
        let dir = context_dir.to_string_lossy();
        self.run_with_timeout(&["build", "-t", tag, &dir], self.timeouts.build, "build").await?;
        Ok(())
    }

    pub async fn run_container(&self, image_tag: &str, name: &str, opts: &RunOpts) -> Result<String, DockerError> {
        let args = run_args(image_tag, name, opts);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = self.run_with_timeout(&arg_refs, self.timeouts.run, "run").await?;
        Ok(stdout.trim().to_string())
    }

    pub async fn exec_in_container(
        &self,
        container_id: &str,
        command: &str,
        working_dir: Option<&str>,
        timeout: Duration,
    ) -> Result<String, DockerError> {
        let mut args: Vec<String> = vec!["exec".to_string()];
        if let Some(wd) = working_dir {
            args.push("-w".to_string());
            args.push(wd.to_string());
        }
        args.push(container_id.to_string());
        args.push("/bin/bash".to_string());
        args.push("-c".to_string());
        args.push(command.to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run_with_timeout(&arg_refs, timeout, "exec").await
    }

    pub async fn stop_container(&self, id: &str) -> Result<(), DockerError> {
        self.run_with_timeout(&["stop", id], self.timeouts.exec, "stop").await?;
        Ok(())
    }

    pub async fn restart_container(&self, id: &str) -> Result<(), DockerError> {
        self.run_with_timeout(&["restart", id], self.timeouts.exec, "restart").await?;
        Ok(())
    }

    pub async fn remove_container(&self, id: &str) -> Result<(), DockerError> {
        self.run_with_timeout(&["rm", "-f", id], self.timeouts.exec, "remove").await?;
        Ok(())
    }

    pub async fn remove_image(&self, tag: &str) -> Result<(), DockerError> {
        self.run_with_timeout(&["rmi", "-f", tag], self.timeouts.exec, "remove_image").await?;
        Ok(())
    }

    pub async fn container_status(&self, id: &str) -> Result<String, DockerError> {
        let output = self
            .run_with_timeout(&["inspect", id, "--format", "{{.State.Status}}"], self.timeouts.exec, "inspect")
            .await?;
        Ok(output.trim().to_string())
    }

    /// Open `docker logs --follow --tail 100 <id>` as a subprocess and
    /// deliver its stdout/stderr, merged, as a line stream. The subprocess
    /// is not subject to a timeout — it runs for the monitor's lifetime.
    pub async fn stream_logs(&self, container_id: &str) -> Result<LogStream, DockerError> {
        let mut child = Command::new("docker")
            .args(["logs", "--follow", "--tail", "100", container_id])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(map_spawn_error)?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(forward_lines(stdout, tx.clone()));
        tokio::spawn(forward_lines(stderr, tx));

        Ok(LogStream {
            child,
            lines_rx: rx,
        })
    }

    async fn run_with_timeout(&self, args: &[&str], timeout: Duration, command_name: &str) -> Result<String, DockerError> {
        let child = Command::new("docker")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(map_spawn_error)?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => Ok(merge_and_trim(&output.stdout, &output.stderr)),
            Ok(Ok(output)) => Err(DockerError::CommandFailed {
                command: command_name.to_string(),
                code: output.status.code().unwrap_or(-1),
                detail: merge_and_trim(&output.stdout, &output.stderr),
            }),
            Ok(Err(e)) => Err(DockerError::Io(e)),
            Err(_) => Err(DockerError::Timeout {
                command: command_name.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

fn map_spawn_error(e: std::io::Error) -> DockerError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DockerError::BinaryMissing
    } else {
        DockerError::Io(e)
    }
}

fn merge_and_trim(stdout: &[u8], stderr: &[u8]) -> String {
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(stderr));
    combined.trim().to_string()
}

/// Pure argument construction for `docker run`, split out of
/// [`DockerDriver::run_container`] so it is directly testable without a
/// process spawn — mirroring `docker_runtime.rs`'s `build_command`.
fn run_args(image_tag: &str, name: &str, opts: &RunOpts) -> Vec<String> {
    let mut args: Vec<String> = vec!["run".into(), "-d".into(), "--name".into(), name.into()];
    if opts.add_host_gateway {
        args.push("--add-host=host.docker.internal:host-gateway".into());
    }
    args.push(format!("--memory={}", opts.memory_limit));
    args.push(format!("--cpus={}", opts.cpu_limit));
    for (host_port, container_port) in &opts.port_mappings {
        args.push("-p".into());
        args.push(format!("{host_port}:{container_port}"));
    }
    args.push(image_tag.to_string());
    args
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            _ => break,
        }
    }
}

/// A live `docker logs --follow` subprocess, exposed as a line stream.
/// Grounded on the design note "streaming subprocess output": termination
/// is surfaced as `next_line` returning `None`, not as a panic or error.
pub struct LogStream {
    child: Child,
    lines_rx: mpsc::Receiver<String>,
}

impl LogStream {
    /// The next non-empty log line, or `None` once the subprocess has
    /// exited and all buffered lines have been delivered.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines_rx.recv().await
    }

    /// Terminate the subprocess and release its handle.
    pub async fn kill(mut self) {
        let _ = self.child.kill().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_includes_name_memory_cpu_and_image() {
        let opts = RunOpts {
            memory_limit: "2g".to_string(),
            cpu_limit: "2".to_string(),
            port_mappings: vec![],
            add_host_gateway: false,
        };
        let args = run_args("sandbox-run-1:latest", "sandbox-run-1", &opts);
        assert_eq!(args[0], "run");
        assert!(args.contains(&"--name".to_string()));
        assert!(args.contains(&"sandbox-run-1".to_string()));
        assert!(args.contains(&"--memory=2g".to_string()));
        assert!(args.contains(&"--cpus=2".to_string()));
        assert_eq!(args.last().unwrap(), "sandbox-run-1:latest");
    }

    #[test]
    fn run_args_adds_host_gateway_flag_when_requested() {
        let opts = RunOpts {
            memory_limit: "1g".to_string(),
            cpu_limit: "1".to_string(),
            port_mappings: vec![],
            add_host_gateway: true,
        };
        let args = run_args("tag", "name", &opts);
        assert!(args.contains(&"--add-host=host.docker.internal:host-gateway".to_string()));
    }

    #[test]
    fn run_args_maps_port_pairs() {
        let opts = RunOpts {
            memory_limit: "1g".to_string(),
            cpu_limit: "1".to_string(),
            port_mappings: vec![(8080, 80)],
            add_host_gateway: false,
        };
        let args = run_args("tag", "name", &opts);
        let p_index = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[p_index + 1], "8080:80");
    }

    #[tokio::test]
    async fn missing_binary_surfaces_as_binary_missing() {
        // "docker-definitely-not-a-real-binary" never resolves on PATH.
        let err = Command::new("docker-definitely-not-a-real-binary")
            .spawn()
            .map_err(map_spawn_error)
            .unwrap_err();
        assert!(matches!(err, DockerError::BinaryMissing));
    }
}
