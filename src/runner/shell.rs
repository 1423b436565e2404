use async_trait::async_trait;
use log::{debug, trace, warn};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::{CommandOutput, CommandRunner};
use crate::config::{Backend, RunnerConfig};
use crate::errors::RunnerError;

/// Runs endpoint commands as local processes
///
/// With the `netns` backend every endpoint is a named network namespace and the
/// command is wrapped as `ip netns exec <endpoint> sh -c <command>`. The `local`
/// backend runs `sh -c <command>` directly, which is handy when all endpoints
/// share the current host.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    backend: Backend,
    shell: String,
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            backend: config.backend,
            shell: config.shell.clone(),
            timeout: Duration::from_secs(config.command_timeout_secs.max(1)),
        }
    }

    fn build_command(&self, endpoint: &str, command: &str) -> Command {
        let mut cmd = match self.backend {
            Backend::Netns => {
                let mut cmd = Command::new("ip");
                cmd.arg("netns").arg("exec").arg(endpoint).arg(&self.shell);
                cmd
            }
            Backend::Local => Command::new(&self.shell),
        };
        cmd.arg("-c").arg(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Captured bytes of one output pipe, readable while the reader is still running
type PipeBuffer = Arc<Mutex<Vec<u8>>>;

/// Copies everything `pipe` yields into `buffer` until EOF or a read error
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buffer: PipeBuffer) {
    let Some(mut pipe) = pipe else {
        return;
    };
    let mut chunk = [0u8; 4096];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut captured = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                captured.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

/// Stdout followed by stderr, as captured so far
fn combined_text(stdout: &PipeBuffer, stderr: &PipeBuffer) -> String {
    let mut text = String::new();
    for buffer in [stdout, stderr] {
        let bytes = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        text.push_str(&String::from_utf8_lossy(&bytes));
    }
    text
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, endpoint: &str, command: &str) -> Result<CommandOutput, RunnerError> {
        trace!("Running on '{}' ({:?}): {}", endpoint, self.backend, command);

        let mut child = self
            .build_command(endpoint, command)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                endpoint: endpoint.to_string(),
                source,
            })?;

        // Pipes are drained by their own tasks so a timeout still sees what was printed
        let stdout: PipeBuffer = Arc::default();
        let stderr: PipeBuffer = Arc::default();
        let mut stdout_reader = tokio::spawn(drain(child.stdout.take(), Arc::clone(&stdout)));
        let mut stderr_reader = tokio::spawn(drain(child.stderr.take(), Arc::clone(&stderr)));

        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await;
            for reader in [&mut stdout_reader, &mut stderr_reader] {
                if let Err(e) = reader.await {
                    debug!("Output reader on '{}' ended abnormally: {}", endpoint, e);
                }
            }
            status
        })
        .await;

        let status = match finished {
            Ok(result) => result.map_err(|source| RunnerError::Spawn {
                endpoint: endpoint.to_string(),
                source,
            })?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!("Killing timed-out command on '{}' failed: {}", endpoint, e);
                }
                stdout_reader.abort();
                stderr_reader.abort();
                warn!(
                    "Command on '{}' exceeded {}s and was killed: {}",
                    endpoint,
                    self.timeout.as_secs(),
                    command
                );
                return Err(RunnerError::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                    output: combined_text(&stdout, &stderr),
                });
            }
        };

        let text = combined_text(&stdout, &stderr);
        let code = status.code();

        if !status.success() {
            debug!("Command on '{}' exited with {:?}: {}", endpoint, code, command);
            return Err(RunnerError::NonZeroExit {
                endpoint: endpoint.to_string(),
                status: code,
                output: text,
            });
        }

        Ok(CommandOutput { status: code, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_runner(timeout_secs: u64) -> ShellRunner {
        ShellRunner::new(&RunnerConfig {
            backend: Backend::Local,
            shell: "sh".to_string(),
            command_timeout_secs: timeout_secs,
        })
    }

    #[tokio::test]
    async fn test_local_runner_captures_combined_output() {
        let runner = local_runner(5);
        let output = runner
            .run("h1", "echo out; echo err 1>&2")
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.text.contains("out"));
        assert!(output.text.contains("err"));
    }

    #[tokio::test]
    async fn test_local_runner_reports_non_zero_exit_with_output() {
        let runner = local_runner(5);
        match runner.run("h2", "echo partial; exit 3").await {
            Err(RunnerError::NonZeroExit {
                endpoint,
                status,
                output,
            }) => {
                assert_eq!(endpoint, "h2");
                assert_eq!(status, Some(3));
                assert!(output.contains("partial"));
            }
            other => panic!("expected non-zero exit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_runner_times_out() {
        let runner = local_runner(1);
        let result = runner.run("h3", "sleep 5").await;
        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_timeout_keeps_output_printed_before_the_hang() {
        let runner = local_runner(1);
        let err = runner
            .run(
                "h1",
                "echo '[  3]  0.0- 1.0 sec  1.25 MBytes  10.5 Mbits/sec'; sleep 5",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(err.partial_output().contains("10.5 Mbits/sec"));
    }

    #[test]
    fn test_netns_command_shape() {
        let runner = ShellRunner::new(&RunnerConfig::default());
        let cmd = runner.build_command("h1", "cat /proc/net/dev");
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "ip");
        let args: Vec<_> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["netns", "exec", "h1", "sh", "-c", "cat /proc/net/dev"]);
    }
}
