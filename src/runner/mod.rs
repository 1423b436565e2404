use async_trait::async_trait;

use crate::errors::RunnerError;
use crate::models::Endpoint;

// Boundary to the environment hosting the endpoints
// The engine only ever needs three things from it: run a shell command on a named
// endpoint, read an endpoint's address, and list the endpoints.

/// Static endpoint directory built from configuration
pub mod directory;

/// Process-backed runner (`ip netns exec` or the local shell)
pub mod shell;

pub use directory::StaticDirectory;
pub use shell::ShellRunner;

/// Captured result of a foreground command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, `None` if the process was terminated by a signal
    pub status: Option<i32>,
    /// Combined stdout and stderr
    pub text: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` on `endpoint` and waits for it to exit
    async fn run(&self, endpoint: &str, command: &str) -> Result<CommandOutput, RunnerError>;

    /// Starts `command` on `endpoint` without waiting for it, output going to `log_path`
    async fn run_background(
        &self,
        endpoint: &str,
        command: &str,
        log_path: &str,
    ) -> Result<(), RunnerError> {
        let detached = format!("{command} > {log_path} 2>&1 &");
        self.run(endpoint, &detached).await.map(|_| ())
    }
}

pub trait EndpointDirectory: Send + Sync {
    /// Endpoints in declaration order
    fn list_endpoints(&self) -> Vec<Endpoint>;

    fn address(&self, name: &str) -> Option<String>;

    fn endpoint(&self, name: &str) -> Option<Endpoint> {
        self.list_endpoints().into_iter().find(|e| e.name == name)
    }
}
