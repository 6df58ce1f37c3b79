//! Container runtime client.
//!
//! [`RuntimeClient`] is the only place the crate talks to the container
//! runtime. Each operation renders the exact argument vector of a CLI call and
//! hands it to [`RuntimeClient::execute`], so a fake client can record and
//! assert the argv without touching a real runtime.

use async_trait::async_trait;
use serde::Serialize;
use std::borrow::Cow;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one runtime invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    /// Full argv, program included
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    /// Exit code (-1 when terminated by a signal)
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Shell-escaped command line, suitable for copy-pasting into a terminal
    pub fn command_line(&self) -> String {
        render_command(&self.command)
    }

    /// Stdout and stderr joined, trimmed
    pub fn combined_output(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

/// Render an argv the way a shell would accept it
pub fn render_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| shell_escape::escape(Cow::from(arg.as_str())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Operations the orchestrator needs from a container runtime.
///
/// Implementors provide [`execute`](RuntimeClient::execute); the remaining
/// methods only build argument vectors.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Runtime program name, e.g. `docker`
    fn program(&self) -> &str;

    /// Run the runtime program with `args` and capture its output.
    ///
    /// A nonzero exit status is not an error at this level.
    ///
    /// # Errors
    ///
    /// Returns error if the program cannot be spawned or times out.
    async fn execute(&self, args: Vec<String>) -> io::Result<CommandOutput>;

    /// `docker --version`
    async fn version(&self) -> io::Result<CommandOutput> {
        self.execute(vec!["--version".to_string()]).await
    }

    /// `docker run <image>`, attached
    async fn run_image(&self, image: &str) -> io::Result<CommandOutput> {
        self.execute(vec!["run".to_string(), image.to_string()]).await
    }

    /// `docker network ls -f name=<name> -q`
    async fn list_networks(&self, name: &str) -> io::Result<CommandOutput> {
        self.execute(vec![
            "network".to_string(),
            "ls".to_string(),
            "-f".to_string(),
            format!("name={}", name),
            "-q".to_string(),
        ])
        .await
    }

    /// `docker network create --subnet=<subnet> <name>`
    async fn create_network(&self, name: &str, subnet: &str) -> io::Result<CommandOutput> {
        self.execute(vec![
            "network".to_string(),
            "create".to_string(),
            format!("--subnet={}", subnet),
            name.to_string(),
        ])
        .await
    }

    /// `docker run <args...>`
    async fn run_container(&self, args: &[String]) -> io::Result<CommandOutput> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("run".to_string());
        argv.extend_from_slice(args);
        self.execute(argv).await
    }

    /// `docker ps -f name=<filter> -q`
    async fn list_containers(&self, name_filter: &str) -> io::Result<CommandOutput> {
        self.execute(vec![
            "ps".to_string(),
            "-f".to_string(),
            format!("name={}", name_filter),
            "-q".to_string(),
        ])
        .await
    }

    /// `docker stop <ids...>`
    async fn stop_containers(&self, ids: &[String]) -> io::Result<CommandOutput> {
        let mut argv = Vec::with_capacity(ids.len() + 1);
        argv.push("stop".to_string());
        argv.extend_from_slice(ids);
        self.execute(argv).await
    }
}

/// Runtime client that shells out to the `docker` CLI (or a compatible one).
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    timeout: Option<Duration>,
}

impl DockerCli {
    /// Client for the `docker` program found in `PATH`
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Client for another CLI with the same interface, such as `podman`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill invocations that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuntimeClient for DockerCli {
    fn program(&self) -> &str {
        &self.program
    }

    async fn execute(&self, args: Vec<String>) -> io::Result<CommandOutput> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(args);

        debug!("Invoking runtime: {}", render_command(&argv));

        let binary = which::which(&self.program).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not installed or not in PATH: {}", self.program, e),
            )
        })?;

        let mut command = Command::new(binary);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, command.output()).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("`{}` timed out after {:?}", render_command(&argv), timeout),
                    ));
                }
            },
            None => command.output().await?,
        };

        Ok(CommandOutput {
            command: argv,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
