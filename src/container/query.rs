//! Running-container queries for monitoring and cleanup.

use crate::container::client::{CommandOutput, RuntimeClient, render_command};
use crate::container::{MatchError, Result};
use std::io;
use tracing::{debug, info};

/// Container id as printed by the runtime
pub type ContainerId = String;

/// Looks up the containers of a match by name prefix.
pub struct MatchQuery<'a, R: RuntimeClient + ?Sized> {
    runtime: &'a R,
}

impl<'a, R: RuntimeClient + ?Sized> MatchQuery<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Ids of running containers whose name matches `name_prefix`.
    ///
    /// An empty list means nothing matched.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Query`] if the runtime cannot be invoked or
    /// exits with a nonzero status.
    pub async fn running_containers(&self, name_prefix: &str) -> Result<Vec<ContainerId>> {
        let result = self.runtime.list_containers(name_prefix).await;
        let output = self.checked(result, &["ps", "-f", &format!("name={}", name_prefix), "-q"])?;

        let containers: Vec<ContainerId> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        debug!("Running containers for {}: {:?}", name_prefix, containers);
        Ok(containers)
    }

    /// Stop every running container of a match, returning the stopped ids.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Query`] if listing or stopping fails.
    pub async fn stop_match(&self, name_prefix: &str) -> Result<Vec<ContainerId>> {
        let containers = self.running_containers(name_prefix).await?;
        if containers.is_empty() {
            debug!("No running containers for {}", name_prefix);
            return Ok(containers);
        }

        let result = self.runtime.stop_containers(&containers).await;
        let mut args = vec!["stop"];
        args.extend(containers.iter().map(String::as_str));
        self.checked(result, &args)?;

        info!("Stopped {} containers for {}", containers.len(), name_prefix);
        Ok(containers)
    }

    fn checked(&self, result: io::Result<CommandOutput>, args: &[&str]) -> Result<CommandOutput> {
        let output = result.map_err(|e| {
            let mut argv = vec![self.runtime.program().to_string()];
            argv.extend(args.iter().map(|arg| arg.to_string()));
            MatchError::Query {
                command: render_command(&argv),
                reason: format!("could not invoke runtime: {}", e),
            }
        })?;

        if !output.success() {
            return Err(MatchError::Query {
                command: output.command_line(),
                reason: format!(
                    "exited with status {}: {}",
                    output.exit_code,
                    output.combined_output()
                ),
            });
        }

        Ok(output)
    }
}
