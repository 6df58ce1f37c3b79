//! Host pre-flight checks.
//!
//! Verifies that the container runtime is installed at the pinned version and
//! can actually run containers, and that the private match network exists.

use crate::container::client::{CommandOutput, RuntimeClient, render_command};
use crate::container::{MatchError, Result};
use serde::{Deserialize, Serialize};
use std::io;
use tracing::{debug, info};

/// Network every match container attaches to
pub const DEFAULT_NETWORK: &str = "sc_net";

/// Subnet used when the match network has to be created
pub const DEFAULT_SUBNET: &str = "172.18.0.0/16";

/// What the host runtime must satisfy before a match can start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostRequirements {
    /// Required prefix of the `--version` output
    pub version_prefix: String,
    /// Image run to prove containers can start
    pub probe_image: String,
    /// Substring the probe image must print
    pub probe_marker: String,
    pub network: String,
    pub subnet: String,
}

impl Default for HostRequirements {
    fn default() -> Self {
        Self {
            version_prefix: "Docker version 17.09.0-ce".to_string(),
            probe_image: "hello-world".to_string(),
            probe_marker: "Hello".to_string(),
            network: DEFAULT_NETWORK.to_string(),
            subnet: DEFAULT_SUBNET.to_string(),
        }
    }
}

/// Host environment checks against a container runtime.
pub struct HostEnvironment<'a, R: RuntimeClient + ?Sized> {
    runtime: &'a R,
    requirements: HostRequirements,
}

impl<'a, R: RuntimeClient + ?Sized> HostEnvironment<'a, R> {
    pub fn new(runtime: &'a R, requirements: HostRequirements) -> Self {
        Self {
            runtime,
            requirements,
        }
    }

    /// Check that the runtime answers its version query with the pinned version.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Environment`] if the runtime cannot be invoked or
    /// reports another version.
    pub async fn check_runtime_version(&self) -> Result<()> {
        let args = ["--version"];
        let output = self.runtime.version().await.map_err(|e| {
            self.invocation_error(&args, e, "did you install the container runtime?")
        })?;
        let output = require_success(output)?;

        if !output.stdout.starts_with(&self.requirements.version_prefix) {
            return Err(MatchError::Environment {
                command: output.command_line(),
                reason: format!(
                    "version does not start with '{}'",
                    self.requirements.version_prefix
                ),
                output: output.combined_output(),
            });
        }

        debug!("Runtime version: {}", output.stdout.trim());
        Ok(())
    }

    /// Check that the runtime can run a trivial container.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Environment`] if the probe cannot be run or its
    /// output lacks the expected marker.
    pub async fn check_runtime_operable(&self) -> Result<()> {
        let image = self.requirements.probe_image.as_str();
        let output = self.runtime.run_image(image).await.map_err(|e| {
            self.invocation_error(
                &["run", image],
                e,
                "do you have sufficient rights to run containers?",
            )
        })?;
        let output = require_success(output)?;

        if !output.stdout.contains(&self.requirements.probe_marker) {
            return Err(MatchError::Environment {
                command: output.command_line(),
                reason: format!(
                    "could not find '{}' in the {} output",
                    self.requirements.probe_marker, image
                ),
                output: output.combined_output(),
            });
        }

        debug!("Runtime can run {}", image);
        Ok(())
    }

    /// Create the isolated network unless one with this name already exists.
    ///
    /// Returns `true` when the network was created by this call.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Environment`] if listing or creating fails.
    pub async fn ensure_isolated_network(&self, name: &str, subnet: &str) -> Result<bool> {
        let filter = format!("name={}", name);
        let output = self
            .runtime
            .list_networks(name)
            .await
            .map_err(|e| self.invocation_error(&["network", "ls", "-f", &filter, "-q"], e, ""))?;
        let output = require_success(output)?;

        let existing = output.stdout.trim();
        if !existing.is_empty() {
            debug!("Network {} already exists: {}", name, existing);
            return Ok(false);
        }

        info!("Creating isolated network {} ({})", name, subnet);
        let subnet_flag = format!("--subnet={}", subnet);
        let output = self
            .runtime
            .create_network(name, subnet)
            .await
            .map_err(|e| {
                self.invocation_error(&["network", "create", &subnet_flag, name], e, "")
            })?;
        let output = require_success(output)?;

        debug!("Network id: {}", output.stdout.trim());
        Ok(true)
    }

    /// Run every check in order, stopping at the first failure:
    /// version, then operability, then the network.
    ///
    /// # Errors
    ///
    /// Returns the first [`MatchError::Environment`] encountered.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.check_runtime_version().await?;
        self.check_runtime_operable().await?;
        self.ensure_isolated_network(&self.requirements.network, &self.requirements.subnet)
            .await?;

        info!("Host environment ready ({})", self.runtime.program());
        Ok(())
    }

    fn invocation_error(&self, args: &[&str], error: io::Error, hint: &str) -> MatchError {
        let mut argv = vec![self.runtime.program().to_string()];
        argv.extend(args.iter().map(|arg| arg.to_string()));

        let reason = if hint.is_empty() {
            format!("could not invoke runtime: {}", error)
        } else {
            format!("could not invoke runtime: {}; {}", error, hint)
        };

        MatchError::Environment {
            command: render_command(&argv),
            reason,
            output: String::new(),
        }
    }
}

fn require_success(output: CommandOutput) -> Result<CommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(MatchError::Environment {
            command: output.command_line(),
            reason: format!("exited with status {}", output.exit_code),
            output: output.combined_output(),
        })
    }
}
