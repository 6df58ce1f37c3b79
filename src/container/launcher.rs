//! Starts participant containers from launch specifications.

use crate::container::client::{RuntimeClient, render_command};
use crate::container::{LaunchSpec, MatchError, Result};
use serde::Serialize;
use tracing::{debug, info};

/// A participant container the runtime accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerHandle {
    pub participant: String,
    pub container_name: String,
    /// Id printed by the runtime on a detached run
    pub container_id: String,
}

/// Runs launch specifications against a container runtime.
///
/// Each launch is a single runtime invocation; nothing is retried.
pub struct ContainerLauncher<'a, R: RuntimeClient + ?Sized> {
    runtime: &'a R,
}

impl<'a, R: RuntimeClient + ?Sized> ContainerLauncher<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Start the container described by `spec` in the background.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Launch`] if the runtime cannot be invoked or
    /// exits with a nonzero status.
    pub async fn launch(&self, spec: &LaunchSpec) -> Result<ContainerHandle> {
        let args = spec.run_args();
        let launch_error = |command: String, reason: String| MatchError::Launch {
            participant: spec.participant.clone(),
            container: spec.container_name.clone(),
            command,
            reason,
        };

        debug!("Launching {} as {}", spec.participant, spec.container_name);

        let output = self.runtime.run_container(&args).await.map_err(|e| {
            let mut argv = vec![self.runtime.program().to_string(), "run".to_string()];
            argv.extend(args.iter().cloned());
            launch_error(render_command(&argv), format!("could not invoke runtime: {}", e))
        })?;

        if !output.success() {
            return Err(launch_error(
                output.command_line(),
                format!(
                    "runtime exited with status {}: {}",
                    output.exit_code,
                    output.combined_output()
                ),
            ));
        }

        let container_id = output.stdout.trim().to_string();
        info!(
            "Launched {} in container {} ({})",
            spec.participant, spec.container_name, container_id
        );

        Ok(ContainerHandle {
            participant: spec.participant.clone(),
            container_name: spec.container_name.clone(),
            container_id,
        })
    }
}
