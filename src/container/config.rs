//! Per-participant launch specifications.
//!
//! A [`LaunchSpec`] captures everything needed to start one participant
//! container. It is assembled through [`LaunchSpecBuilder`], never mutated
//! afterwards, and rendered into runtime arguments by [`LaunchSpec::run_args`].

use crate::container::{MatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Mount access mode
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Rw,
    Ro,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Rw => "rw",
            AccessMode::Ro => "ro",
        }
    }
}

/// Host directory bound into the container
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VolumeMount {
    pub host: PathBuf,
    pub guest: String,
    pub mode: AccessMode,
}

impl VolumeMount {
    pub fn new(host: impl Into<PathBuf>, guest: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            host: host.into(),
            guest: guest.into(),
            mode,
        }
    }
}

/// `host:guest:mode`, the form the runtime's `--volume` flag takes
impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.host.display(),
            self.guest,
            self.mode.as_str()
        )
    }
}

/// Host port published to a guest port
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortMapping {
    pub host: u16,
    pub guest: u16,
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.guest)
    }
}

/// Launch specification builder.
pub struct LaunchSpecBuilder {
    participant: Option<String>,
    container_name: Option<String>,
    volumes: Vec<VolumeMount>,
    network: Option<String>,
    port_mapping: Option<PortMapping>,
    image: Option<String>,
    runtime_opts: Vec<String>,
    entrypoint: Vec<String>,
    entrypoint_extra_args: Vec<String>,
    scratch_dir: Option<PathBuf>,
}

impl Default for LaunchSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchSpecBuilder {
    pub fn new() -> Self {
        Self {
            participant: None,
            container_name: None,
            volumes: Vec::new(),
            network: None,
            port_mapping: None,
            image: None,
            runtime_opts: Vec::new(),
            entrypoint: Vec::new(),
            entrypoint_extra_args: Vec::new(),
            scratch_dir: None,
        }
    }

    /// Participant display name, used in logs and errors
    pub fn participant<S: Into<String>>(mut self, name: S) -> Self {
        self.participant = Some(name.into());
        self
    }

    pub fn container_name<S: Into<String>>(mut self, name: S) -> Self {
        self.container_name = Some(name.into());
        self
    }

    /// Append a volume; order is preserved on the command line
    pub fn volume(mut self, mount: VolumeMount) -> Self {
        self.volumes.push(mount);
        self
    }

    pub fn network<S: Into<String>>(mut self, network: S) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn port_mapping(mut self, host: u16, guest: u16) -> Self {
        self.port_mapping = Some(PortMapping { host, guest });
        self
    }

    pub fn image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Extra runtime options placed verbatim before the image
    pub fn runtime_opts<I, S>(mut self, opts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_opts.extend(opts.into_iter().map(Into::into));
        self
    }

    /// Entrypoint script followed by its positional arguments
    pub fn entrypoint<I, S>(mut self, entrypoint: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint = entrypoint.into_iter().map(Into::into).collect();
        self
    }

    /// Flags appended after the positional entrypoint arguments
    pub fn entrypoint_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entrypoint_extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Host directory that must exist before the container starts
    pub fn scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    /// Build the launch specification.
    ///
    /// # Errors
    ///
    /// Returns error if the participant, container name, network, image or
    /// entrypoint is missing.
    pub fn build(self) -> Result<LaunchSpec> {
        let participant = self
            .participant
            .ok_or_else(|| MatchError::Config("Participant is required".to_string()))?;
        let container_name = self
            .container_name
            .ok_or_else(|| MatchError::Config("Container name is required".to_string()))?;
        let network = self
            .network
            .ok_or_else(|| MatchError::Config("Network is required".to_string()))?;
        let image = self
            .image
            .ok_or_else(|| MatchError::Config("Image is required".to_string()))?;

        if self.entrypoint.is_empty() {
            return Err(MatchError::Config(format!(
                "Entrypoint is required for {}",
                container_name
            )));
        }

        Ok(LaunchSpec {
            participant,
            container_name,
            volumes: self.volumes,
            network,
            port_mapping: self.port_mapping,
            image,
            runtime_opts: self.runtime_opts,
            entrypoint: self.entrypoint,
            entrypoint_extra_args: self.entrypoint_extra_args,
            scratch_dir: self.scratch_dir,
        })
    }
}

/// Everything needed to start one participant container.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LaunchSpec {
    pub participant: String,
    pub container_name: String,
    pub volumes: Vec<VolumeMount>,
    pub network: String,
    pub port_mapping: Option<PortMapping>,
    pub image: String,
    pub runtime_opts: Vec<String>,
    pub entrypoint: Vec<String>,
    pub entrypoint_extra_args: Vec<String>,
    pub scratch_dir: Option<PathBuf>,
}

impl LaunchSpec {
    pub fn builder() -> LaunchSpecBuilder {
        LaunchSpecBuilder::new()
    }

    /// Volume bound at `guest`, if any
    pub fn volume_at(&self, guest: &str) -> Option<&VolumeMount> {
        self.volumes.iter().find(|volume| volume.guest == guest)
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    /// Arguments following `run`, in the order the runtime receives them.
    ///
    /// Detached and privileged, then name, volumes, network, optional port,
    /// extra options, image, entrypoint and trailing flags.
    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            "--privileged".to_string(),
            "--name".to_string(),
            self.container_name.clone(),
        ];

        for volume in &self.volumes {
            args.push("--volume".to_string());
            args.push(volume.to_string());
        }

        args.push("--net".to_string());
        args.push(self.network.clone());

        if let Some(port) = &self.port_mapping {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        args.extend(self.runtime_opts.iter().cloned());
        args.push(self.image.clone());
        args.extend(self.entrypoint.iter().cloned());
        args.extend(self.entrypoint_extra_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> LaunchSpecBuilder {
        LaunchSpec::builder()
            .participant("A")
            .container_name("g1_0_A")
            .network("sc_net")
            .image("starcraft:game")
            .entrypoint(["/app/play_human.sh", "A"])
    }

    #[test]
    fn test_volume_display() {
        let volume = VolumeMount::new("/srv/bots", "/app/bots", AccessMode::Ro);
        assert_eq!(volume.to_string(), "/srv/bots:/app/bots:ro");
        assert_eq!(volume.mode, AccessMode::Ro);
    }

    #[test]
    fn test_run_args_order() {
        let spec = minimal()
            .volume(VolumeMount::new("/srv/logs", "/app/logs", AccessMode::Rw))
            .port_mapping(5901, 5900)
            .runtime_opts(["--cpus", "1"])
            .entrypoint_extra_args(["--headful"])
            .build()
            .unwrap();

        assert_eq!(
            spec.run_args(),
            vec![
                "-d",
                "--privileged",
                "--name",
                "g1_0_A",
                "--volume",
                "/srv/logs:/app/logs:rw",
                "--net",
                "sc_net",
                "-p",
                "5901:5900",
                "--cpus",
                "1",
                "starcraft:game",
                "/app/play_human.sh",
                "A",
                "--headful",
            ]
        );
    }

    #[test]
    fn test_run_args_without_port() {
        let spec = minimal().build().unwrap();
        let args = spec.run_args();

        assert!(!args.contains(&"-p".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("A"));
    }

    #[test]
    fn test_missing_image_error() {
        let result = LaunchSpec::builder()
            .participant("A")
            .container_name("g1_0_A")
            .network("sc_net")
            .entrypoint(["/app/play_human.sh"])
            .build();

        assert!(matches!(result, Err(MatchError::Config(_))));
    }

    #[test]
    fn test_missing_entrypoint_error() {
        let result = minimal().entrypoint(Vec::<String>::new()).build();
        assert!(matches!(result, Err(MatchError::Config(_))));
    }

    #[test]
    fn test_volume_at() {
        let spec = minimal()
            .volume(VolumeMount::new("/srv/maps", "/app/sc/maps", AccessMode::Rw))
            .build()
            .unwrap();

        assert!(spec.volume_at("/app/sc/maps").is_some());
        assert!(spec.volume_at("/app/bots").is_none());
    }
}
