//! Whole-match launch orchestration.
//!
//! Joiners look for the host's LAN session as soon as they start, so the host
//! container (index 0) is launched first and must pass a readiness gate before
//! any joiner is started. Participants are launched one at a time in index
//! order. A failure stops the match immediately; containers already running
//! are reported in the error and left for the caller to tear down.

use crate::container::{
    ContainerHandle, ContainerLauncher, HostEnvironment, HostRequirements, MatchError, MatchQuery,
    Result, RuntimeClient, render_command,
};
use crate::game::{MatchContext, Participant};
use crate::planner::LaunchPlanner;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How to decide that the host container is ready for joiners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Launch joiners right away
    None,
    /// Wait a fixed amount of time
    Delay(Duration),
    /// Poll the runtime until the host container is listed as running
    ContainerRunning {
        timeout: Duration,
        poll_interval: Duration,
    },
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::ContainerRunning {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Match orchestrator configuration.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub requirements: HostRequirements,
    pub readiness: Readiness,
    /// Upper bound for a single launch; a hang past it is a launch failure
    pub launch_timeout: Option<Duration>,
}

/// Launches every participant of a match, host first.
pub struct MatchOrchestrator<R: RuntimeClient> {
    runtime: R,
    planner: LaunchPlanner,
    config: OrchestratorConfig,
}

impl<R: RuntimeClient> MatchOrchestrator<R> {
    pub fn new(runtime: R, config: OrchestratorConfig) -> Self {
        let planner = LaunchPlanner::new(config.requirements.network.clone());
        Self {
            runtime,
            planner,
            config,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn planner(&self) -> &LaunchPlanner {
        &self.planner
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn environment(&self) -> HostEnvironment<'_, R> {
        HostEnvironment::new(&self.runtime, self.config.requirements.clone())
    }

    pub fn query(&self) -> MatchQuery<'_, R> {
        MatchQuery::new(&self.runtime)
    }

    /// Run the host pre-flight checks.
    ///
    /// # Errors
    ///
    /// Returns the first environment check failure.
    pub async fn prepare_host(&self) -> Result<()> {
        self.environment().ensure_ready().await
    }

    /// Launch all participants in index order.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::Config`] for an empty roster. Any later failure
    /// is returned as-is when nothing was started yet, and wrapped in
    /// [`MatchError::Aborted`] listing the running containers otherwise.
    pub async fn launch_match(
        &self,
        ctx: &MatchContext,
        participants: &[Participant],
    ) -> Result<Vec<ContainerHandle>> {
        if participants.is_empty() {
            return Err(MatchError::Config(format!(
                "match {} has no participants",
                ctx.game_name
            )));
        }

        let num_players = participants.len();
        info!(
            "Launching match {} on {} with {} players",
            ctx.game_name, ctx.map_name, num_players
        );

        let mut handles: Vec<ContainerHandle> = Vec::with_capacity(num_players);
        for (nth_player, participant) in participants.iter().enumerate() {
            let handle = match self
                .launch_participant(participant, nth_player, num_players, ctx)
                .await
            {
                Ok(handle) => handle,
                Err(e) => return Err(abort(&handles, e)),
            };

            let is_host = nth_player == 0;
            handles.push(handle);

            if is_host && num_players > 1 {
                if let Err(e) = self.await_ready(&handles[0]).await {
                    return Err(abort(&handles, e));
                }
            }
        }

        info!("Match {} launched", ctx.game_name);
        Ok(handles)
    }

    /// Plan and launch a single participant.
    ///
    /// # Errors
    ///
    /// Returns planning errors, or [`MatchError::Launch`] if the runtime
    /// fails or the launch exceeds the configured timeout.
    pub async fn launch_participant(
        &self,
        participant: &Participant,
        nth_player: usize,
        num_players: usize,
        ctx: &MatchContext,
    ) -> Result<ContainerHandle> {
        let spec = self
            .planner
            .plan(participant, nth_player, num_players, ctx)?;
        let launcher = ContainerLauncher::new(&self.runtime);

        match self.config.launch_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, launcher.launch(&spec)).await {
                Ok(result) => result,
                Err(_) => {
                    let mut argv = vec![self.runtime.program().to_string(), "run".to_string()];
                    argv.extend(spec.run_args());
                    Err(MatchError::Launch {
                        participant: spec.participant.clone(),
                        container: spec.container_name.clone(),
                        command: render_command(&argv),
                        reason: format!("launch timed out after {:?}", timeout),
                    })
                }
            },
            None => launcher.launch(&spec).await,
        }
    }

    async fn await_ready(&self, host: &ContainerHandle) -> Result<()> {
        match self.config.readiness {
            Readiness::None => Ok(()),
            Readiness::Delay(delay) => {
                debug!("Waiting {:?} for {}", delay, host.container_name);
                tokio::time::sleep(delay).await;
                Ok(())
            }
            Readiness::ContainerRunning {
                timeout,
                poll_interval,
            } => {
                let query = self.query();
                // No deadline when the timeout exceeds the clock's range
                let deadline = Instant::now().checked_add(timeout);

                loop {
                    let running = query.running_containers(&host.container_name).await?;
                    if running
                        .iter()
                        .any(|id| host.container_id.starts_with(id.as_str()))
                    {
                        debug!("Host container {} is running", host.container_name);
                        return Ok(());
                    }

                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return Err(MatchError::NotReady {
                            container: host.container_name.clone(),
                            reason: format!("not running after {:?}", timeout),
                        });
                    }

                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
}

fn abort(launched: &[ContainerHandle], error: MatchError) -> MatchError {
    if launched.is_empty() {
        return error;
    }

    let launched: Vec<String> = launched
        .iter()
        .map(|handle| handle.container_name.clone())
        .collect();
    warn!(
        "Match aborted, containers left running: {:?} ({})",
        launched, error
    );

    MatchError::Aborted {
        launched,
        source: Box::new(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testing::RecordingRuntime;
    use crate::game::{HostDirs, Race};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn context(headless: bool) -> MatchContext {
        MatchContext::new(
            "g1",
            "(2)BottleneckSc.scx",
            HostDirs {
                logs: PathBuf::from("/srv/sc/logs"),
                bots: PathBuf::from("/srv/sc/bots"),
                maps: PathBuf::from("/srv/sc/maps"),
                bwta_cache: PathBuf::from("/srv/sc/bwta"),
                bwta2_cache: PathBuf::from("/srv/sc/bwta2"),
            },
        )
        .with_headless(headless)
    }

    fn bots(base: &Path) -> Vec<Participant> {
        vec![
            Participant::bot("A", Race::Terran, base.join("A"), "A.dll"),
            Participant::bot("B", Race::Zerg, base.join("B"), "B.dll"),
        ]
    }

    fn config(readiness: Readiness) -> OrchestratorConfig {
        OrchestratorConfig {
            readiness,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_launches_host_then_joiners() {
        let temp = TempDir::new().unwrap();
        let runtime = RecordingRuntime::new()
            .respond("run -d --privileged --name g1_0_A", 0, "aaaa1111\n")
            .respond("run -d --privileged --name g1_1_B", 0, "bbbb2222\n")
            .respond("ps -f name=g1_0_A", 0, "aaaa1111\n");
        let orchestrator = MatchOrchestrator::new(
            runtime,
            config(Readiness::ContainerRunning {
                timeout: Duration::from_secs(1),
                poll_interval: Duration::from_millis(10),
            }),
        );

        let handles = orchestrator
            .launch_match(&context(true), &bots(temp.path()))
            .await
            .unwrap();

        let names: Vec<&str> = handles.iter().map(|h| h.container_name.as_str()).collect();
        assert_eq!(names, vec!["g1_0_A", "g1_1_B"]);

        let calls = orchestrator.runtime().calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].starts_with("docker run -d --privileged --name g1_0_A"));
        assert_eq!(calls[1], "docker ps -f name=g1_0_A -q");
        assert!(calls[2].starts_with("docker run -d --privileged --name g1_1_B"));

        assert!(temp.path().join("A").join("write_g1_0").is_dir());
        assert!(temp.path().join("B").join("write_g1_1").is_dir());
    }

    #[tokio::test]
    async fn test_readiness_polls_until_running() {
        let temp = TempDir::new().unwrap();
        let runtime = RecordingRuntime::new()
            .respond("run -d", 0, "aaaa1111\n")
            .respond_once("ps", 0, "")
            .respond_once("ps", 0, "")
            .respond("ps", 0, "aaaa1111\n");
        let orchestrator = MatchOrchestrator::new(
            runtime,
            config(Readiness::ContainerRunning {
                timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(5),
            }),
        );

        orchestrator
            .launch_match(&context(true), &bots(temp.path()))
            .await
            .unwrap();

        let polls = orchestrator
            .runtime()
            .calls()
            .iter()
            .filter(|call| call.starts_with("docker ps"))
            .count();
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn test_host_never_ready() {
        let temp = TempDir::new().unwrap();
        let runtime = RecordingRuntime::new().respond("run -d", 0, "aaaa1111\n");
        let orchestrator = MatchOrchestrator::new(
            runtime,
            config(Readiness::ContainerRunning {
                timeout: Duration::from_millis(30),
                poll_interval: Duration::from_millis(5),
            }),
        );

        let err = orchestrator
            .launch_match(&context(true), &bots(temp.path()))
            .await
            .unwrap_err();

        match err {
            MatchError::Aborted { launched, source } => {
                assert_eq!(launched, vec!["g1_0_A"]);
                assert!(matches!(*source, MatchError::NotReady { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(orchestrator.runtime().run_invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_joiner_failure_reports_running_host() {
        let temp = TempDir::new().unwrap();
        let runtime = RecordingRuntime::new()
            .respond("run -d --privileged --name g1_1_B", 125, "")
            .respond("run -d", 0, "aaaa1111\n");
        let orchestrator = MatchOrchestrator::new(runtime, config(Readiness::None));

        let err = orchestrator
            .launch_match(&context(false), &bots(temp.path()))
            .await
            .unwrap_err();

        match err {
            MatchError::Aborted { launched, source } => {
                assert_eq!(launched, vec!["g1_0_A"]);
                assert!(matches!(
                    *source,
                    MatchError::Launch { ref container, .. } if container == "g1_1_B"
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_huge_readiness_timeout_does_not_overflow() {
        let runtime = RecordingRuntime::new()
            .respond("run -d", 0, "aaaa1111\n")
            .respond_once("ps", 0, "")
            .respond("ps", 0, "aaaa1111\n");
        let orchestrator = MatchOrchestrator::new(
            runtime,
            config(Readiness::ContainerRunning {
                timeout: Duration::from_secs(u64::MAX),
                poll_interval: Duration::from_millis(5),
            }),
        );
        let players = vec![
            Participant::human("me", Race::Protoss),
            Participant::human("you", Race::Zerg),
        ];

        let handles = orchestrator.launch_match(&context(true), &players).await.unwrap();
        assert_eq!(handles.len(), 2);
    }

    #[tokio::test]
    async fn test_launch_timeout_reports_attempted_command() {
        let temp = TempDir::new().unwrap();
        let orchestrator = MatchOrchestrator::new(
            RecordingRuntime::new().hang("run -d"),
            OrchestratorConfig {
                launch_timeout: Some(Duration::from_millis(20)),
                ..config(Readiness::None)
            },
        );

        let err = orchestrator
            .launch_match(&context(true), &bots(temp.path()))
            .await
            .unwrap_err();

        match err {
            MatchError::Launch {
                participant,
                container,
                command,
                reason,
            } => {
                assert_eq!(participant, "A");
                assert_eq!(container, "g1_0_A");
                assert!(command.starts_with("docker run -d --privileged --name g1_0_A"));
                assert!(command.contains("--lan --host --map"));
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(orchestrator.runtime().run_invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_host_failure_is_not_wrapped() {
        let temp = TempDir::new().unwrap();
        let runtime = RecordingRuntime::new().respond("run -d", 1, "");
        let orchestrator = MatchOrchestrator::new(runtime, config(Readiness::None));

        let err = orchestrator
            .launch_match(&context(true), &bots(temp.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::Launch { .. }));
        assert_eq!(orchestrator.runtime().run_invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_scratch_dir_conflict_stops_before_launch() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("A").join("write_g1_0")).unwrap();
        let orchestrator = MatchOrchestrator::new(RecordingRuntime::new(), config(Readiness::None));

        let err = orchestrator
            .launch_match(&context(true), &bots(temp.path()))
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::Filesystem { .. }));
        assert!(orchestrator.runtime().calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_roster_rejected() {
        let orchestrator = MatchOrchestrator::new(RecordingRuntime::new(), config(Readiness::None));
        let err = orchestrator.launch_match(&context(true), &[]).await.unwrap_err();
        assert!(matches!(err, MatchError::Config(_)));
    }

    #[tokio::test]
    async fn test_single_player_skips_readiness() {
        let orchestrator = MatchOrchestrator::new(
            RecordingRuntime::new().respond("run -d", 0, "aaaa1111\n"),
            OrchestratorConfig::default(),
        );
        let players = vec![Participant::human("me", Race::Protoss)];

        let handles = orchestrator.launch_match(&context(false), &players).await.unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(orchestrator.runtime().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_host_uses_configured_network() {
        let mut settings = OrchestratorConfig::default();
        settings.requirements.network = "bw_net".to_string();
        let orchestrator = MatchOrchestrator::new(
            RecordingRuntime::new()
                .respond("--version", 0, "Docker version 17.09.0-ce, build afdb6d4")
                .respond("run hello-world", 0, "Hello from Docker!")
                .respond("network ls", 0, "1234\n"),
            settings,
        );

        orchestrator.prepare_host().await.unwrap();
        assert_eq!(orchestrator.planner().network(), "bw_net");
        assert!(
            orchestrator
                .runtime()
                .calls()
                .contains(&"docker network ls -f name=bw_net -q".to_string())
        );
    }
}
