use anyhow::{Context, Result};
use scbw::cli::{
    Args, CommonOptions, ConfigDiscovery, ExecutionMode, MatchFile, PlanConfig, PlanFormat,
    QueryConfig, RunConfig, Settings,
};
use scbw::container::{DockerCli, LaunchSpec, MatchError, MatchOrchestrator, render_command};
use scbw::LaunchPlanner;
use serde::Serialize;
use std::fs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let default_filter = if args.verbose { "scbw=debug" } else { "scbw=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    match mode {
        ExecutionMode::Check(common) => run_check(common).await,
        ExecutionMode::Plan(config) => run_plan(config),
        ExecutionMode::Run(config) => run_match(config).await,
        ExecutionMode::Ps(config) => run_ps(config).await,
        ExecutionMode::Stop(config) => run_stop(config).await,
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
    }
}

fn load_settings(common: &CommonOptions) -> Result<Settings> {
    match &common.config_override {
        Some(path) => {
            info!("Loading settings override from: {:?}", path);
            Settings::from_toml_file(path)
        }
        None => ConfigDiscovery::discover_settings(),
    }
}

fn orchestrator(settings: &Settings) -> MatchOrchestrator<DockerCli> {
    MatchOrchestrator::new(settings.docker_cli(), settings.orchestrator_config())
}

async fn run_check(common: CommonOptions) -> Result<()> {
    let settings = load_settings(&common)?;
    orchestrator(&settings).prepare_host().await?;

    println!(
        "Runtime '{}' is ready, network '{}' available",
        settings.runtime.program, settings.requirements.network
    );
    Ok(())
}

#[derive(Serialize)]
struct PlanDump<'a> {
    launches: &'a [LaunchSpec],
}

fn run_plan(config: PlanConfig) -> Result<()> {
    let settings = load_settings(&config.common)?;
    let file = MatchFile::from_toml_file(&config.match_file)?;

    let planner = LaunchPlanner::new(settings.requirements.network.as_str());
    let specs = planner.draft_match(&file.players, &file.game)?;

    for spec in &specs {
        let mut argv = vec![settings.runtime.program.clone(), "run".to_string()];
        argv.extend(spec.run_args());
        println!("{}", render_command(&argv));
    }

    if let Some((path, format)) = &config.dump_plan {
        let dump = PlanDump { launches: &specs };
        let content = match format {
            PlanFormat::Json => serde_json::to_string_pretty(&dump)?,
            PlanFormat::Toml => toml::to_string_pretty(&dump)?,
        };
        fs::write(path, content).with_context(|| format!("writing plan to {:?}", path))?;
        info!("Dumped {} launch specifications to {:?}", specs.len(), path);
    }

    Ok(())
}

async fn run_match(config: RunConfig) -> Result<()> {
    let settings = load_settings(&config.common)?;
    let file = MatchFile::from_toml_file(&config.match_file)?;
    let orchestrator = orchestrator(&settings);

    if config.skip_checks {
        warn!("Skipping runtime checks");
    } else {
        orchestrator.prepare_host().await?;
    }

    info!(
        "Launching {} on {} with {} players",
        file.game.game_name,
        file.game.map_name,
        file.players.len()
    );

    match orchestrator.launch_match(&file.game, &file.players).await {
        Ok(handles) => {
            for handle in handles {
                println!(
                    "{}\t{}\t{}",
                    handle.container_name, handle.container_id, handle.participant
                );
            }
            Ok(())
        }
        Err(MatchError::Aborted { launched, source }) => {
            error!("Match aborted: {}", source);
            error!(
                "Still running: {}; clean up with `scbw stop {}`",
                launched.join(", "),
                file.game.container_prefix()
            );
            Err(MatchError::Aborted { launched, source }.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_ps(config: QueryConfig) -> Result<()> {
    let settings = load_settings(&config.common)?;
    let containers = orchestrator(&settings)
        .query()
        .running_containers(&config.prefix)
        .await?;

    for id in &containers {
        println!("{}", id);
    }
    info!("{} running containers match {}", containers.len(), config.prefix);
    Ok(())
}

async fn run_stop(config: QueryConfig) -> Result<()> {
    let settings = load_settings(&config.common)?;
    let stopped = orchestrator(&settings)
        .query()
        .stop_match(&config.prefix)
        .await?;

    for id in &stopped {
        println!("{}", id);
    }
    Ok(())
}
