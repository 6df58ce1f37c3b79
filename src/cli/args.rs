//! Command line argument parsing
//!
//! Subcommands:
//! - `check`: Verify the container runtime and create the match network
//! - `plan`: Print the runtime invocations for a match file without launching
//! - `run`: Launch every participant of a match file
//! - `ps`: List running containers of a match
//! - `stop`: Stop running containers of a match
//! - `show-config`: Show settings discovery information

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ExecutionMode {
    Check(CommonOptions),
    Plan(PlanConfig),
    Run(RunConfig),
    Ps(QueryConfig),
    Stop(QueryConfig),
    ShowConfig,
}

/// Options shared by every runtime-facing command
#[derive(Debug, Clone, Default)]
pub struct CommonOptions {
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct PlanConfig {
    pub match_file: PathBuf,
    pub dump_plan: Option<(PathBuf, PlanFormat)>,
    pub common: CommonOptions,
}

#[derive(Debug)]
pub struct RunConfig {
    pub match_file: PathBuf,
    pub skip_checks: bool,
    pub common: CommonOptions,
}

#[derive(Debug)]
pub struct QueryConfig {
    pub prefix: String,
    pub common: CommonOptions,
}

/// Serialization used for `--dump-plan`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Toml,
}

#[derive(Debug, Parser)]
#[command(name = "scbw")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Launch Brood War bot matches in isolated containers")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Settings file path (skips discovery)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check the container runtime and ensure the match network exists
    Check,
    /// Show the container invocations for a match file
    Plan {
        /// Match file (TOML)
        file: PathBuf,
        /// Dump launch specifications to file (JSON or TOML format based on extension)
        #[arg(long = "dump-plan", value_name = "FILE")]
        dump_plan: Option<PathBuf>,
    },
    /// Launch a match
    Run {
        /// Match file (TOML)
        file: PathBuf,
        /// Skip runtime checks and network setup
        #[arg(long = "skip-checks")]
        skip_checks: bool,
    },
    /// List running containers whose name starts with PREFIX
    Ps {
        /// Container name prefix, usually `<game>_`
        prefix: String,
    },
    /// Stop running containers whose name starts with PREFIX
    Stop {
        /// Container name prefix, usually `<game>_`
        prefix: String,
    },
    /// Show settings discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        let common = CommonOptions {
            config_override: self.config.clone(),
            verbose: self.verbose,
        };

        match &self.command {
            Some(Commands::Check) => Ok(ExecutionMode::Check(common)),
            Some(Commands::Plan { file, dump_plan }) => {
                let dump_plan = match dump_plan {
                    Some(path) => Some((path.clone(), Self::detect_plan_format(path)?)),
                    None => None,
                };
                Ok(ExecutionMode::Plan(PlanConfig {
                    match_file: file.clone(),
                    dump_plan,
                    common,
                }))
            }
            Some(Commands::Run { file, skip_checks }) => Ok(ExecutionMode::Run(RunConfig {
                match_file: file.clone(),
                skip_checks: *skip_checks,
                common,
            })),
            Some(Commands::Ps { prefix }) => Ok(ExecutionMode::Ps(QueryConfig {
                prefix: Self::checked_prefix(prefix)?,
                common,
            })),
            Some(Commands::Stop { prefix }) => Ok(ExecutionMode::Stop(QueryConfig {
                prefix: Self::checked_prefix(prefix)?,
                common,
            })),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            None => Err(
                "No command specified. Use 'scbw --help' to see available commands.".to_string(),
            ),
        }
    }

    /// Pick the dump format from the file extension (case-insensitive)
    fn detect_plan_format(path: &Path) -> Result<PlanFormat, String> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(PlanFormat::Json),
            "toml" => Ok(PlanFormat::Toml),
            other => Err(format!(
                "Unsupported plan format '{}' for {:?}: use .json or .toml",
                other, path
            )),
        }
    }

    // An empty prefix would match every container on the host.
    fn checked_prefix(prefix: &str) -> Result<String, String> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err("Container name prefix must not be empty".to_string());
        }
        Ok(prefix.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: Commands) -> Args {
        Args {
            config: None,
            verbose: false,
            command: Some(command),
        }
    }

    #[test]
    fn test_run_command() {
        let args = Args {
            config: Some(PathBuf::from("settings.toml")),
            verbose: true,
            command: Some(Commands::Run {
                file: PathBuf::from("match.toml"),
                skip_checks: true,
            }),
        };

        if let Ok(ExecutionMode::Run(config)) = args.mode() {
            assert_eq!(config.match_file, PathBuf::from("match.toml"));
            assert!(config.skip_checks);
            assert!(config.common.verbose);
            assert_eq!(
                config.common.config_override,
                Some(PathBuf::from("settings.toml"))
            );
        } else {
            panic!("Expected Run mode");
        }
    }

    #[test]
    fn test_plan_dump_format_detection() {
        let cases = [
            ("plan.json", PlanFormat::Json),
            ("plan.JSON", PlanFormat::Json),
            ("out/plan.toml", PlanFormat::Toml),
        ];

        for (path, expected) in cases {
            let mode = args(Commands::Plan {
                file: PathBuf::from("match.toml"),
                dump_plan: Some(PathBuf::from(path)),
            })
            .mode();

            match mode {
                Ok(ExecutionMode::Plan(config)) => {
                    assert_eq!(config.dump_plan, Some((PathBuf::from(path), expected)));
                }
                other => panic!("Expected Plan mode for {path}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_plan_dump_unknown_extension() {
        let result = args(Commands::Plan {
            file: PathBuf::from("match.toml"),
            dump_plan: Some(PathBuf::from("plan.yaml")),
        })
        .mode();

        assert!(result.is_err());
    }

    #[test]
    fn test_plan_without_dump() {
        match args(Commands::Plan {
            file: PathBuf::from("match.toml"),
            dump_plan: None,
        })
        .mode()
        {
            Ok(ExecutionMode::Plan(config)) => assert!(config.dump_plan.is_none()),
            other => panic!("Expected Plan mode, got {other:?}"),
        }
    }

    #[test]
    fn test_query_commands() {
        match args(Commands::Ps {
            prefix: " g1_ ".to_string(),
        })
        .mode()
        {
            Ok(ExecutionMode::Ps(config)) => assert_eq!(config.prefix, "g1_"),
            other => panic!("Expected Ps mode, got {other:?}"),
        }

        assert!(matches!(
            args(Commands::Stop {
                prefix: "g1_".to_string()
            })
            .mode(),
            Ok(ExecutionMode::Stop(_))
        ));
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let result = args(Commands::Stop {
            prefix: "  ".to_string(),
        })
        .mode();
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "scbw",
            "-v",
            "plan",
            "match.toml",
            "--dump-plan",
            "p.json",
        ])
        .unwrap();

        assert!(args.verbose);
        assert!(matches!(args.mode(), Ok(ExecutionMode::Plan(_))));
    }

    #[test]
    fn test_no_command_error() {
        let args = Args {
            config: None,
            verbose: false,
            command: None,
        };
        assert!(args.mode().is_err());
    }
}
