//! RTS command engine - Development Tools

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rts_command::config::EngineConfig;
use rts_tools::replay_check::verify_replay_file;
use rts_tools::script::{run_script, ScenarioScript};
use rts_tools::validate::validate_config_file;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rts-tools")]
#[command(about = "Development tools for the RTS command engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an engine config file
    Validate {
        /// Path to the RON config
        path: PathBuf,
    },
    /// Run a scenario script and print its final state hash
    Simulate {
        /// Path to the RON scenario script
        script: PathBuf,
        /// Number of ticks to run
        #[arg(short, long, default_value_t = 600)]
        ticks: u64,
        /// Engine config, built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the recorded replay here
        #[arg(short, long)]
        replay: Option<PathBuf>,
    },
    /// Re-run a replay file and check its final state hash
    Replay {
        /// Path to the replay file
        path: PathBuf,
        /// Engine config, built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> rts_tools::Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn run(command: Commands) -> rts_tools::Result<bool> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating engine config: {}", path.display());
            let report = validate_config_file(&path)?;
            tracing::info!(
                element_types = report.element_types,
                factories = report.factories,
                "Validation passed"
            );
            Ok(true)
        }
        Commands::Simulate {
            script,
            ticks,
            config,
            replay,
        } => {
            let config = load_config(config.as_deref())?;
            let script = ScenarioScript::load(&script)?;
            let summary = run_script(&script, config, ticks)?;
            println!("tick {} state hash {:#018x}", summary.ticks, summary.state_hash);
            if let Some(path) = replay {
                summary.replay.save(&path)?;
                tracing::info!("Replay written to {}", path.display());
            }
            Ok(true)
        }
        Commands::Replay { path, config } => {
            let config = load_config(config.as_deref())?;
            let report = verify_replay_file(&path, &config)?;
            if report.matches {
                tracing::info!(
                    scenario = %report.scenario_name,
                    commands = report.commands,
                    tick = report.final_tick,
                    "Replay verified"
                );
            } else {
                tracing::error!(
                    scenario = %report.scenario_name,
                    tick = report.final_tick,
                    "Replay diverged"
                );
            }
            Ok(report.matches)
        }
    }
}

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
