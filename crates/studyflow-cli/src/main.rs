use clap::{Parser, Subcommand};
use studyflow_core::storage::LoggingConfig;
use studyflow_core::Config;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "studyflow-cli", version, about = "Studyflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// XP, level and daily challenges
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Study goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Focus/break presets
    Preset {
        #[command(subcommand)]
        action: commands::preset::PresetAction,
    },
    /// Study routines
    Routine {
        #[command(subcommand)]
        action: commands::routine::RoutineAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Filter configured under `[logging]`. Runs before the subscriber exists,
/// so problems go straight to stderr.
fn configured_filter() -> String {
    match Config::load() {
        Ok(config) => config.logging.filter,
        Err(e) => {
            eprintln!("warning: using default log filter: {e}");
            LoggingConfig::default().filter
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(configured_filter()).unwrap_or_else(|_| EnvFilter::new("warn"))
    });

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Stats { action } => commands::stats::run(action).await,
        Commands::Progress { action } => commands::progress::run(action).await,
        Commands::Goal { action } => commands::goal::run(action).await,
        Commands::Preset { action } => commands::preset::run(action),
        Commands::Routine { action } => commands::routine::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
