use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "screenbank-cli", version, about = "Screenbank CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balance, difficulty and monitor state
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Credit a completed workout
    Earn(commands::earn::EarnArgs),
    /// Deliver a usage threshold label (e.g. "minute_12")
    Threshold {
        label: String,
    },
    /// Monitoring interval callbacks
    Interval {
        #[command(subcommand)]
        action: commands::interval::IntervalAction,
    },
    /// Difficulty level
    Difficulty {
        #[command(subcommand)]
        action: commands::difficulty::DifficultyAction,
    },
    /// Diagnostic log
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Monitored app selection
    Selection {
        #[command(subcommand)]
        action: commands::selection::SelectionAction,
    },
    /// Turn usage monitoring on or off
    Monitoring {
        #[command(subcommand)]
        action: commands::monitoring::MonitoringAction,
    },
    /// Background monitor liveness
    Heartbeat {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SCREENBANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Status { json } => commands::status::run(json),
        Commands::Earn(args) => commands::earn::run(args),
        Commands::Threshold { label } => commands::threshold::run(&label),
        Commands::Interval { action } => commands::interval::run(action),
        Commands::Difficulty { action } => commands::difficulty::run(action),
        Commands::Log { action } => commands::log::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Selection { action } => commands::selection::run(action),
        Commands::Monitoring { action } => commands::monitoring::run(action),
        Commands::Heartbeat { json } => commands::heartbeat::run(json),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
