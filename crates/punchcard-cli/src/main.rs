use std::sync::Arc;

use clap::{Parser, Subcommand};
use punchcard_core::{
    AttendanceStore, AutoConfirm, Clock, Config, ConfirmTransition, HttpAttendanceStore,
    InMemoryStore, SessionEngine, SystemClock,
};

mod commands;

use commands::session::{SessionCommand, StdinConfirm};

#[derive(Parser)]
#[command(name = "punchcard", version, about = "Attendance time tracking from the terminal")]
struct Cli {
    /// Use an in-process store instead of the remote attendance API
    #[arg(long, global = true)]
    offline: bool,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clock in and start the day's session
    In,
    /// Start a break
    Break,
    /// Resume work after a break
    Resume,
    /// Clock out and complete the session
    Out,
    /// Show the reconciled session status
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow the live session display until Ctrl-C
    Watch,
    /// Submit a manual clock-out correction for a missed clock-out
    Correct {
        /// Corrected clock-out time (RFC 3339, or "YYYY-MM-DD HH:MM" local)
        #[arg(long)]
        time: String,
        /// Why the clock-out was missed
        #[arg(long)]
        reason: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let command = match cli.command {
        Commands::Config { action } => return commands::config::run(action),
        Commands::In => SessionCommand::ClockIn,
        Commands::Break => SessionCommand::TakeBreak,
        Commands::Resume => SessionCommand::ResumeWork,
        Commands::Out => SessionCommand::ClockOut,
        Commands::Status { json } => SessionCommand::Status { json },
        Commands::Watch => SessionCommand::Watch,
        Commands::Correct { time, reason } => SessionCommand::Correct { time, reason },
    };

    let config = Config::load()?;
    let confirm: Box<dyn ConfirmTransition> = if cli.yes || !config.policy.confirm_transitions {
        Box::new(AutoConfirm)
    } else {
        Box::new(StdinConfirm)
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // The engine is generic over its store, so each backend gets its own
    // monomorphized path.
    if cli.offline {
        let store = InMemoryStore::new(Arc::clone(&clock));
        run_session(store, clock, &config, confirm, command).await
    } else {
        let store =
            HttpAttendanceStore::new(&config.api.base_url, config.api.access_token.clone())?;
        run_session(store, clock, &config, confirm, command).await
    }
}

async fn run_session<S: AttendanceStore>(
    store: S,
    clock: Arc<dyn Clock>,
    config: &Config,
    confirm: Box<dyn ConfirmTransition>,
    command: SessionCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine =
        SessionEngine::with_policy(store, clock, config.engine_policy()).with_confirmation(confirm);
    commands::session::run(engine, command).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
