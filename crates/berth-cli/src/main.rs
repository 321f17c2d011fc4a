//! berth CLI
//!
//! Runs Compose projects alongside their synchronization and forwarding
//! sessions:
//! - `plan` shows the sessions and sidecar a project would get
//! - `up`, `start`, `stop`, `down` drive the project and its sessions together
//! - `ps`, `pause`, `resume` inspect and control the sessions

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use berth::commands;
use berth::output::print_error;
use berth_core::OsType;

#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about = "Compose projects with synchronization and forwarding sessions")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Compose file (defaults to compose.yaml or docker-compose.yml in the current directory)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Project name (defaults to the project directory name)
    #[arg(short, long, global = true, env = "COMPOSE_PROJECT_NAME")]
    project_name: Option<String>,

    /// Container engine OS, skipping the engine query ("linux" or "windows")
    #[arg(long, global = true)]
    os: Option<OsType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the sessions and sidecar a project would get
    Plan {
        /// Print the project definition including the sidecar service
        #[arg(long)]
        compose: bool,
    },

    /// Pull service images, the sidecar's included
    Pull,

    /// Create containers without starting them
    Create,

    /// Create and start containers, then reconcile sessions
    Up,

    /// Start existing containers and reconcile sessions
    Start,

    /// Pause sessions and stop containers
    Stop,

    /// Terminate sessions and remove containers and networks
    Down,

    /// List sessions and containers
    Ps,

    /// Pause the project's sessions
    Pause,

    /// Resume the project's sessions
    Resume,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get specific config value
    Get { key: String },
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let project_command = match cli.command {
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => commands::config_show(cli.config.as_ref())?,
                ConfigAction::Get { key } => commands::config_get(cli.config.as_ref(), &key)?,
                ConfigAction::Path => {
                    println!("{}", commands::config_path(cli.config.as_ref()).display())
                }
                ConfigAction::Init { force } => {
                    commands::config_init(cli.config.as_ref(), force)?
                }
            }
            return Ok(());
        }
        other => other,
    };

    let mut config = commands::load_config(cli.config.as_ref())?;
    if let Some(os) = cli.os {
        config.engine.os_type = Some(os);
    }

    let project = commands::load_project(cli.file.as_deref(), cli.project_name.as_deref())?;

    if let Commands::Plan { compose } = project_command {
        return commands::plan_command(&project, &config, compose).await;
    }

    let lifecycle = commands::lifecycle(config)?;
    match project_command {
        Commands::Pull => commands::pull_command(&lifecycle, &project).await,
        Commands::Create => commands::create_command(&lifecycle, &project).await,
        Commands::Up => commands::up_command(&lifecycle, &project).await,
        Commands::Start => commands::start_command(&lifecycle, &project).await,
        Commands::Stop => commands::stop_command(&lifecycle, &project).await,
        Commands::Down => commands::down_command(&lifecycle, &project).await,
        Commands::Ps => commands::ps_command(&lifecycle, &project).await,
        Commands::Pause => commands::pause_command(&lifecycle, &project).await,
        Commands::Resume => commands::resume_command(&lifecycle, &project).await,
        Commands::Plan { .. } | Commands::Config { .. } => Ok(()),
    }
}
