use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smartfarm::config::ClientConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "smartfarm")]
#[command(version, about = "Manage your smart farms and their devices")]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to smartfarm.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL. Overrides SMARTFARM_BASE_URL and smartfarm.toml.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session token
    Login {
        /// Email address (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Create a new account
    Signup,
    /// Clear the stored session
    Logout,
    /// Show the server and whether a session is stored
    Status,
    /// Work with your farms
    Farms {
        #[command(subcommand)]
        command: FarmsCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum FarmsCommands {
    /// List your farms
    List,
    /// Show one farm with its devices
    Show { id: i64 },
    /// Register a new farm interactively
    Add,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default smartfarm.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "smartfarm=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ClientConfig::load(cli.config.clone(), cli.base_url.clone())
        .context("Failed to load configuration")?;

    match &cli.command {
        Commands::Login { email } => cmd::cmd_login(&config, email.clone()).await?,
        Commands::Signup => cmd::cmd_signup(&config).await?,
        Commands::Logout => cmd::cmd_logout(&config)?,
        Commands::Status => cmd::cmd_status(&config)?,
        Commands::Farms { command } => match command {
            FarmsCommands::List => cmd::cmd_farms_list(&config).await?,
            FarmsCommands::Show { id } => cmd::cmd_farms_show(&config, *id).await?,
            FarmsCommands::Add => cmd::cmd_farms_add(&config).await?,
        },
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
