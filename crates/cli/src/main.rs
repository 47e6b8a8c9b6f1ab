//! kitsmith CLI: the main entry point.
//!
//! Commands:
//! - `scan`, `reference`, `place`, `acquire`, `fill`, `dispose`, `finalize`
//!   run one stage and print its status line
//! - `sequence`  run the full kit sequence
//! - `index`     inspect the location index
//! - `serve`     start the HTTP gateway and chat relay
//! - `config`    show, validate, or initialise configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "kitsmith",
    about = "kitsmith: automated kit assembly from indexed storage",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.kitsmith/config.toml)
    #[arg(short, long, global = true, env = "KITSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Simulated world fixture to run against
    #[arg(short, long, global = true, env = "KITSMITH_WORLD")]
    world: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan nearby double chests and rebuild the location index
    Scan,

    /// Load the reference kit from the reference container
    Reference,

    /// Withdraw empty containers and place them
    Place,

    /// Place a working source holding ITEM
    Acquire {
        /// Item name, e.g. golden_apple
        item: String,
    },

    /// Fill the placed containers from the working source
    Fill,

    /// Break the working source and discard it
    Dispose,

    /// Break the placed containers and store them in the destination
    Finalize,

    /// Run the full kit sequence
    Sequence {
        /// Comma-separated kit; read from the reference container when omitted
        #[arg(short, long)]
        kit: Option<String>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Location index commands
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Start the HTTP gateway (and the chat relay when enabled)
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// List indexed containers and their items
    Show,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = commands::Context {
        config_path: cli.config,
        world_path: cli.world,
    };

    use commands::stage::Step;
    match cli.command {
        Commands::Scan => commands::stage::run(&ctx, Step::Scan).await?,
        Commands::Reference => commands::stage::run(&ctx, Step::Reference).await?,
        Commands::Place => commands::stage::run(&ctx, Step::Place).await?,
        Commands::Acquire { item } => commands::stage::run(&ctx, Step::Acquire(item)).await?,
        Commands::Fill => commands::stage::run(&ctx, Step::Fill).await?,
        Commands::Dispose => commands::stage::run(&ctx, Step::Dispose).await?,
        Commands::Finalize => commands::stage::run(&ctx, Step::Finalize).await?,
        Commands::Sequence { kit, json } => commands::sequence::run(&ctx, kit, json).await?,
        Commands::Index { action } => match action {
            IndexAction::Show => commands::index::show(&ctx).await?,
        },
        Commands::Serve { port } => commands::serve::run(&ctx, port).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&ctx)?,
            ConfigAction::Validate => commands::config_cmd::validate(&ctx)?,
            ConfigAction::Path => commands::config_cmd::path(&ctx),
            ConfigAction::Init { force } => commands::config_cmd::init(&ctx, force)?,
        },
    }

    Ok(())
}
