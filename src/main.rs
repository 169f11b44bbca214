use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teerank::commands;
use teerank::config::Config;
use teerank::models::ClientRecord;

#[derive(Parser)]
#[command(
    name = "teerank",
    version,
    about = "Track liveness and poll schedule of Teeworlds servers",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the servers directory
    Init,

    /// Start tracking a server
    Create {
        /// Server identifier
        id: String,

        /// Reset the record if it already exists
        #[arg(long, default_value = "false")]
        force: bool,
    },

    /// Show a server record
    Show {
        /// Server identifier
        id: String,

        /// Print the record as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Check whether a server is tracked
    Exists {
        /// Server identifier
        id: String,
    },

    /// Stop tracking a server
    Remove {
        /// Server identifier
        id: String,
    },

    /// List tracked servers
    List,

    /// List servers due for a poll
    Due,

    /// Record a successful poll
    Online {
        /// Server identifier
        id: String,

        /// Keep the server due so the next pass polls it again
        #[arg(long, default_value = "false")]
        expire_now: bool,

        /// Connected client, as NAME,CLAN,SCORE (repeatable)
        #[arg(long = "client", value_parser = commands::parse_client)]
        clients: Vec<ClientRecord>,
    },

    /// Record a failed poll
    Offline {
        /// Server identifier
        id: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        let err = teerank::Error::from(err);
        let category = err.category();
        tracing::error!(category = category.as_str(), error = %err, "Command failed");

        let mut last = err.to_string();
        eprintln!("Error: {last}");
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            let message = cause.to_string();
            if message != last {
                eprintln!("  caused by: {message}");
            }
            last = message;
            source = std::error::Error::source(cause);
        }
        std::process::exit(category.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::debug!(root = %config.storage.root.display(), "Configuration loaded");

    match cli.command {
        Commands::Init => commands::init(&config)?,

        Commands::Create { id, force } => {
            tracing::info!(server = %id, force = %force, "Starting create command");
            commands::create(&config, &id, force)?;
        }

        Commands::Show { id, json } => commands::show(&config, &id, json)?,

        Commands::Exists { id } => {
            if !commands::exists(&config, &id)? {
                std::process::exit(1);
            }
        }

        Commands::Remove { id } => {
            tracing::info!(server = %id, "Starting remove command");
            commands::remove(&config, &id)?;
        }

        Commands::List => commands::list(&config)?,

        Commands::Due => {
            commands::due(&config)?;
        }

        Commands::Online {
            id,
            expire_now,
            clients,
        } => {
            tracing::info!(
                server = %id,
                clients = clients.len(),
                expire_now = %expire_now,
                "Recording successful poll"
            );
            commands::online(&config, &id, clients, expire_now)?;
        }

        Commands::Offline { id } => {
            tracing::info!(server = %id, "Recording failed poll");
            commands::offline(&config, &id)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("teerank=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("teerank={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
