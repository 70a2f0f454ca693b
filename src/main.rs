mod config;
mod error;
mod inference;
mod join;
mod logging;
mod models;
mod normalize;
mod pipeline;
mod ports;
mod schema;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    logging::init_tracing,
    pipeline::{SnapshotPipeline, archive_snapshot, join_snapshot},
    ports::archive::PersistenceSink,
    schema::fields,
    services::{
        archive::SqliteArchive,
        spotify::client::SpotifyMetadataSource,
        store::{CsvTableStore, SnapshotKeys},
    },
    spotify_rs::client::SpotifyClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "SOUNDPRINT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `soundprint=debug`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Snapshot the latest listening history and enrich it with metadata
    Run {
        /// Store the snapshot tables without archiving the joined table
        #[arg(long)]
        no_archive: bool,
    },
    /// Re-join the stored tables of an existing snapshot
    Join {
        /// Key of the snapshot's listening table
        #[arg(short, long)]
        listening: String,
    },
    /// Upsert a stored joined table into the archive database
    Archive {
        /// Key of the joined table
        #[arg(short, long)]
        data: String,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Config commands must work before a config exists.
    if let Commands::Config(config_commands) = &args.command {
        return run_config_command(config_commands);
    }

    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load soundprint config")?;

    let tracer_provider = init_tracing("soundprint", config.otlp_endpoint(), &args.log_level)?;

    let result = execute(args.command, &config).await;

    if let Some(tracer_provider) = tracer_provider {
        tracer_provider
            .shutdown()
            .wrap_err("Failed to shut down tracer provider")?;
    }

    result
}

async fn execute(command: Commands, config: &Config) -> Result<()> {
    let store = CsvTableStore::new(config.output_directory_path());
    tracing::debug!("Table store at: {}", store.root().display());

    match command {
        Commands::Run { no_archive } => {
            let spotify = config.spotify_config();
            let client = SpotifyClient::new(
                config.spotify_access_token()?,
                &spotify.api_base_url,
                Duration::from_secs(spotify.request_timeout_secs),
            );
            let pipeline = SnapshotPipeline::new(
                SpotifyMetadataSource::new(client),
                store,
                config.lookback()?,
            );

            let outcome = pipeline.run(Utc::now()).await?;
            tracing::debug!(plays = outcome.plays, "Listening window processed");
            println!("{}", outcome.keys.joined());

            if no_archive {
                tracing::info!("Skipping archive");
            } else {
                let archive = SqliteArchive::open(&config.database_path()).await?;
                archive.archive(&outcome.joined, fields::joined()).await?;
            }
        }
        Commands::Join { listening } => {
            let keys = SnapshotKeys::from_listening_key(&listening)?;
            join_snapshot(&store, &keys).await?;
            println!("{}", keys.joined());
        }
        Commands::Archive { data } => {
            let archive = SqliteArchive::open(&config.database_path()).await?;
            let rows = archive_snapshot(&store, &archive, &data).await?;
            tracing::info!(rows, key = %data, "Archive command completed successfully");
        }
        Commands::Config(config_commands) => run_config_command(&config_commands)?,
    }

    Ok(())
}

fn run_config_command(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::CreateDefault => {
            let path = Config::create_default()?;
            println!("Default config created at: {}", path.display());
        }
        ConfigCommands::Path => match Config::config_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("No default config path found"),
        },
    }
    Ok(())
}
