use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

use commands::decode::{handle_decode, DecodeArgs};
use commands::routes::{handle_routes, RoutesArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Map sector and prefab template utilities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode consecutive prefab records from a raw sector buffer.
    Decode {
        /// Sector file to read.
        #[arg(long)]
        sector: PathBuf,
        /// Byte offset of the first prefab record.
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Sector format version.
        #[arg(long = "format-version")]
        format_version: u32,
        /// Number of consecutive records to decode.
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// JSON array of prefab templates used to resolve tokens.
        #[arg(long)]
        templates: Option<PathBuf>,
        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },
    /// Print the precomputed routing tables of prefab templates.
    Routes {
        /// JSON array of prefab templates.
        #[arg(long)]
        templates: PathBuf,
        /// Only print the template with this token name or hex value.
        #[arg(long)]
        token: Option<String>,
        /// Output in JSON format.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Decode {
            sector,
            offset,
            format_version,
            count,
            templates,
            json,
        } => handle_decode(&DecodeArgs {
            sector,
            offset,
            format_version,
            count,
            templates,
            json,
        }),
        Command::Routes {
            templates,
            token,
            json,
        } => handle_routes(&RoutesArgs {
            templates,
            token,
            json,
        }),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
