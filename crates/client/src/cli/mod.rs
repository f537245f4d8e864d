//! CLI command definitions.

pub mod blob;
pub mod entities;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{parse_parent, DEFAULT_BASE_URL};

/// CLI client for repokit APIs.
#[derive(Debug, Parser)]
#[command(name = "repokit")]
#[command(about = "Read and write entities of a repokit API", long_about = None)]
pub struct Cli {
    /// Server base URL.
    #[arg(long, env = "REPOKIT_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(long)]
    pub quiet: bool,

    /// Send every read to the server instead of memoizing it.
    #[arg(long)]
    pub no_cache: bool,

    /// Parent of an entity, as `entity=parent`. Repeatable.
    #[arg(long = "parent", value_parser = parse_parent_arg)]
    pub parents: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find one object by id.
    Find(entities::FindArgs),
    /// List objects, optionally under a parent and filtered.
    Get(entities::GetArgs),
    /// Insert or update objects.
    Save(entities::SaveArgs),
    /// Delete one object by id.
    Delete(entities::DeleteArgs),
    /// Raw data storage.
    Blob(blob::BlobCommand),
}

impl Commands {
    /// Entity the command operates on, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::Find(args) => Some(&args.entity),
            Self::Get(args) => Some(&args.entity),
            Self::Save(args) => Some(&args.entity),
            Self::Delete(args) => Some(&args.entity),
            Self::Blob(_) => None,
        }
    }
}

fn parse_parent_arg(pair: &str) -> Result<(String, String), String> {
    parse_parent(pair).map_err(|err| err.to_string())
}
