//! Blob CLI commands.

use std::fs::File;
use std::io::Read;

use clap::{Parser, Subcommand};
use repokit_core::blob::RawData;

use crate::error::Result;

/// Raw data storage commands.
#[derive(Debug, Parser)]
pub struct BlobCommand {
    #[command(subcommand)]
    pub action: BlobAction,
}

/// Available blob actions.
#[derive(Debug, Subcommand)]
pub enum BlobAction {
    /// Upload a file (or stdin with `-`) and print its address.
    Put {
        /// Path to the data.
        path: String,
        /// Storage key (default: a random one).
        #[arg(long)]
        key: Option<String>,
        /// Prefix the data is served from.
        #[arg(long)]
        prefix: String,
        /// Upload the bytes as base64 instead of parsing them as JSON.
        #[arg(long)]
        binary: bool,
    },
    /// Download and print JSON data from its address.
    Get {
        /// Address returned by `put`.
        url: String,
    },
}

/// Loads the data to upload from a file, or stdin for `-`.
pub fn load_data(path: &str, binary: bool) -> Result<RawData> {
    if path == "-" {
        return read_data(std::io::stdin().lock(), binary);
    }
    read_data(File::open(path)?, binary)
}

/// Reads everything from `reader`: raw bytes when `binary`, JSON otherwise.
pub fn read_data(mut reader: impl Read, binary: bool) -> Result<RawData> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if binary {
        return Ok(RawData::Binary(bytes));
    }
    Ok(RawData::Json(serde_json::from_slice(&bytes)?))
}
