//! repokit CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use repokit_client::cli::blob::{load_data, BlobAction};
use repokit_client::cli::{Cli, Commands, OutputFormat};
use repokit_client::config::parents_from_env;
use repokit_client::output::{format_many, format_one, format_output};
use repokit_client::{ApiConfig, ApiRepositoryGroup};
use repokit_core::blob::BlobStore;
use repokit_core::{Cache, RepositoryGroup};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.quiet {
        "repokit_client=warn,repokit_core=warn"
    } else {
        "repokit_client=info,repokit_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ApiConfig::new(&cli.base_url)
        .with_parents(parents_from_env().context("Invalid REPOKIT_PARENTS")?)
        .with_parents(cli.parents.clone());

    let cache = (!cli.no_cache).then(Cache::new);
    let entities: Vec<&str> = cli.command.entity().into_iter().collect();
    let group: ApiRepositoryGroup = RepositoryGroup::new(config, entities, cache)?;

    match &cli.command {
        Commands::Find(args) => {
            let object = group.entity(&args.entity)?.find(&args.id).await?;
            println!("{}", format_one(&object, cli.format));
        }
        Commands::Get(args) => {
            let objects = group.entity(&args.entity)?.get(args.query()?).await?;
            println!("{}", format_many(&args.entity, &objects, cli.format));
        }
        Commands::Save(args) => {
            let saved = group.entity(&args.entity)?.save(args.objects()?).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", format_many(&args.entity, &saved, cli.format)),
                OutputFormat::Pretty => {
                    println!("Saved:\n{}", format_many(&args.entity, &saved, cli.format))
                }
            }
        }
        Commands::Delete(args) => {
            let deleted = group.entity(&args.entity)?.delete(&args.id).await?;
            if deleted == Value::Null {
                if !cli.quiet {
                    println!("Deleted {} {}", args.entity, args.id);
                }
            } else {
                println!("{}", format_one(&deleted, cli.format));
            }
        }
        Commands::Blob(blob_cmd) => match &blob_cmd.action {
            BlobAction::Put {
                path,
                key,
                prefix,
                binary,
            } => {
                let data = load_data(path, *binary)
                    .with_context(|| format!("Failed to load data from {}", path))?;
                let address = group
                    .extensions()
                    .store_raw(data, key.as_deref(), prefix)
                    .await?;
                println!("{}", address);
            }
            BlobAction::Get { url } => {
                let value = group.extensions().get_raw(url).await?;
                println!("{}", format_output(&value, cli.format));
            }
        },
    }

    Ok(())
}
