//! image-repo - command-line front end for the image repository.
//!
//! This binary wires the configured store tiers and codec into a
//! `Repository` and runs one operation against it.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_repo::{
    config::{Cli, Command, GetArgs, OutputFormat, RepoConfig, StoreLocation},
    create_s3_client, BlobStore, ImageKey, LocalStore, LruStore, RasterCodec, Repository,
    RepositoryError, S3Store, StoreError, Variant,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.repo.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let repo = match build_repository(&cli.repo).await {
        Ok(repo) => repo,
        Err(e) => {
            error!("Failed to set up repository: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let format = cli.repo.format;
    let result = match cli.command {
        Command::Put(args) => run_put(&repo, &args.file, format).await,
        Command::Get(args) => run_get(&repo, &args, format).await,
        Command::Remove(args) => run_remove(&repo, &args.key, format).await,
        Command::Flush => run_flush(&repo, format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "image_repo=debug"
    } else {
        "image_repo=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Wiring
// =============================================================================

async fn build_repository(config: &RepoConfig) -> Result<Repository, RepositoryError> {
    let (Some(storage), Some(cache)) = (&config.storage, &config.cache) else {
        return Err(RepositoryError::Configuration(
            "storage and cache locations are required".to_string(),
        ));
    };

    let storage = open_store(storage, config).await;
    let cache = open_store(cache, config).await;
    debug!(
        storage = storage.identifier(),
        cache = cache.identifier(),
        "opened stores"
    );

    Repository::builder(config.prefix.clone())
        .storage(storage)
        .cache(cache)
        .codec(Arc::new(RasterCodec::with_quality(config.jpeg_quality)))
        .build()
}

async fn open_store(location: &StoreLocation, config: &RepoConfig) -> Arc<dyn BlobStore> {
    match location {
        StoreLocation::Memory => Arc::new(LruStore::with_capacity(config.cache_capacity)),
        StoreLocation::Local(path) => Arc::new(LocalStore::new(path.clone())),
        StoreLocation::S3 { bucket, prefix } => {
            let client = create_s3_client(config.s3_endpoint.as_deref(), &config.s3_region).await;
            Arc::new(S3Store::new(client, bucket.clone(), prefix.clone()))
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Serialize)]
struct PutOutput<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct GetOutput<'a> {
    key: String,
    cache_key: &'a str,
    cache_hit: bool,
    bytes: usize,
    output: Option<String>,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    status: &'a str,
    key: Option<&'a str>,
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: String) {
    match format {
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize output: {}", e),
        },
    }
}

async fn run_put(
    repo: &Repository,
    file: &std::path::Path,
    format: OutputFormat,
) -> Result<(), RepositoryError> {
    let key = repo.put(file).await?;
    emit(format, &PutOutput { key: &key }, key.clone());
    Ok(())
}

async fn run_get(
    repo: &Repository,
    args: &GetArgs,
    format: OutputFormat,
) -> Result<(), RepositoryError> {
    let key = if args.local {
        ImageKey::local(&args.key)
    } else {
        ImageKey::store(args.key.clone())
    };

    let variant = match args.bounds() {
        Some((width, height)) => Variant::resize(width, height, args.mode),
        None => Variant::original(),
    };

    let rendition = repo.get(key.clone(), &variant).await?;

    if let Some(ref path) = args.output {
        write_output(path, &rendition.data).await?;
    }

    let output = GetOutput {
        key: key.to_string(),
        cache_key: rendition.cache_key.as_str(),
        cache_hit: rendition.cache_hit,
        bytes: rendition.data.len(),
        output: args.output.as_ref().map(|p| p.display().to_string()),
    };
    let text = format!(
        "{} -> {} ({} bytes, cache {})",
        output.key,
        output.cache_key,
        output.bytes,
        if output.cache_hit { "hit" } else { "miss" }
    );
    emit(format, &output, text);
    Ok(())
}

/// Write a rendition to a local file.
async fn write_output(path: &std::path::Path, data: &[u8]) -> Result<(), RepositoryError> {
    tokio::fs::write(path, data).await.map_err(|e| {
        StoreError::Io(format!("cannot write {}: {}", path.display(), e)).into()
    })
}

async fn run_remove(
    repo: &Repository,
    key: &str,
    format: OutputFormat,
) -> Result<(), RepositoryError> {
    repo.remove(key).await?;
    emit(
        format,
        &StatusOutput {
            status: "removed",
            key: Some(key),
        },
        format!("removed {}", key),
    );
    Ok(())
}

async fn run_flush(repo: &Repository, format: OutputFormat) -> Result<(), RepositoryError> {
    repo.flush().await?;
    emit(
        format,
        &StatusOutput {
            status: "flushed",
            key: None,
        },
        format!("flushed {}", repo.cache().identifier()),
    );
    Ok(())
}
