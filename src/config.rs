//! Configuration management for the `image-repo` binary.
//!
//! This module provides:
//! - Command-line arguments via clap
//! - Environment variables with `IMGREPO_` prefix
//! - Store location parsing (`memory://`, `file:///path`, `s3://bucket/prefix`)
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use image_repo::config::Cli;
//!
//! let cli = Cli::parse();
//! cli.validate()?;
//! println!("prefix: {}", cli.repo.prefix);
//! ```
//!
//! # Environment Variables
//!
//! - `IMGREPO_PREFIX` - Key namespace (default: empty)
//! - `IMGREPO_STORAGE` - Storage tier location (required)
//! - `IMGREPO_CACHE` - Cache tier location (required)
//! - `IMGREPO_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `IMGREPO_S3_REGION` - AWS region (default: us-east-1)
//! - `IMGREPO_JPEG_QUALITY` - JPEG quality for renditions (default: 80)
//! - `IMGREPO_CACHE_CAPACITY` - Byte budget of a `memory://` cache (default: 100MB)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::codec::{is_valid_quality, ResizeMode, DEFAULT_JPEG_QUALITY};
use crate::store::DEFAULT_LRU_CAPACITY;

// =============================================================================
// Default Values
// =============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// Store Locations
// =============================================================================

/// Where a store tier lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// In-process memory (`memory://`)
    Memory,
    /// A local directory (`file:///path` or a bare path)
    Local(PathBuf),
    /// An S3 bucket with an optional key prefix (`s3://bucket/prefix`)
    S3 {
        bucket: String,
        prefix: Option<String>,
    },
}

impl StoreLocation {
    pub fn is_durable(&self) -> bool {
        !matches!(self, StoreLocation::Memory)
    }

    /// Whether clearing one location could delete objects of the other.
    ///
    /// Separate `memory://` tiers are separate stores and never overlap.
    pub fn overlaps(&self, other: &StoreLocation) -> bool {
        match (self, other) {
            (StoreLocation::Local(a), StoreLocation::Local(b)) => {
                a.starts_with(b) || b.starts_with(a)
            }
            (
                StoreLocation::S3 {
                    bucket: a,
                    prefix: pa,
                },
                StoreLocation::S3 {
                    bucket: b,
                    prefix: pb,
                },
            ) => {
                a == b
                    && match (pa, pb) {
                        (Some(pa), Some(pb)) => nested(pa, pb) || nested(pb, pa),
                        _ => true,
                    }
            }
            _ => false,
        }
    }
}

/// Whether key prefix `inner` lies within `outer`.
fn nested(outer: &str, inner: &str) -> bool {
    inner == outer
        || inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl FromStr for StoreLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("store location must not be empty".to_string());
        }

        if s == "memory://" || s == "memory" {
            return Ok(StoreLocation::Memory);
        }

        if let Some(rest) = s.strip_prefix("s3://") {
            let (bucket, prefix) = match rest.split_once('/') {
                Some((bucket, prefix)) => (bucket, Some(prefix.trim_matches('/'))),
                None => (rest, None),
            };
            if bucket.is_empty() {
                return Err(format!("missing bucket name in '{}'", s));
            }
            return Ok(StoreLocation::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            });
        }

        if let Some(path) = s.strip_prefix("file://") {
            if path.is_empty() {
                return Err(format!("missing path in '{}'", s));
            }
            return Ok(StoreLocation::Local(PathBuf::from(path)));
        }

        if s.contains("://") {
            return Err(format!(
                "unsupported store location '{}' (expected memory://, file:// or s3://)",
                s
            ));
        }

        Ok(StoreLocation::Local(PathBuf::from(s)))
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::Memory => f.write_str("memory://"),
            StoreLocation::Local(path) => write!(f, "file://{}", path.display()),
            StoreLocation::S3 {
                bucket,
                prefix: Some(prefix),
            } => write!(f, "s3://{}/{}", bucket, prefix),
            StoreLocation::S3 {
                bucket,
                prefix: None,
            } => write!(f, "s3://{}", bucket),
        }
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON object
    Json,
}

/// image-repo - store images and serve cached renditions of them.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-repo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub repo: RepoConfig,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct RepoConfig {
    /// Key namespace owned by this repository.
    #[arg(long, default_value = "", env = "IMGREPO_PREFIX", global = true)]
    pub prefix: String,

    /// Storage tier for originals (file:///path, s3://bucket/prefix).
    #[arg(long, env = "IMGREPO_STORAGE", global = true)]
    pub storage: Option<StoreLocation>,

    /// Cache tier for renditions (memory://, file:///path, s3://bucket/prefix).
    #[arg(long, env = "IMGREPO_CACHE", global = true)]
    pub cache: Option<StoreLocation>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "IMGREPO_S3_ENDPOINT", global = true)]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "IMGREPO_S3_REGION", global = true)]
    pub s3_region: String,

    /// JPEG quality for encoded renditions (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "IMGREPO_JPEG_QUALITY", global = true)]
    pub jpeg_quality: u8,

    /// Byte budget when the cache tier is memory://.
    #[arg(long, default_value_t = DEFAULT_LRU_CAPACITY, env = "IMGREPO_CACHE_CAPACITY", global = true)]
    pub cache_capacity: usize,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store a file as a new original and print its key.
    Put(PutArgs),

    /// Fetch a rendition of an original.
    Get(GetArgs),

    /// Delete an original.
    Remove(RemoveArgs),

    /// Drop every cached rendition.
    Flush,
}

#[derive(Args, Debug, Clone)]
pub struct PutArgs {
    /// File to upload.
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Storage key (or a local file path with --local).
    pub key: String,

    /// Treat KEY as a local file path instead of a storage key.
    #[arg(long, default_value_t = false)]
    pub local: bool,

    /// Target width; requires --height.
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height; requires --width.
    #[arg(long)]
    pub height: Option<u32>,

    /// How to fit the image into width x height.
    #[arg(long, default_value_t = ResizeMode::Fit)]
    pub mode: ResizeMode,

    /// Write the rendition to this file instead of only reporting it.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl GetArgs {
    /// Requested resize bounds, if any.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    /// Storage key to delete.
    pub key: String,
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.repo.validate()?;

        if let Command::Get(ref get) = self.command {
            match (get.width, get.height) {
                (Some(_), None) | (None, Some(_)) => {
                    return Err("--width and --height must be given together".to_string());
                }
                (Some(0), _) | (_, Some(0)) => {
                    return Err("--width and --height must be greater than 0".to_string());
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl RepoConfig {
    /// Validate the shared settings.
    pub fn validate(&self) -> Result<(), String> {
        let storage = self.storage.as_ref().ok_or_else(|| {
            "Storage location is required. Set --storage or IMGREPO_STORAGE".to_string()
        })?;
        if !storage.is_durable() {
            return Err("Storage tier must be durable (file:// or s3://), not memory://".to_string());
        }

        let cache = self.cache.as_ref().ok_or_else(|| {
            "Cache location is required. Set --cache or IMGREPO_CACHE".to_string()
        })?;
        if storage.overlaps(cache) {
            return Err(format!(
                "Storage ({}) and cache ({}) must not overlap; flushing the cache would delete originals",
                storage, cache
            ));
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
