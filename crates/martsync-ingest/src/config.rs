//! Sync configuration
//!
//! Loaded from environment variables (and a `.env` file when present), then
//! optionally overridden by command-line flags.

use crate::catalog::Genome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Default SQLite database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite://martsync.db";

/// Identifiers per request before any splitting
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Concurrent requests per wave
pub const DEFAULT_PARALLELISM: usize = 4;

/// How many times a rejected chunk may be halved
pub const DEFAULT_MAX_SPLIT_DEPTH: u32 = 3;

/// Per-request timeout; large mart responses stream slowly
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Rows per multi-row INSERT statement
pub const DEFAULT_INSERT_BATCH_ROWS: usize = 200;

/// Connection settings for a BioMart server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MartConfig {
    /// Base URL of the mart, with or without the trailing `/martservice`
    pub server_url: String,
    /// Dataset queried, e.g. `hsapiens_gene_ensembl`
    pub dataset: String,
    pub timeout_secs: u64,
}

impl MartConfig {
    /// Defaults for a genome's dataset on its usual server
    pub fn for_genome(genome: Genome) -> Self {
        Self {
            server_url: genome.default_mart_url().to_string(),
            dataset: genome.dataset().to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server_url.is_empty() {
            anyhow::bail!("MARTSYNC_MART_URL cannot be empty");
        }
        if self.dataset.is_empty() {
            anyhow::bail!("Mart dataset cannot be empty");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("MARTSYNC_REQUEST_TIMEOUT_SECS must be greater than 0");
        }
        Ok(())
    }
}

/// Everything a fetch cycle needs besides the identifiers themselves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub database_url: String,
    pub genome: Genome,
    pub mart: MartConfig,
    pub batch_size: usize,
    pub parallelism: usize,
    pub max_split_depth: u32,
    pub insert_batch_rows: usize,
    pub show_progress: bool,
}

impl SyncConfig {
    /// Read `.env` if present, then the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables
    ///
    /// - `MARTSYNC_DATABASE_URL`
    /// - `MARTSYNC_GENOME` (GRCh38, GRCh37, GRCm38)
    /// - `MARTSYNC_MART_URL` (defaults to the genome's mart)
    /// - `MARTSYNC_BATCH_SIZE`
    /// - `MARTSYNC_PARALLELISM`
    /// - `MARTSYNC_MAX_SPLIT_DEPTH`
    /// - `MARTSYNC_REQUEST_TIMEOUT_SECS`
    /// - `MARTSYNC_INSERT_BATCH_ROWS`
    /// - `MARTSYNC_SHOW_PROGRESS`
    pub fn from_env() -> anyhow::Result<Self> {
        let genome: Genome = match std::env::var("MARTSYNC_GENOME") {
            Ok(value) => value.parse()?,
            Err(_) => Genome::default(),
        };

        let mut mart = MartConfig::for_genome(genome);
        if let Ok(url) = std::env::var("MARTSYNC_MART_URL") {
            mart.server_url = url;
        }
        mart.timeout_secs = env_or("MARTSYNC_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let config = Self {
            database_url: std::env::var("MARTSYNC_DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            genome,
            mart,
            batch_size: env_or("MARTSYNC_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            parallelism: env_or("MARTSYNC_PARALLELISM", DEFAULT_PARALLELISM)?,
            max_split_depth: env_or("MARTSYNC_MAX_SPLIT_DEPTH", DEFAULT_MAX_SPLIT_DEPTH)?,
            insert_batch_rows: env_or("MARTSYNC_INSERT_BATCH_ROWS", DEFAULT_INSERT_BATCH_ROWS)?,
            show_progress: env_or("MARTSYNC_SHOW_PROGRESS", true)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Switch genome, resetting the mart to that genome's defaults
    /// unless the server was overridden.
    pub fn with_genome(mut self, genome: Genome) -> Self {
        let default_url = self.genome.default_mart_url();
        let timeout_secs = self.mart.timeout_secs;
        let server_url = if self.mart.server_url == default_url {
            genome.default_mart_url().to_string()
        } else {
            self.mart.server_url.clone()
        };

        self.genome = genome;
        self.mart = MartConfig {
            server_url,
            dataset: genome.dataset().to_string(),
            timeout_secs,
        };
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.is_empty() {
            anyhow::bail!("MARTSYNC_DATABASE_URL cannot be empty");
        }
        if self.batch_size == 0 {
            anyhow::bail!("MARTSYNC_BATCH_SIZE must be greater than 0");
        }
        if self.parallelism == 0 {
            anyhow::bail!("MARTSYNC_PARALLELISM must be greater than 0");
        }
        if self.insert_batch_rows == 0 {
            anyhow::bail!("MARTSYNC_INSERT_BATCH_ROWS must be greater than 0");
        }
        self.mart.validate()?;
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        let genome = Genome::default();
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            genome,
            mart: MartConfig::for_genome(genome),
            batch_size: DEFAULT_BATCH_SIZE,
            parallelism: DEFAULT_PARALLELISM,
            max_split_depth: DEFAULT_MAX_SPLIT_DEPTH,
            insert_batch_rows: DEFAULT_INSERT_BATCH_ROWS,
            show_progress: true,
        }
    }
}

/// `default` when `key` is unset; an error when it is set but unparsable.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, value, e)),
        Err(_) => Ok(default),
    }
}
