//! martsync - BioMart annotation sync tool

use anyhow::{Context, Result};
use clap::Parser;
use martsync_common::logging::{init_logging, LogConfig, LogLevel};
use martsync_ingest::catalog::{AnnotationPlan, DomainKind, Genome};
use martsync_ingest::config::SyncConfig;
use martsync_ingest::identifiers::read_identifiers;
use martsync_ingest::mart::BiomartClient;
use martsync_ingest::storage::AnnotationStore;
use martsync_ingest::sync::{AnnotationSync, SyncOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "martsync")]
#[command(author, version, about = "Sync BioMart transcript annotations into SQLite")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Genome build (GRCh38, GRCh37, GRCm38)
    #[arg(short, long, global = true, env = "MARTSYNC_GENOME")]
    genome: Option<Genome>,

    /// SQLite database URL
    #[arg(long, global = true, env = "MARTSYNC_DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Create every annotation table for the genome
    Init,

    /// Fetch annotations for a list of transcript identifiers
    Fetch {
        /// Domain kind to fetch (e.g. pfam), or "all"
        #[arg(short, long, default_value = "all")]
        kind: String,

        /// File with one transcript identifier per line, or "-" for stdin
        #[arg(short, long, default_value = "-")]
        ids: PathBuf,

        /// Identifiers per request
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Concurrent requests per wave
        #[arg(short, long)]
        parallelism: Option<usize>,

        /// Maximum number of times a rejected chunk is halved
        #[arg(long)]
        max_split_depth: Option<u32>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },
}

fn parse_kinds(kind: &str) -> Result<Vec<DomainKind>> {
    if kind.eq_ignore_ascii_case("all") {
        return Ok(DomainKind::ALL.to_vec());
    }
    Ok(vec![kind.parse()?])
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("martsync")
        .filter_directives("sqlx=warn,hyper=warn,reqwest=warn")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = SyncConfig::load()?;
    if let Some(genome) = cli.genome {
        config = config.with_genome(genome);
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    match cli.command {
        Command::Init => {
            let store = AnnotationStore::connect(&config.database_url).await?;
            let plans = AnnotationPlan::all_domains(config.genome)?;
            for plan in &plans {
                store.ensure_table(&plan.table).await?;
            }
            info!(
                "Created {} annotation tables for {}",
                plans.len(),
                config.genome
            );
        },
        Command::Fetch {
            kind,
            ids,
            batch_size,
            parallelism,
            max_split_depth,
            no_progress,
        } => {
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(parallelism) = parallelism {
                config.parallelism = parallelism;
            }
            if let Some(depth) = max_split_depth {
                config.max_split_depth = depth;
            }
            if no_progress {
                config.show_progress = false;
            }
            config.validate()?;

            let kinds = parse_kinds(&kind)?;
            let identifiers = read_identifiers(&ids)
                .with_context(|| format!("Failed to read identifiers from {}", ids.display()))?;
            info!(
                "Fetching {} kind(s) for {} identifiers from {}",
                kinds.len(),
                identifiers.len(),
                config.mart.server_url
            );

            let client = Arc::new(BiomartClient::new(&config.mart)?);
            let store = AnnotationStore::connect(&config.database_url)
                .await?
                .with_insert_batch_rows(config.insert_batch_rows);
            let options = SyncOptions::from(&config);

            for kind in kinds {
                let plan = AnnotationPlan::domain(config.genome, kind)?;
                let report = AnnotationSync::new(Arc::clone(&client), store.clone(), plan)
                    .with_options(options)
                    .fetch_and_store(&identifiers, config.parallelism)
                    .await?;
                println!("{}", serde_json::to_string(&report)?);
            }
        },
    }

    info!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(parse_kinds("all").unwrap().len(), DomainKind::ALL.len());
        assert_eq!(parse_kinds("pfam").unwrap(), vec![DomainKind::Pfam]);
        assert!(parse_kinds("nope").is_err());
    }

    #[test]
    fn test_fetch_args() {
        let cli = Cli::try_parse_from([
            "martsync",
            "fetch",
            "--kind",
            "pfam",
            "--ids",
            "ids.txt",
            "--parallelism",
            "2",
        ])
        .unwrap();
        match cli.command {
            Command::Fetch {
                kind,
                ids,
                parallelism,
                ..
            } => {
                assert_eq!(kind, "pfam");
                assert_eq!(ids, PathBuf::from("ids.txt"));
                assert_eq!(parallelism, Some(2));
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
