use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use contrail_gremlin::client::GremlinPool;
use contrail_gremlin::config::{self, BridgeConfig};
use contrail_gremlin::import::{GraphStore, GremlinGraphStore, Importer, MemoryGraphStore};
use contrail_gremlin::query::{AuditService, ListingRequest, ListingService};
use contrail_gremlin::record::{DecodePolicy, JsonDumpSource};
use contrail_gremlin::schema::labels;
use contrail_gremlin::sync::Synchronizer;
use dotenvy::dotenv;

#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// contrail-gremlin - Contrail inventory to Gremlin graph bridge
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file (environment variables are used otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gremlin server URL, repeat for several servers
    #[arg(long = "gremlin-url", global = true)]
    gremlin_urls: Vec<String>,

    /// Decode policy for object store columns (strict or lenient)
    #[arg(long, global = true)]
    decode_policy: Option<DecodePolicy>,

    /// Resources imported concurrently by `sync`
    #[arg(long, global = true)]
    sync_concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List ports matching a JSON listing request
    List {
        /// Request file, `-` for stdin
        #[arg(long, default_value = "-")]
        request: String,
    },
    /// Import resources from an object store JSON dump
    Sync {
        /// Dump of the form {"<uuid>": {"<column>": "<raw json>"}}
        #[arg(long)]
        dump: PathBuf,

        /// Resources to import (all of the dump when omitted)
        ids: Vec<String>,

        /// Import into an in-memory graph and only report
        #[arg(long)]
        dry_run: bool,
    },
    /// Report vertices not re-imported recently
    Stale {
        /// Only this resource type (`virtual-machine-interface` or its label)
        #[arg(long)]
        label: Option<String>,

        /// Override the configured threshold, in seconds
        #[arg(long)]
        older_than: Option<u64>,
    },
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            gremlin_urls: cli.gremlin_urls.clone(),
            decode_policy: cli.decode_policy,
            sync_concurrency: cli.sync_concurrency,
            stale_after_secs: match &cli.command {
                Command::Stale { older_than, .. } => *older_than,
                _ => None,
            },
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    let base = match &cli.config {
        Some(path) => BridgeConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BridgeConfig::from_env()?,
    };
    Ok(base.merge(cli.into())?)
}

fn read_request(source: &str) -> anyhow::Result<ListingRequest> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading {}", source))?
    };
    Ok(serde_json::from_str(&content)?)
}

async fn run_sync<G: GraphStore>(
    config: &BridgeConfig,
    source: JsonDumpSource,
    store: G,
    ids: Vec<String>,
) -> anyhow::Result<()> {
    let ids = if ids.is_empty() { source.ids() } else { ids };
    let synchronizer = Synchronizer::new(source, Importer::new(store))
        .with_policy(config.decode_policy)
        .with_concurrency(config.sync_concurrency);

    let report = synchronizer.sync_many(ids).await;
    println!(
        "{} created, {} updated, {} failed",
        report.created.len(),
        report.updated.len(),
        report.failed.len()
    );
    for error in &report.failed {
        eprintln!("  - {}", error);
    }
    if !report.is_success() {
        bail!("{} resource(s) failed to sync", report.failed.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli).context("Configuration error")?;
    log::debug!("Configuration: {:?}", config);

    match cli.command {
        Command::List { request } => {
            let request = read_request(&request)?;
            let pool = GremlinPool::new(config.gremlin_urls.clone())?;
            let rows = ListingService::ports(pool).list_raw(&request).await?;
            println!("{}", String::from_utf8_lossy(&rows));
        }
        Command::Sync { dump, ids, dry_run } => {
            let source = JsonDumpSource::from_file(&dump)
                .with_context(|| format!("reading {}", dump.display()))?;
            if dry_run {
                run_sync(&config, source, MemoryGraphStore::new(), ids).await?;
            } else {
                let pool = GremlinPool::new(config.gremlin_urls.clone())?;
                run_sync(&config, source, GremlinGraphStore::new(pool), ids).await?;
            }
        }
        Command::Stale { label, .. } => {
            let label = label.map(|l| labels::resource_type_to_label(&l));
            let pool = GremlinPool::new(config.gremlin_urls.clone())?;
            let stale = AuditService::new(pool)
                .stale_resources(label.as_deref(), config.stale_after_secs)
                .await?;
            for resource in &stale {
                println!(
                    "{}/{} - {}",
                    resource.resource_type,
                    resource.uuid,
                    resource.fq_name.join(":")
                );
            }
            println!("Found {} stale resource(s)", stale.len());
        }
    }
    Ok(())
}
