//! Market statistics ingest daemon
//!
//! Polls a spool directory for auction-house snapshot files, feeds them
//! through the aggregation pipeline, compacts completed days into the
//! monthly rollups and runs the retention sweep.

use anyhow::{Context, Result};
use chrono::Days;
use clap::Parser;
use market_stats::{
    AggregatorConfig, BonusMeta, IngestSummary, ItemMeta, MarketStatsService, MemoryBonusCatalog,
    MemoryItemCatalog, MemoryPetCatalog, MemoryStatsStore, PetEntry, Snapshot,
};
use rustc_hash::{FxHashMap, FxHashSet};
use services_common::{AhId, ItemId, PetSpeciesId, Ts};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "market-stats";

/// Auction market statistics ingest daemon
#[derive(Parser)]
#[command(name = "market-stats")]
#[command(about = "Ingest auction snapshots into market statistics")]
struct Cli {
    /// Configuration file (JSON); built-in defaults apply without it
    #[arg(long)]
    config: Option<String>,

    /// Spool directory override
    #[arg(long)]
    spool_dir: Option<String>,

    /// Poll interval override, seconds
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Item catalog file (JSON map of item id to metadata)
    #[arg(long)]
    items_file: Option<String>,

    /// Bonus catalog file (JSON map of bonus id to metadata)
    #[arg(long)]
    bonuses_file: Option<String>,

    /// Pet species catalog file (JSON map of species id to name)
    #[arg(long)]
    pets_file: Option<String>,

    /// Process the spool once, run maintenance and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    info!(
        "Starting market statistics daemon v{}",
        env!("CARGO_PKG_VERSION")
    );

    let items = load_item_catalog(cli.items_file.as_deref())?;
    let bonuses = load_bonus_catalog(cli.bonuses_file.as_deref())?;
    let pets = load_pet_catalog(cli.pets_file.as_deref())?;

    let spool = PathBuf::from(&config.spool_dir);
    tokio::fs::create_dir_all(&spool)
        .await
        .with_context(|| format!("creating spool directory {}", spool.display()))?;
    info!(spool = %spool.display(), "watching spool directory");

    let poll_interval = Duration::from_secs(config.poll_interval_secs.max(1));
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs.max(1));

    let service = MarketStatsService::new(
        config,
        MemoryStatsStore::new(),
        Box::new(items),
        Box::new(bonuses),
        Box::new(pets),
    );

    let mut houses: FxHashSet<AhId> = FxHashSet::default();

    if cli.once {
        let summaries = process_spool(&service, &spool).await?;
        houses.extend(summaries.iter().map(|summary| summary.ah));
        run_maintenance(&service, &houses, Ts::now()).await;
        info!(snapshots = summaries.len(), "single pass complete");
        return Ok(());
    }

    let mut poll = tokio::time::interval(poll_interval);
    let mut sweep = tokio::time::interval(sweep_interval);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                match process_spool(&service, &spool).await {
                    Ok(summaries) => houses.extend(summaries.iter().map(|summary| summary.ah)),
                    Err(e) => error!("spool pass failed: {e:#}"),
                }
            }
            _ = sweep.tick() => {
                run_maintenance(&service, &houses, Ts::now()).await;
            }
            _ = signal::ctrl_c() => {
                info!("received shutdown signal");
                break;
            }
        }
    }

    info!("market statistics daemon shut down");
    Ok(())
}

/// Load configuration from `--config` or defaults, then apply CLI overrides
fn load_config(cli: &Cli) -> Result<AggregatorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str(&data).with_context(|| format!("parsing config {path}"))?
        }
        None => AggregatorConfig::default(),
    };

    if let Some(spool) = &cli.spool_dir {
        config.spool_dir.clone_from(spool);
    }
    if let Some(secs) = cli.poll_interval_secs {
        config.poll_interval_secs = secs;
    }
    Ok(config)
}

fn load_item_catalog(path: Option<&str>) -> Result<MemoryItemCatalog> {
    let mut catalog = MemoryItemCatalog::new();
    if let Some(path) = path {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading item catalog {path}"))?;
        let entries: FxHashMap<u32, ItemMeta> =
            serde_json::from_str(&data).with_context(|| format!("parsing item catalog {path}"))?;
        for (id, meta) in entries {
            catalog.insert(ItemId::new(id), meta);
        }
        info!(items = catalog.len(), "loaded item catalog");
    }
    Ok(catalog)
}

fn load_bonus_catalog(path: Option<&str>) -> Result<MemoryBonusCatalog> {
    let mut catalog = MemoryBonusCatalog::new();
    if let Some(path) = path {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading bonus catalog {path}"))?;
        let entries: FxHashMap<u32, BonusMeta> =
            serde_json::from_str(&data).with_context(|| format!("parsing bonus catalog {path}"))?;
        for (id, meta) in entries {
            catalog.insert(id, meta);
        }
        info!(bonuses = catalog.len(), "loaded bonus catalog");
    }
    Ok(catalog)
}

fn load_pet_catalog(path: Option<&str>) -> Result<MemoryPetCatalog> {
    let mut catalog = MemoryPetCatalog::new();
    if let Some(path) = path {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading pet catalog {path}"))?;
        let entries: FxHashMap<u32, String> =
            serde_json::from_str(&data).with_context(|| format!("parsing pet catalog {path}"))?;
        for (id, name) in entries {
            catalog.insert(PetSpeciesId::new(id), PetEntry::new(name));
        }
        info!(species = catalog.len(), "loaded pet catalog");
    }
    Ok(catalog)
}

/// Ingest every snapshot file currently in the spool, oldest name first.
/// Successfully processed files are removed; unparseable ones are renamed
/// aside so they stop blocking the spool.
async fn process_spool(
    service: &MarketStatsService<MemoryStatsStore>,
    spool: &Path,
) -> Result<Vec<IngestSummary>> {
    let mut entries = tokio::fs::read_dir(spool)
        .await
        .with_context(|| format!("reading spool directory {}", spool.display()))?;

    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut summaries = Vec::new();
    for path in files {
        match ingest_file(service, &path).await {
            Ok(summary) => {
                if let Some(summary) = summary {
                    summaries.push(summary);
                }
                tokio::fs::remove_file(&path)
                    .await
                    .with_context(|| format!("removing processed {}", path.display()))?;
            }
            Err(e) => {
                warn!(file = %path.display(), "snapshot rejected: {e:#}");
                quarantine(&path).await;
            }
        }
    }
    Ok(summaries)
}

/// Parse and ingest one snapshot file. Disabled houses return `Ok(None)`.
async fn ingest_file(
    service: &MarketStatsService<MemoryStatsStore>,
    path: &Path,
) -> Result<Option<IngestSummary>> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;

    if !service.config().is_enabled(snapshot.ah) {
        debug!(ah = %snapshot.ah, "house disabled, snapshot dropped");
        return Ok(None);
    }

    let summary = service.ingest_snapshot(snapshot).await?;
    Ok(Some(summary))
}

async fn quarantine(path: &Path) {
    let mut target = path.as_os_str().to_owned();
    target.push(".rejected");
    if let Err(e) = tokio::fs::rename(path, &target).await {
        error!(file = %path.display(), "could not quarantine snapshot: {e}");
    }
}

/// Compact yesterday for every house seen this run, then run one retention
/// sweep tick. Compaction re-runs are safe: the daily upsert replaces the
/// same seven fields.
async fn run_maintenance(
    service: &MarketStatsService<MemoryStatsStore>,
    houses: &FxHashSet<AhId>,
    now: Ts,
) {
    if let Some(day) = now.to_datetime().date_naive().checked_sub_days(Days::new(1)) {
        for ah in houses {
            match service.compact_completed_day(*ah, day).await {
                Ok(rows) if rows > 0 => debug!(ah = %ah, %day, rows, "daily compaction pass"),
                Ok(_) => {}
                Err(e) => error!(ah = %ah, "daily compaction failed: {e:#}"),
            }
        }
    }

    match service.sweep_retention(now).await {
        Ok(Some(outcome)) => {
            debug!(ah = %outcome.ah, deleted = outcome.deleted, "retention sweep pass");
        }
        Ok(None) => {}
        Err(e) => error!("retention sweep failed: {e:#}"),
    }
}

/// Initialize tracing with environment filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", SERVICE_NAME.replace('-', "_")).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();
}
