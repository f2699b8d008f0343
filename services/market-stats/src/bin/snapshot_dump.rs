//! Snapshot Dump - Inspect auction snapshot files before ingestion

use clap::{Parser, Subcommand};
use market_stats::{
    AggregatedItem, HourlyStatAccumulator, ListingAggregator, MemoryBonusCatalog,
    MemoryItemCatalog, MemoryPetCatalog, Snapshot,
};
use rustc_hash::FxHashSet;
use services_common::Px;

#[derive(Parser)]
#[command(name = "snapshot-dump")]
#[command(about = "Inspect auction snapshot files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of one snapshot file
    Summary {
        /// Snapshot file path
        file: String,
    },

    /// Show the live-view buckets the snapshot would produce
    Buckets {
        /// Snapshot file path
        file: String,

        /// Rows to print
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Show the hourly statistics batch the snapshot would upsert
    Hourly {
        /// Snapshot file path
        file: String,

        /// Rows to print
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary { file } => show_summary(&file)?,
        Commands::Buckets { file, top } => show_buckets(&file, top)?,
        Commands::Hourly { file, top } => show_hourly(&file, top)?,
    }

    Ok(())
}

fn read_snapshot(path: &str) -> Result<Snapshot, Box<dyn std::error::Error>> {
    if !std::path::Path::new(path).exists() {
        return Err(format!("snapshot file not found: {path}").into());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn show_summary(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("📊 Snapshot Summary");
    println!("===================\n");

    let snapshot = read_snapshot(path)?;
    let datetime = snapshot.last_modified.to_datetime();

    let mut items = FxHashSet::default();
    let mut pets = 0usize;
    let mut with_bonuses = 0usize;
    let mut no_signal = 0usize;
    let mut cheapest: Option<Px> = None;
    let mut steepest: Option<Px> = None;

    for listing in &snapshot.listings {
        items.insert(listing.item);
        if listing.pet.is_some() {
            pets += 1;
        }
        if listing
            .bonus_ids
            .as_deref()
            .is_some_and(|ids| !ids.is_empty())
        {
            with_bonuses += 1;
        }
        match listing.unit_buyout().filter(|unit| unit.is_positive()) {
            Some(unit) => {
                cheapest = Some(cheapest.map_or(unit, |px| px.min(unit)));
                steepest = Some(steepest.map_or(unit, |px| px.max(unit)));
            }
            None => no_signal += 1,
        }
    }

    println!("  File:          {path}");
    println!("  House:         {}", snapshot.ah);
    println!("  Captured:      {}", datetime.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
    println!("  Listings:      {}", snapshot.listings.len());
    println!("  Unique items:  {}", items.len());
    println!("  Caged pets:    {pets}");
    println!("  With bonuses:  {with_bonuses}");
    println!("  No signal:     {no_signal}");
    if let (Some(cheapest), Some(steepest)) = (cheapest, steepest) {
        println!();
        println!("  Cheapest unit buyout: {cheapest}");
        println!("  Steepest unit buyout: {steepest}");
    }

    Ok(())
}

fn show_buckets(path: &str, top: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("📈 Live-View Buckets");
    println!("====================\n");

    let snapshot = read_snapshot(path)?;
    let aggregator = ListingAggregator::new();
    let items = MemoryItemCatalog::new();
    let bonuses = MemoryBonusCatalog::new();
    let mut pets = MemoryPetCatalog::new();

    let organized = aggregator.organize(
        snapshot.listings,
        None,
        None,
        &items,
        &bonuses,
        &mut pets,
    )?;

    let mut buckets: Vec<&AggregatedItem> = organized.iter_ordered().collect();
    buckets.sort_by(|a, b| b.quantity_total.as_i64().cmp(&a.quantity_total.as_i64()));

    println!("Total buckets: {}\n", buckets.len());
    println!("Key                      | Unit buyout  | Quantity   | Listings");
    println!("-------------------------|--------------|------------|---------");
    for bucket in buckets.iter().take(top) {
        println!(
            "{:24} | {:>12} | {:>10} | {:>8}",
            bucket.key.to_string(),
            bucket.buyout.to_string(),
            bucket.quantity_total.to_string(),
            bucket.listings.len()
        );
    }

    Ok(())
}

fn show_hourly(path: &str, top: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("🕐 Hourly Upsert Batch");
    println!("======================\n");

    let snapshot = read_snapshot(path)?;
    let accumulator = HourlyStatAccumulator::new();
    let batch = accumulator.accumulate(&snapshot.listings, snapshot.last_modified, snapshot.ah);

    println!("  Day:   {}", batch.day);
    println!("  Hour:  {:02}", batch.hour);
    println!("  Rows:  {}\n", batch.len());

    let mut rows: Vec<_> = batch.rows.iter().collect();
    rows.sort_by(|a, b| b.quantity.as_i64().cmp(&a.quantity.as_i64()));

    println!("Item     | Species | Bonus ids        | Min price    | Quantity");
    println!("---------|---------|------------------|--------------|---------");
    for row in rows.iter().take(top) {
        println!(
            "{:8} | {:>7} | {:16} | {:>12} | {:>8}",
            row.identity.item.to_string(),
            row.identity.species_column_value(),
            row.identity.bonus.as_column_value(),
            row.price.to_string(),
            row.quantity.to_string()
        );
    }

    Ok(())
}
