// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Linkmap CLI
//!
//! Inspect row-key distribution and time windows, and run an in-memory
//! application-map simulation end to end.

mod telemetry;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use linkmap_core::time::{DownSampler, FixedSampler, TimeWindowSampler};
use linkmap_core::{
    Application, LinkmapConfig, Range, ResponseTimeSlot, ServiceType, SlotCountSampler,
    TimeWindow,
};
use linkmap_query::LinkQueryService;
use linkmap_storage::registry::STATISTICS_CALLER;
use linkmap_storage::{DistributorRegistry, MemoryStore, StatisticsWriter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "linkmap")]
#[command(about = "Linkmap - row-key distribution and application-map aggregation", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, env = "LINKMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured distributor tables
    Tables,

    /// Show the bucket and distributed form of a row key
    Distribute {
        /// Table name
        table: String,

        /// Row key (UTF-8, or hex with --hex)
        key: String,

        /// Treat the key as hex
        #[arg(long)]
        hex: bool,

        /// Also print the key under every prefix
        #[arg(long)]
        all: bool,
    },

    /// Show the physical scans a logical scan turns into
    Buckets {
        /// Table name
        table: String,

        /// Inclusive start key (hex)
        #[arg(long, default_value = "")]
        start: String,

        /// Exclusive stop key (hex, empty = unbounded)
        #[arg(long, default_value = "")]
        stop: String,
    },

    /// Compute the time window of a range
    Window {
        /// Range start (ms since epoch or RFC 3339)
        from: String,

        /// Range end (ms since epoch or RFC 3339)
        to: String,

        /// Slot size rule
        #[arg(long, value_enum, default_value = "slot-count")]
        sampler: SamplerKind,

        /// Slot budget for the slot-count sampler
        #[arg(long)]
        target: Option<u32>,

        /// Slot size in ms for the fixed sampler
        #[arg(long)]
        size: Option<i64>,

        /// Print every slot
        #[arg(long)]
        slots: bool,
    },

    /// Record random calls into an in-memory store and query them back
    Simulate {
        /// Number of calling applications
        #[arg(long, default_value = "4")]
        callers: usize,

        /// Number of callee applications
        #[arg(long, default_value = "3")]
        callees: usize,

        /// Calls to record
        #[arg(long, default_value = "10000")]
        calls: usize,

        /// Length of the simulated period in minutes
        #[arg(long, default_value = "180")]
        minutes: i64,

        /// Slot budget for the query
        #[arg(long)]
        target: Option<u32>,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SamplerKind {
    SlotCount,
    Down,
    Fixed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LinkmapConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LinkmapConfig::from_env(),
    };
    config.validate().context("invalid configuration")?;
    telemetry::init(&config.logging, cli.verbose)?;

    let registry = DistributorRegistry::with_overrides(&config.distributors)
        .context("failed to build distributor registry")?;
    info!(tables = registry.len(), "distributor registry ready");

    match cli.command {
        Commands::Tables => {
            if cli.json {
                let specs: Vec<_> = registry.specs().collect();
                println!("{}", serde_json::to_string_pretty(&specs)?);
            } else {
                for spec in registry.specs() {
                    let bytes = match (spec.start, spec.end) {
                        (Some(start), Some(end)) => format!("[{start}, {end})"),
                        _ => "all".to_string(),
                    };
                    println!(
                        "{:<40} {:<10} {:<10} {:>3} buckets",
                        spec.table,
                        format!("{:?}", spec.mode),
                        bytes,
                        spec.max_buckets
                    );
                }
            }
        }

        Commands::Distribute {
            table,
            key,
            hex,
            all,
        } => {
            let distributor = registry.get(&table)?;
            let original = if hex {
                hex::decode(&key).context("key is not valid hex")?
            } else {
                key.into_bytes()
            };
            let distributed = distributor.distribute(&original)?;
            let bucket = distributed[0];

            if cli.json {
                let mut out = json!({
                    "table": table,
                    "original": hex::encode(&original),
                    "bucket": bucket,
                    "distributed": hex::encode(&distributed),
                });
                if all {
                    out["all"] = distributor
                        .all_distributed_keys(&original)
                        .iter()
                        .map(hex::encode)
                        .collect();
                }
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Table:       {table}");
                println!("Bucket:      {bucket} of {}", distributor.max_buckets());
                println!("Distributed: {}", hex::encode(&distributed));
                if all {
                    for key in distributor.all_distributed_keys(&original) {
                        println!("  {}", hex::encode(key));
                    }
                }
            }
        }

        Commands::Buckets { table, start, stop } => {
            let distributor = registry.get(&table)?;
            let start = hex::decode(&start).context("start is not valid hex")?;
            let stop = hex::decode(&stop).context("stop is not valid hex")?;
            let scans = distributor.scan_ranges(&start, &stop);

            if cli.json {
                let out: Vec<_> = scans
                    .iter()
                    .map(|scan| {
                        json!({
                            "bucket": scan.bucket,
                            "start": hex::encode(&scan.start),
                            "stop": hex::encode(&scan.stop),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                match distributor.bucket_for_scan(&start, &stop) {
                    Some(bucket) => println!("Known bucket {bucket}: single scan"),
                    None => println!("Bucket unknown: {} scans", scans.len()),
                }
                for scan in &scans {
                    println!(
                        "  {:>3}  [{}, {})",
                        scan.bucket,
                        hex::encode(&scan.start),
                        hex::encode(&scan.stop)
                    );
                }
            }
        }

        Commands::Window {
            from,
            to,
            sampler,
            target,
            size,
            slots,
        } => {
            let range = Range::between(parse_timestamp(&from)?, parse_timestamp(&to)?)?;
            let window = match sampler {
                SamplerKind::SlotCount => window_with(
                    range,
                    &SlotCountSampler::new(target.unwrap_or(config.query.target_slot_count))
                        .with_minimum_slot(config.query.minimum_slot_ms),
                ),
                SamplerKind::Down => window_with(range, &DownSampler),
                SamplerKind::Fixed => {
                    let size =
                        size.ok_or_else(|| anyhow!("--size is required for the fixed sampler"))?;
                    window_with(range, &FixedSampler::new(size)?)
                }
            };
            print_window(&window, slots, cli.json)?;
        }

        Commands::Simulate {
            callers,
            callees,
            calls,
            minutes,
            target,
            seed,
        } => {
            if callers == 0 || callees == 0 || minutes <= 0 {
                bail!("callers, callees and minutes must be positive");
            }
            let target = target.unwrap_or(config.query.target_slot_count);
            simulate(&registry, &config, callers, callees, calls, minutes, target, seed, cli.json)
                .await?;
        }
    }

    Ok(())
}

fn window_with<S: TimeWindowSampler>(range: Range, sampler: &S) -> TimeWindow {
    TimeWindow::new(range, sampler)
}

/// Milliseconds since epoch, or an RFC 3339 date-time
fn parse_timestamp(value: &str) -> Result<i64> {
    if let Ok(ms) = value.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .with_context(|| format!("invalid timestamp {value:?}"))
}

fn render_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn print_window(window: &TimeWindow, slots: bool, json_output: bool) -> Result<()> {
    let range = window.window_range();
    if json_output {
        let mut out = json!({
            "window_size_ms": window.window_size(),
            "from": range.from(),
            "to": range.to(),
            "slot_count": window.slot_count(),
        });
        if slots {
            out["slots"] = window.slots().collect();
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Window size: {} ms", window.window_size());
        println!(
            "Slots:       {} ({} .. {})",
            window.slot_count(),
            render_timestamp(range.from()),
            render_timestamp(range.to())
        );
        if slots {
            for slot in window {
                println!("  {}", render_timestamp(slot));
            }
        }
    }
    Ok(())
}

const SERVICE_TYPES: [ServiceType; 4] = [
    ServiceType::MYSQL,
    ServiceType::REDIS,
    ServiceType::HTTP_CLIENT,
    ServiceType::MEMCACHED,
];

#[allow(clippy::too_many_arguments)]
async fn simulate(
    registry: &DistributorRegistry,
    config: &LinkmapConfig,
    callers: usize,
    callees: usize,
    calls: usize,
    minutes: i64,
    target: u32,
    seed: u64,
    json_output: bool,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let store = Arc::new(MemoryStore::new());
    let writer = StatisticsWriter::new(Arc::clone(&store), registry)?;

    let caller_apps: Vec<_> = (0..callers)
        .map(|i| Application::new(format!("service-{i}"), ServiceType::SPRING_BOOT))
        .collect();
    let callee_apps: Vec<_> = (0..callees)
        .map(|i| {
            Application::new(
                format!("backend-{i}"),
                SERVICE_TYPES[i % SERVICE_TYPES.len()],
            )
        })
        .collect();

    let period = minutes * 60_000;
    let end = Utc::now().timestamp_millis();
    let start = end - period;

    for _ in 0..calls {
        let caller = &caller_apps[rng.gen_range(0..callers)];
        let callee = &callee_apps[rng.gen_range(0..callees)];
        let timestamp = start + rng.gen_range(0..period);
        let elapsed = rng.gen_range(1..6_000);
        let is_error = rng.gen_bool(0.02);
        writer
            .record_call(caller, callee, timestamp, elapsed, is_error, 1)
            .await?;
    }
    info!(
        calls,
        rows = store.row_count(STATISTICS_CALLER),
        "recorded simulated calls"
    );

    let service = LinkQueryService::new(Arc::clone(&store), registry, config.query.clone())?;
    let range = Range::between(start, end)?;
    let cancel = CancellationToken::new();

    let mut edges = Vec::new();
    for caller in &caller_apps {
        let links = service
            .compute_outbound_links(caller, range, target, &cancel)
            .await
            .with_context(|| format!("query for {caller} failed"))?;
        edges.extend(links);
    }
    let recorded: u64 = edges.iter().map(|data| data.total_count()).sum();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&edges)?);
    } else {
        let window = service.window_for(range, target);
        println!(
            "{} calls over {} minutes, {} edges, window {} ms x {} slots",
            recorded,
            minutes,
            edges.len(),
            window.window_size(),
            window.slot_count()
        );
        for data in &edges {
            let errors: u64 = data
                .time_histogram()
                .values()
                .map(|h| h.get(ResponseTimeSlot::Error))
                .sum();
            println!(
                "  {:<50} total {:>6}  errors {:>4}  slots {:>4}",
                data.link_key().to_string(),
                data.total_count(),
                errors,
                data.slot_count()
            );
        }
    }

    if recorded != calls as u64 {
        bail!("recorded {recorded} calls but simulated {calls}");
    }
    Ok(())
}
