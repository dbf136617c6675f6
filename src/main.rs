//! Teller Yields - lending and collateral positions of Teller group pools
//!
//! Run with: cargo run -- [--network ethereum] [--timestamp 1700000000] [--json]

use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod pipeline;
mod prices;
mod subgraph;
mod tokens;
mod yields;

use config::{Config, NetworkConfig};
use pipeline::Pipeline;
use prices::LlamaPriceResolver;
use subgraph::SubgraphFetcher;
use tokens::Erc20Resolver;
use yields::{app_network, PositionRecord};

#[derive(Parser, Debug)]
#[command(version, about = "Yield and TVL scanner for Teller lending pools")]
struct Args {
    /// TOML config file (environment is used when omitted)
    #[arg(long)]
    config: Option<String>,

    /// Snapshot time in unix seconds (defaults to now)
    #[arg(long)]
    timestamp: Option<i64>,

    /// Only scan this network
    #[arg(long)]
    network: Option<String>,

    /// Print records as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🏦 TELLER YIELDS - Group Pool Scanner").cyan().bold()
    );
    println!(
        "{}",
        style("    Lending APY | Borrow APY | TVL").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

/// Fetch and price every pool of one network
async fn scan_network(
    config: &Config,
    network: &NetworkConfig,
    timestamp: i64,
) -> Result<Vec<PositionRecord>> {
    let timeout = Duration::from_secs(config.http_timeout_secs);

    let fetcher = SubgraphFetcher::new(
        &network.name,
        &network.subgraph_url,
        &config.price_api_url,
        config.block_lag,
        config.page_size,
        timeout,
    )?;
    let raw_pools = fetcher.fetch_pool_metrics(timestamp).await?;

    let pipeline = Pipeline::new(
        Erc20Resolver::new(network.rpc_url.clone()),
        LlamaPriceResolver::new(&config.price_api_url, timeout)?,
    );

    pipeline.run(&network.name, &raw_pools).await
}

/// Everything a multi-network run produced
#[derive(Debug, Default)]
struct ScanReport {
    records: Vec<PositionRecord>,
    /// Labels of networks whose scan failed
    failed: Vec<String>,
}

/// Scan networks one at a time. A failing network is logged and skipped;
/// the rest still run.
async fn scan_networks<'a, F, Fut>(
    networks: &'a [NetworkConfig],
    show_tables: bool,
    mut scan: F,
) -> ScanReport
where
    F: FnMut(&'a NetworkConfig) -> Fut,
    Fut: Future<Output = Result<Vec<PositionRecord>>>,
{
    let mut report = ScanReport::default();

    for network in networks {
        let label = app_network(&network.name);

        if show_tables {
            println!();
            println!(
                "{}",
                style(format!("═══ {} ═══", label.to_uppercase())).blue().bold()
            );
            println!();
        }

        match scan(network).await {
            Ok(records) => {
                if show_tables {
                    print_records(&records);
                    println!();
                    println!(
                        "{} {} positions on {}",
                        style("✓").green(),
                        records.len(),
                        label
                    );
                }
                report.records.extend(records);
            }
            Err(e) => {
                error!("[{}] Scan failed: {:#}", label, e);
                if show_tables {
                    println!("{} {} skipped: {}", style("✗").red(), label, e);
                }
                report.failed.push(label.to_string());
            }
        }
    }

    report
}

fn print_records(records: &[PositionRecord]) {
    if records.is_empty() {
        println!("{}", style("No positions.").yellow());
        return;
    }

    println!(
        "  {:<44} {:<11} {:<10} {:>16} {:>9}",
        "POOL", "SIDE", "SYMBOL", "TVL (USD)", "APY %"
    );
    for record in records {
        println!(
            "  {:<44} {:<11} {:<10} {:>16.2} {:>9.3}",
            record.pool(),
            record.kind(),
            record.symbol(),
            record.tvl_usd(),
            record.headline_apy()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("teller_yields=info".parse()?),
        )
        .init();

    let args = Args::parse();

    if !args.json {
        print_banner();
    }

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Some(network) = &args.network {
        config.restrict_to(network)?;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    if !args.json {
        config.print_summary();
        println!();
    }

    let timestamp = args
        .timestamp
        .unwrap_or_else(|| chrono::Utc::now().timestamp());
    info!("Snapshot timestamp: {}", timestamp);

    // =============================================
    // SCAN (one network at a time)
    // =============================================
    let start = Instant::now();
    let ScanReport {
        records: all_records,
        failed,
    } = scan_networks(&config.networks, !args.json, |network| {
        scan_network(&config, network, timestamp)
    })
    .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&all_records)?);
        return Ok(());
    }

    // =============================================
    // SUMMARY
    // =============================================
    let total_tvl: f64 = all_records.iter().map(|r| r.tvl_usd()).sum();

    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!("{}", style(" ✅ SCAN COMPLETE").green().bold());
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!();
    let snapshot = chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string());

    println!("Summary:");
    println!("  • Snapshot: {}", snapshot);
    println!(
        "  • Networks scanned: {} ({} failed)",
        config.networks.len(),
        failed.len()
    );
    if !failed.is_empty() {
        println!("  • Failed: {}", failed.join(", "));
    }
    println!("  • Positions: {}", all_records.len());
    println!("  • Combined TVL: ${:.2}", total_tvl);
    println!("  • Elapsed: {:?}", start.elapsed());
    println!();

    Ok(())
}
