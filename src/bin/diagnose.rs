//! Diagnostic tool - Check scanner configuration
//!
//! Run with: cargo run --bin diagnose

use std::env;

const DEFAULT_NETWORKS: &str = "ethereum";

fn shorten(url: &str) -> String {
    if url.chars().count() > 50 {
        let head: String = url.chars().take(30).collect();
        let tail: String = url.chars().rev().take(15).collect::<Vec<_>>().into_iter().rev().collect();
        format!("{}...{}", head, tail)
    } else {
        url.to_string()
    }
}

fn main() {
    println!("🔍 TELLER YIELDS DIAGNOSTIC CHECK\n");

    // Load .env
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("NETWORKS", DEFAULT_NETWORKS, "Networks scanned, in order"),
        ("PRICE_API_URL", "https://coins.llama.fi", "Prices and block-at-timestamp"),
        ("BLOCK_LAG", "30", "Blocks behind the snapshot block"),
        ("PAGE_SIZE", "1000", "Pools requested per query"),
        ("HTTP_TIMEOUT_SECS", "15", "Timeout per HTTP request"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let marker = if env::var(key).is_err() { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    println!("═══════════════════════════════════════════════════");
    println!("                    ENDPOINTS                       ");
    println!("═══════════════════════════════════════════════════\n");

    let networks = env::var("NETWORKS").unwrap_or_else(|_| DEFAULT_NETWORKS.to_string());
    let mut missing = 0;

    for name in networks.split(',').map(|n| n.trim().to_lowercase()).filter(|n| !n.is_empty()) {
        let key = name.to_uppercase();
        println!("  {}", name);

        for var in [format!("SUBGRAPH_URL_{}", key), format!("RPC_URL_{}", key)] {
            match env::var(&var) {
                Ok(url) if url.starts_with("http") => println!("    {}: ✅ {}", var, shorten(&url)),
                Ok(url) => {
                    println!("    {}: ❌ not a URL ({})", var, url);
                    missing += 1;
                }
                Err(_) if name == "ethereum" => println!("    {}: built-in default", var),
                Err(_) => {
                    println!("    {}: ❌ Not set", var);
                    missing += 1;
                }
            }
        }
        println!();
    }

    println!("═══════════════════════════════════════════════════");
    println!("                     STATUS                         ");
    println!("═══════════════════════════════════════════════════\n");

    if missing == 0 {
        println!("  ✅ Every network has usable endpoints");
    } else {
        println!("  ⚠️  {} endpoint(s) missing or invalid", missing);
        println!("     Those networks will fail validation.");
    }

    let gateway_key_missing = env::var("SUBGRAPH_URL_ETHEREUM")
        .map(|u| u.contains("YOUR_API_KEY"))
        .unwrap_or(false);
    if gateway_key_missing {
        println!("\n  ⚠️  SUBGRAPH_URL_ETHEREUM still contains the YOUR_API_KEY placeholder");
    }

    println!("\n✅ Diagnostic complete!\n");
}
