use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::info;

use ip_db::config::Config;
use ip_db::init::setup_logging;
use ip_db::IpDb;

fn main() -> Result<()> {
    // 1. Load Config
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or("config.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting ip-db...");
    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    // 3. Start refresh loops and wait for the first load of every dataset
    let db = IpDb::launch(&config)?;

    // 4. Answer lookups: IP arguments, or one IP per stdin line
    let ips: Vec<String> = args.collect();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if ips.is_empty() {
        for line in std::io::stdin().lock().lines() {
            let line = line.context("Failed to read stdin")?;
            let ip = line.trim();
            if ip.is_empty() {
                continue;
            }
            print_result(&mut out, &db, ip)?;
        }
    } else {
        for ip in &ips {
            print_result(&mut out, &db, ip)?;
        }
    }

    Ok(())
}

fn print_result(out: &mut impl Write, db: &IpDb, ip: &str) -> Result<()> {
    let result = serde_json::json!({ "ip": ip, "result": db.lookup_all(ip) });
    writeln!(out, "{}", result)?;
    Ok(())
}
