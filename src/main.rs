use anyhow::{Context, Result};
use capgains::config::{self, Config};
use capgains::gains::income_at_receipt;
use capgains::ledger::load_ledger;
use capgains::report::{build_report, write_balance, write_report};
use capgains::{Inventory, SaleProcessor, q2, q8};
use clap::Parser;
use rust_decimal::prelude::*;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "capgains", author, version, about = "Realized capital gains and taxes from a transaction ledger", long_about = None)]
struct Args {
    /// Semicolon-delimited ledger (Date;Type;Units;Unit Price;Currency)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Report destination
    #[arg(short, long, value_name = "OUTPUT", default_value = "capital_gains_report.csv")]
    output: PathBuf,

    /// Also write the lots held after each sale
    #[arg(long, value_name = "FILE")]
    balance_output: Option<PathBuf>,

    /// Cost basis method: ACB, FIFO, LIFO or HIFO [env: CAPGAINS_METHOD]
    #[arg(short, long)]
    method: Option<String>,

    /// Tax rate on positive gains, as a fraction [env: CAPGAINS_TAX_RATE]
    #[arg(short, long)]
    tax_rate: Option<String>,

    /// Currency label for the report [env: CAPGAINS_CURRENCY]
    #[arg(long)]
    currency: Option<String>,

    /// Log every lot draw and balance snapshot
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(m) = &args.method {
        config.method = config::parse_method("--method", m)?;
    }
    if let Some(t) = &args.tax_rate {
        config.tax_rate = config::parse_tax_rate("--tax-rate", t)?;
    }
    if let Some(c) = &args.currency {
        config.currency = c.trim().to_uppercase();
    }
    Ok(config)
}

/// `RUST_LOG` decides what is logged when it is set; `--verbose` only ever
/// raises the level to debug.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) if verbose => filter.add_directive(LevelFilter::DEBUG.into()),
        Some(Ok(filter)) => filter,
        _ => EnvFilter::new(fallback),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, rust_log.as_deref()))
        .init();

    let config = resolve_config(&args)?;

    let ledger = load_ledger(&args.input)
        .with_context(|| format!("loading ledger {}", args.input.display()))?;
    tracing::info!(
        purchases = ledger.purchases.len(),
        sales = ledger.sales.len(),
        method = %config.method,
        "ledger loaded"
    );

    let mut inventory = Inventory::from_purchases(&ledger.purchases);
    let outcome = SaleProcessor::new(config.method)
        .with_tax_rate(config.tax_rate)
        .process_with_snapshots(&mut inventory, &ledger.sales)
        .context("processing sales")?;
    let income =
        income_at_receipt(&ledger.purchases, config.tax_rate).context("computing mining income")?;
    let (rows, totals) =
        build_report(&outcome.results, &income, &config.currency).context("totalling report")?;

    let out_file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    write_report(&rows, out_file).context("writing report")?;

    if let Some(path) = &args.balance_output {
        let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_balance(&outcome.snapshots, f).context("writing balance evolution")?;
    }

    let cur = &config.currency;
    println!("\n=== CAPITAL GAINS SUMMARY ({}) ===", config.method);
    println!("Tax rate: {}", config.tax_rate);
    println!("Sales processed: {}", outcome.results.len());
    println!("Total sale value ({}): {}", cur, q2(totals.value));
    println!("Gross profit ({}): {}", cur, q2(totals.gross_profit));
    println!("Mining income ({}): {}", cur, q2(totals.income));
    println!("Taxes ({}): {}", cur, q2(totals.taxes));
    println!("Net profit ({}): {}", cur, q2(totals.net_profit));

    let (units, cost) = inventory
        .position()
        .context("ending inventory exceeds the decimal range")?;
    let avg = if units.is_zero() {
        Decimal::ZERO
    } else {
        cost
            .checked_div(units)
            .context("ending average cost exceeds the decimal range")?
    };
    println!("\n=== ENDING INVENTORY ===");
    println!(
        "units={}, cost({})={}, avg_cost({}/unit)={}",
        q8(units),
        cur,
        q2(cost),
        cur,
        q2(avg)
    );

    println!("\nWrote tax report: {}", args.output.display());
    if let Some(path) = &args.balance_output {
        println!("Wrote balance evolution: {}", path.display());
    }
    Ok(())
}
