//! AQHI: Air Quality Health Index engine for Zhejiang cities.
//!
//! Hourly pollutant concentrations (PM2.5, O₃, NO₂, SO₂) are ingested for a
//! fixed set of eleven cities and stored one row per city per hour. Queries
//! average the trailing three hours, convert the averages into a total
//! excess risk (ER) and map that onto the 0-10 AQHI scale with a risk level,
//! color band and health advice.
//!
//! # Architecture
//!
//! - [`core`]: configuration, errors, time buckets, the city set, the SQLite
//!   measurement store and the JSON RPC envelope
//! - [`engine`]: the pure computation: ER formula, index scale, advice and
//!   window aggregation
//! - [`plugins`]: data sources, the ingestion scheduler and the query service
//!
//! # Examples
//!
//! ```bash
//! # Write the config file ($AQHI_CONFIG or ./aqhi.toml) and create the store
//! aqhi init
//!
//! # Current index for every city
//! aqhi index-all
//!
//! # One city, machine readable
//! aqhi index --city 杭州 --format json
//!
//! # Ingest hourly until Ctrl-C
//! aqhi schedule
//!
//! # JSON RPC, one request per line
//! echo '{"op":"history","params":{"city":"宁波","hours":6}}' | aqhi rpc --stdin
//! ```

pub(crate) mod cli;
pub mod core;
pub mod engine;
pub mod plugins;

use crate::cli::{Cli, Command, OutputFormat};
use crate::core::config::AppConfig;
use crate::core::context::Context;
use crate::core::error::AqhiError;
use crate::core::rpc;
use crate::core::store::SqliteStore;
use crate::core::{city::City, logging, time};
use crate::engine::scale::Level;
use crate::engine::window::AqhiResult;
use crate::plugins::ingest::IngestReport;
use crate::plugins::service::{History, Service};

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

pub fn run() -> Result<(), AqhiError> {
    let cli = Cli::parse();

    if let Command::Init { force } = &cli.command {
        let (path, _) = AppConfig::resolve_path(cli.config.as_deref());
        return run_init(&path, *force);
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init(&config.log.filter);
    let service = Service::from_config(&config)?;

    match cli.command {
        Command::Cities => {
            for city in service.cities()? {
                println!("{}\t{}", city, city.cnemc_code());
            }
        }
        Command::Meta => {
            let meta = service.meta();
            println!("data source:  {}", meta.data_source);
            println!("window hours: {}", meta.window_hours);
            println!("cities:       {}", meta.cities.len());
        }
        Command::Index { city, format } => {
            let format: OutputFormat = format.parse()?;
            let city: City = city.parse()?;
            let result = service.city_index(city)?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => {
                    println!("{}", index_line(&result));
                    if let Some(advice) = result.advice {
                        for line in advice.lines() {
                            println!("  {}", line);
                        }
                    }
                }
            }
        }
        Command::IndexAll { format } => {
            let format: OutputFormat = format.parse()?;
            let results = service.all_indexes()?;
            match format {
                OutputFormat::Json => print_json(&results)?,
                OutputFormat::Text => {
                    for result in &results {
                        println!("{}", index_line(result));
                    }
                }
            }
        }
        Command::History {
            city,
            hours,
            format,
        } => {
            let format: OutputFormat = format.parse()?;
            let city: City = city.parse()?;
            let history = service.history(city, hours)?;
            match format {
                OutputFormat::Json => print_json(&history)?,
                OutputFormat::Text => print_history(&history),
            }
        }
        Command::Ingest => {
            let report = service.ingest_now()?;
            print_report(&report)?;
        }
        Command::Schedule { interval_secs } => {
            let interval = interval_secs.unwrap_or(config.ingest.interval_secs);
            run_schedule(&service, interval)?;
        }
        Command::Rpc { op, params, stdin } => {
            if stdin {
                run_rpc_stdin(&service)?;
            } else {
                let op = op.ok_or_else(|| {
                    AqhiError::ValidationError("rpc requires --op or --stdin".to_string())
                })?;
                let params = match params {
                    Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                        AqhiError::ValidationError(format!("invalid --params JSON: {}", e))
                    })?,
                    None => serde_json::Value::Null,
                };
                let request = rpc::RpcRequest {
                    op,
                    params,
                    id: rpc::default_request_id(),
                };
                print_json(&rpc::handle(&service, request))?;
            }
        }
        Command::Init { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), AqhiError> {
    if path.exists() && !force {
        println!("{} already exists, leaving it untouched", path.display());
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, AppConfig::default().to_toml_string()?)?;
        println!("{} {}", "wrote".green(), path.display());
    }

    let config = AppConfig::load(Some(path))?;
    logging::init(&config.log.filter);
    let store = SqliteStore::open(&config.store.path)?;
    println!("{} {}", "store ready at".green(), store.path().display());
    Ok(())
}

fn run_schedule(service: &Service, interval_secs: u64) -> Result<(), AqhiError> {
    let ctx = Context::new();
    let handler_ctx = ctx.clone();
    ctrlc::set_handler(move || handler_ctx.cancel())
        .map_err(|e| AqhiError::IoError(io::Error::other(e.to_string())))?;

    tracing::info!(
        interval_secs,
        source = %service.ingestor().source().kind(),
        "starting ingest schedule"
    );
    let passes = service.ingestor().run_schedule(&ctx, interval_secs);
    tracing::info!(passes, "ingest schedule stopped");
    Ok(())
}

fn run_rpc_stdin(service: &Service) -> Result<(), AqhiError> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match rpc::parse_request(&line) {
            Ok(request) => rpc::handle(service, request),
            Err(response) => response,
        };
        serde_json::to_writer(&mut stdout, &response).map_err(io::Error::from)?;
        writeln!(stdout)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AqhiError> {
    let out = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    println!("{}", out);
    Ok(())
}

fn colorize_level(level: Level) -> colored::ColoredString {
    let text = format!("{} {}", level.label(), level.color().label());
    match level {
        Level::One => text.green(),
        Level::Two => text.blue(),
        Level::Three => text.yellow(),
        Level::Four => text.red().bold(),
    }
}

fn index_line(result: &AqhiResult) -> String {
    match (result.aqhi, result.level) {
        (Some(aqhi), Some(level)) => format!(
            "{}\tAQHI {:>4.1}  {}  ER {:.2}  ({}/{}h)",
            result.city,
            aqhi,
            colorize_level(level),
            result.er_total.unwrap_or_default(),
            result.available_points,
            result.window_hours
        ),
        _ => format!("{}\t{}", result.city, "no data".dimmed()),
    }
}

fn print_history(history: &History) {
    println!("{}", history.city.to_string().bold());
    if history.series.is_empty() {
        println!("  {}", "no data".dimmed());
        return;
    }
    println!(
        "  {:<25} {:>8} {:>8} {:>8} {:>8}",
        "hour", "PM2.5", "O₃", "NO₂", "SO₂"
    );
    for point in &history.series {
        println!(
            "  {:<25} {:>8.1} {:>8.1} {:>8.1} {:>8.1}",
            point.ts, point.pm25, point.o3, point.no2, point.so2
        );
    }
}

fn print_report(report: &IngestReport) -> Result<(), AqhiError> {
    let hour = time::format_hour(report.hour)?;
    let summary = format!(
        "ingested {}/{} cities for {}",
        report.written.len(),
        City::ALL.len(),
        hour
    );
    if report.is_complete() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.yellow());
        for failure in &report.failed {
            println!("  {} {}: {}", "✗".red(), failure.city, failure.error);
        }
    }
    Ok(())
}
