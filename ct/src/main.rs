use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use cargotruck::cli::{Cli, Command};
use cargotruck::config::Config;
use cargotruck::{Delivery, Truck, TypeRegistry};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") => tracing::Level::INFO,
        Some("ERROR") => tracing::Level::ERROR,
        Some("WARN") | Some("WARNING") | None => tracing::Level::WARN,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", other);
            tracing::Level::WARN
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let channel = cli.channel.clone().unwrap_or_else(|| config.channel.clone());
    let base_dir = cli.base_dir.clone().unwrap_or_else(|| config.base_dir.clone());
    debug!(%channel, ?base_dir, "cargotruck starting");

    let truck = Truck::builder(&channel)
        .base_dir(&base_dir)
        .poll_interval(config.poll_interval())
        .registry(TypeRegistry::new().register::<i64>().register::<String>())
        .build()
        .context("Failed to set up truck")?;

    match cli.command {
        Command::Send { address, ints, texts } => {
            for value in &ints {
                truck.load(value)?;
            }
            for text in &texts {
                truck.load(text)?;
            }
            truck
                .deliver(&address)
                .context(format!("Failed to deliver to {}", address))?;
            println!(
                "{} Delivered {} item(s) to {}",
                "✓".green(),
                truck.cargo_count(),
                address.cyan()
            );
        }
        Command::Receive { address, timeout } => {
            let timeout = timeout.map(Duration::from_millis).unwrap_or_else(|| config.timeout());
            let delivery = truck
                .await_delivery(&address, timeout)
                .await
                .context("Delivery task failed")??;

            match delivery {
                Delivery::Received { items } => {
                    info!(%address, items, "Received delivery");
                    for value in truck.unload::<i64>()? {
                        println!("{} {}", "int:".yellow(), value);
                    }
                    for text in truck.unload::<String>()? {
                        println!("{} {}", "text:".yellow(), text);
                    }
                }
                Delivery::TimedOut => {
                    return Err(eyre::eyre!(
                        "No delivery at {} after {} ms",
                        address,
                        timeout.as_millis()
                    ));
                }
            }
        }
        Command::Peek { address, json } => match truck.peek(&address)? {
            None => println!("Nothing delivered at {}", address),
            Some(container) => {
                let summary = container.summary();
                if json {
                    let rows: Vec<(&str, usize)> = summary.iter().map(|(key, count)| (key.as_str(), *count)).collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    println!("Address: {}", address.cyan());
                    for (key, count) in &summary {
                        println!("  {:>4}  {}", count, key.short_name());
                    }
                }
            }
        },
        Command::List { json } => {
            let addresses = truck.channel().addresses()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&addresses)?);
            } else if addresses.is_empty() {
                println!("No deliveries found");
            } else {
                for address in addresses {
                    println!("{}", address);
                }
            }
        }
        Command::Clear { address } => {
            if truck.channel().clear(&address)? {
                println!("{} Cleared {}", "✓".green(), address);
            } else {
                println!("Nothing delivered at {}", address);
            }
        }
    }

    Ok(())
}
