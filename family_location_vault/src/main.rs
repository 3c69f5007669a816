//! Family Location Vault - diagnostic CLI
//!
//! Runs the engine self-test and encrypts / decrypts single records for
//! interop checks between devices.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use family_location_vault::{selftest, EngineConfig, LocationCipher, LocationPayload, StorageValue};

#[derive(Parser)]
#[command(name = "location-vault")]
#[command(version = family_location_vault::VERSION)]
#[command(about = "Family Location Vault - shared-secret location encryption")]
struct Cli {
    /// Engine config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine self-test
    SelfTest {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Encrypt one location reading into an envelope
    Encrypt {
        /// Family shared secret
        #[arg(short, long)]
        secret: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long)]
        address: Option<String>,

        /// ISO-8601 timestamp (defaults to now)
        #[arg(long)]
        timestamp: Option<String>,
    },

    /// Decrypt one envelope
    Decrypt {
        #[arg(short, long)]
        secret: String,

        envelope: String,
    },

    /// Resolve a raw stored value (JSON object, envelope or legacy JSON text)
    Resolve {
        #[arg(short, long)]
        secret: String,

        raw: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::SelfTest { json } => {
            let report = selftest::run(&config);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for check in &report.checks {
                    let mark = if check.passed { "ok  " } else { "FAIL" };
                    match &check.detail {
                        Some(detail) => println!("[{mark}] {} - {detail}", check.name),
                        None => println!("[{mark}] {}", check.name),
                    }
                }
                println!("{} checks in {} ms", report.checks.len(), report.duration_ms);
            }
            return Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }

        Commands::Encrypt {
            secret,
            lat,
            lon,
            address,
            timestamp,
        } => {
            let payload = match timestamp {
                Some(ts) => LocationPayload::new(lat, lon, ts, address),
                None => LocationPayload::now(lat, lon, address),
            };
            let cipher = LocationCipher::new(&config);
            println!("{}", cipher.encrypt(&secret, &payload)?);
        }

        Commands::Decrypt { secret, envelope } => {
            let cipher = LocationCipher::new(&config);
            let payload = cipher.decrypt(&secret, &envelope)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }

        Commands::Resolve { secret, raw } => {
            let value = match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(json) => StorageValue::from(json),
                Err(_) => StorageValue::Text(raw),
            };
            let cipher = LocationCipher::new(&config);
            match cipher.resolve(&value, &secret) {
                Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                None => {
                    println!("null");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
