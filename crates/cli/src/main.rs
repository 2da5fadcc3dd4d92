mod config;
mod serve;
mod telemetry;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use visaflow_core::{Category, SectionName};
use visaflow_engine::Allocator;
use visaflow_storage::MemoryStore;

use crate::config::VisaflowConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Study-abroad application workflow backend.
#[derive(Parser)]
#[command(
    name = "visaflow",
    version,
    about = "Study-abroad application workflow backend"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output (server logs only warnings)
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on (overrides config and VISAFLOW_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },

    /// Allocate identifiers against a fresh in-memory store
    Allocate {
        /// Category: application, agent or ticket
        category: String,
        /// Calendar date to allocate for (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Number of identifiers to allocate
        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// List the status set of every section, or of one section
    Statuses {
        /// Section name (offerLetter, gic, pageStatus, ticket)
        section: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();

    let config = match VisaflowConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Serve {
            port,
            tls_cert,
            tls_key,
        } => {
            if tls_cert.is_some() != tls_key.is_some() {
                eprintln!("error: --tls-cert and --tls-key must both be provided");
                process::exit(1);
            }
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            if cli.quiet {
                config.log.level = "warn".to_string();
            }
            if let Err(e) = telemetry::init(&config.log) {
                eprintln!("error: cannot initialize logging: {}", e);
                process::exit(1);
            }
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config, tls_cert, tls_key)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Allocate {
            category,
            date,
            count,
        } => {
            cmd_allocate(&config, &category, date.as_deref(), count, cli.output);
        }
        Commands::Statuses { section } => {
            cmd_statuses(section.as_deref(), cli.output);
        }
        Commands::Config => match config.to_redacted_toml() {
            Ok(rendered) => print!("{}", rendered),
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
    }
}

fn cmd_allocate(
    config: &VisaflowConfig,
    category: &str,
    date: Option<&str>,
    count: u32,
    output: OutputFormat,
) {
    let category: Category = match category.parse() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let offset = match config.utc_offset() {
        Ok(offset) => offset,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let now = match date {
        None => OffsetDateTime::now_utc(),
        Some(raw) => match Date::parse(raw, format_description!("[year]-[month]-[day]")) {
            Ok(day) => day.midnight().assume_offset(offset),
            Err(e) => {
                eprintln!("error: invalid --date '{}': {}", raw, e);
                process::exit(1);
            }
        },
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {}", e);
            process::exit(1);
        }
    };
    let allocator = Allocator::new(Arc::new(MemoryStore::new())).with_utc_offset(offset);
    let result = rt.block_on(async {
        let mut identifiers = Vec::new();
        for _ in 0..count {
            identifiers.push(allocator.allocate(category, now).await?);
        }
        Ok::<_, visaflow_engine::EngineError>(identifiers)
    });

    match result {
        Ok(identifiers) => match output {
            OutputFormat::Text => {
                for identifier in &identifiers {
                    println!("{}", identifier);
                }
            }
            OutputFormat::Json => {
                let rendered: Vec<String> = identifiers.iter().map(|i| i.to_string()).collect();
                println!(
                    "{}",
                    serde_json::json!({ "category": category.as_str(), "identifiers": rendered })
                );
            }
        },
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_statuses(section: Option<&str>, output: OutputFormat) {
    let sections: Vec<SectionName> = match section {
        None => SectionName::ALL.to_vec(),
        Some(raw) => match raw.parse() {
            Ok(name) => vec![name],
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
    };

    match output {
        OutputFormat::Text => {
            for name in sections {
                let statuses: Vec<&str> = name.statuses().iter().map(|s| s.as_str()).collect();
                println!(
                    "{} ({}): {}",
                    name,
                    name.type_tag(),
                    statuses.join(", ")
                );
            }
        }
        OutputFormat::Json => {
            let mut out = serde_json::Map::new();
            for name in sections {
                out.insert(
                    name.as_str().to_string(),
                    serde_json::json!({
                        "type": name.type_tag(),
                        "initial": name.initial_status(),
                        "statuses": name.statuses(),
                        "terminal": name
                            .statuses()
                            .into_iter()
                            .filter(|s| s.is_terminal())
                            .collect::<Vec<_>>(),
                    }),
                );
            }
            let pretty = serde_json::to_string_pretty(&serde_json::Value::Object(out))
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }
}
