//! # Ecosort CLI (`ecosort`)
//!
//! Command-line front end and HTTP server for the waste-sorting assistant.
//!
//! ```bash
//! ecosort --config ./ecosort.yaml serve
//! ecosort ask "피자 박스 버리는 법" --location "서울특별시 종로구"
//! ecosort vision ./photo.jpg
//! ecosort schedule 서울특별시 종로구
//! ecosort holidays 2025 5
//! ecosort fees 소파
//! ecosort region "서울특별시 종로구"
//! ecosort address home "부산광역시 해운대구 우동"
//! ```
//!
//! Credentials come from the config file or from `DATA_GO_KR_API_KEY` and
//! `GOOGLE_GEMINI_API_KEY`.

mod server;

use anyhow::{bail, Context};
use base64::Engine;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ecosort_core::{StreamSummary, NO_COLLECTION, WEEKDAYS};
use ecosort_runtime::{
    AddressSlot, Assistant, FeeSource, ImageRequest, QueryRequest, RuntimeConfig, ScheduleSource,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "ecosort.yaml";

#[derive(Parser)]
#[command(
    name = "ecosort",
    about = "Ecosort - Korean waste-sorting assistant",
    version
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, global = true, env = "ECOSORT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    Serve {
        /// Bind address, overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ask how to discard something.
    Ask {
        query: String,

        /// Free-form address, e.g. "서울특별시 종로구".
        #[arg(long)]
        location: Option<String>,

        /// Use a saved address instead of --location.
        #[arg(long, conflicts_with = "location")]
        at: Option<AddressSlot>,

        /// Print the full JSON response.
        #[arg(long)]
        json: bool,
    },

    /// Identify the item in a JPEG photo.
    Vision {
        path: PathBuf,

        #[arg(long)]
        location: Option<String>,
    },

    /// Show discharge rules for a region.
    Rules { sido: String, sigungu: String },

    /// Show the weekly discharge schedule for a region.
    Schedule { sido: String, sigungu: String },

    /// List public holidays in a month.
    Holidays { year: i32, month: u32 },

    /// Large-waste sticker prices.
    Fees {
        /// Item or question, e.g. "소파"; omit to list every fee.
        item: Option<String>,
    },

    /// Collection summary and today's alert for an address.
    Region {
        /// Free-form address; the saved home address when omitted.
        location: Option<String>,
    },

    /// Show or save the home/work address.
    Address {
        slot: AddressSlot,

        /// New address; omit to print the saved one.
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let assistant =
        Assistant::from_config(&config).context("Failed to initialize the assistant")?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            server::run_server(Arc::new(assistant), &bind).await?;
        }
        Commands::Ask {
            query,
            location,
            at,
            json,
        } => {
            let location = match at {
                Some(slot) => Some(
                    assistant
                        .address(slot)
                        .with_context(|| format!("No saved address for {}", slot.key()))?,
                ),
                None => location,
            };
            let response = assistant
                .ask(QueryRequest {
                    query,
                    location,
                    session_id: None,
                })
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.message());
            }
        }
        Commands::Vision { path, location } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            let image = base64::engine::general_purpose::STANDARD.encode(bytes);
            let message = assistant
                .describe_image(ImageRequest { image, location })
                .await?;
            println!("{}", message);
        }
        Commands::Rules { sido, sigungu } => {
            let rules = assistant.lookup_rules(&sido, &sigungu).await?;
            if rules.is_empty() {
                eprintln!("No rules found for {} {}", sido, sigungu);
            }
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
        Commands::Schedule { sido, sigungu } => {
            let lookup = assistant.lookup_schedule(&sido, &sigungu).await?;
            match (lookup.source, lookup.schedule) {
                (ScheduleSource::None, _) | (_, None) => {
                    bail!("No schedule known for {} {}", sido, sigungu)
                }
                (source, Some(schedule)) => {
                    if source == ScheduleSource::Cached {
                        eprintln!("(showing the last saved schedule)");
                    }
                    for (index, name) in WEEKDAYS.iter().enumerate() {
                        let day = schedule
                            .days
                            .get(&(index as u8))
                            .map(String::as_str)
                            .unwrap_or(NO_COLLECTION);
                        println!("{}: {}", name, day);
                    }
                }
            }
        }
        Commands::Holidays { year, month } => {
            let holidays = assistant.lookup_holidays(year, month).await?;
            if holidays.is_empty() {
                println!("No holidays in {}-{:02}", year, month);
            }
            for holiday in holidays {
                println!("{}  {}", holiday.date, holiday.name);
            }
        }
        Commands::Fees { item } => {
            let lookup = assistant.lookup_fees(item.as_deref().unwrap_or("")).await;
            if lookup.fees.is_empty() {
                bail!("No large-waste fee found for '{}'", lookup.item);
            }
            if lookup.source == FeeSource::Bundled {
                eprintln!("(standard fee table; your district may charge differently)");
            }
            for fee in &lookup.fees {
                println!("{}", fee.describe());
            }
        }
        Commands::Region { location } => {
            let today = chrono::Local::now().date_naive();
            let summary = assistant.region_info(location.as_deref(), today).await?;
            println!("[{}]", summary.region_name);
            print_stream("일반쓰레기", summary.general_waste.as_ref());
            print_stream("음식물쓰레기", summary.food_waste.as_ref());
            print_stream("재활용품", summary.recycle_waste.as_ref());
            println!(
                "대형폐기물: {} ({})",
                or_unknown(&summary.large_waste.days),
                summary.large_waste.method
            );
            if !summary.contact.is_empty() {
                println!("문의: {}", summary.contact);
            }
            println!("{:?}: {}", summary.alert.status, summary.alert.message);
        }
        Commands::Address { slot, text } => match text {
            Some(text) => {
                if config.store.path.is_none() {
                    tracing::warn!("store.path is not set; the address will not be kept");
                }
                assistant.set_address(slot, &text)?;
                println!("Saved {}", slot.key());
            }
            None => match assistant.address(slot) {
                Some(address) => println!("{}", address),
                None => bail!("No saved address for {}", slot.key()),
            },
        },
    }

    Ok(())
}

fn print_stream(label: &str, stream: Option<&StreamSummary>) {
    match stream {
        Some(stream) => println!(
            "{}: {} {} {}",
            label,
            or_unknown(&stream.days),
            stream.time,
            stream.note
        ),
        None => println!("{}: 정보 없음", label),
    }
}

fn or_unknown(text: &str) -> &str {
    if text.trim().is_empty() {
        "정보 없음"
    } else {
        text
    }
}

/// Explicit path, else `./ecosort.yaml` if present, else defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    if let Some(path) = path {
        return RuntimeConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let fallback = Path::new(DEFAULT_CONFIG);
    if fallback.exists() {
        return RuntimeConfig::from_path(fallback)
            .with_context(|| format!("Failed to load config {}", fallback.display()));
    }

    Ok(RuntimeConfig::from_yaml("")?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_slot() {
        let cli = Cli::try_parse_from(["ecosort", "ask", "캔", "--at", "home"]).unwrap();
        match cli.command {
            Commands::Ask { query, at, .. } => {
                assert_eq!(query, "캔");
                assert_eq!(at, Some(AddressSlot::Home));
            }
            _ => panic!("expected ask"),
        }

        assert!(Cli::try_parse_from(["ecosort", "address", "school"]).is_err());
        assert!(Cli::try_parse_from([
            "ecosort", "ask", "캔", "--at", "home", "--location", "서울"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_fees_and_region() {
        let cli = Cli::try_parse_from(["ecosort", "fees", "소파"]).unwrap();
        assert!(matches!(cli.command, Commands::Fees { item: Some(ref item) } if item == "소파"));

        let cli = Cli::try_parse_from(["ecosort", "fees"]).unwrap();
        assert!(matches!(cli.command, Commands::Fees { item: None }));

        let cli = Cli::try_parse_from(["ecosort", "region"]).unwrap();
        assert!(matches!(cli.command, Commands::Region { location: None }));
    }

    #[test]
    fn test_or_unknown() {
        assert_eq!(or_unknown(" "), "정보 없음");
        assert_eq!(or_unknown("화,금"), "화,금");
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecosort.yaml");
        std::fs::write(&path, "server:\n  bind: 0.0.0.0:9999\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9999");

        assert!(load_config(Some(Path::new("/nonexistent/ecosort.yaml"))).is_err());
    }
}
