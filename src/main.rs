// src/main.rs
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use dedupe_lib::store::InMemoryStore;
use dedupe_lib::utils::config::MatchingConfig;
use dedupe_lib::utils::env::{load_env, load_env_from};
use dedupe_lib::models::SearchCriteria;
use dedupe_lib::{DuplicateDetector, MatchingEngine};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Matching config document (JSON). Falls back to MATCHING_CONFIG_PATH, then built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extra env file to load before reading configuration
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RecordsArg {
    /// Records document (JSON) with candidates per category and stored messages
    #[arg(long)]
    records: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Match structured fields against stored records
    Search {
        #[command(flatten)]
        records: RecordsArg,

        /// Search field as name=value, repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Match a free-text query against record display names
    SearchText {
        #[command(flatten)]
        records: RecordsArg,

        #[arg(long)]
        query: String,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Find stored messages that near-duplicate the given text
    Duplicates {
        #[command(flatten)]
        records: RecordsArg,

        #[arg(long)]
        text: String,

        /// Stored message to ignore (re-checking an existing record)
        #[arg(long)]
        exclude_id: Option<String>,

        /// Only print the best match
        #[arg(long)]
        best: bool,
    },
    /// Validate the configuration and print a summary
    CheckConfig,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

fn load_config(path: Option<&Path>) -> Result<MatchingConfig> {
    let config = match path {
        Some(path) => MatchingConfig::load(path)
            .with_context(|| format!("Failed to load matching config from {}", path.display()))?,
        None => MatchingConfig::load_from_env().context("Failed to load matching config")?,
    };
    Ok(config)
}

fn load_records(arg: &RecordsArg) -> Result<Arc<InMemoryStore>> {
    let store = InMemoryStore::load(&arg.records)?;
    info!("Loaded {} stored messages", store.message_count());
    Ok(Arc::new(store))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();

    let cli = Cli::parse();
    if let Some(env_file) = &cli.env_file {
        load_env_from(env_file);
    }

    let config = Arc::new(load_config(cli.config.as_deref())?);
    config.log_config();

    match cli.command {
        Command::Search {
            records,
            fields,
            category,
            limit,
        } => {
            if fields.is_empty() {
                return Err(anyhow!("at least one --field name=value is required"));
            }
            let criteria: SearchCriteria = fields
                .into_iter()
                .map(|(name, value)| (name, Some(value)))
                .collect();
            let engine = MatchingEngine::new(config, load_records(&records)?);
            let results = engine
                .search_matches(&criteria, category.as_deref(), limit)
                .await
                .context("Search failed")?;
            print_json(&results)
        }
        Command::SearchText {
            records,
            query,
            category,
            limit,
        } => {
            let engine = MatchingEngine::new(config, load_records(&records)?);
            let results = engine
                .search_by_text(&query, category.as_deref(), limit)
                .await
                .context("Text search failed")?;
            print_json(&results)
        }
        Command::Duplicates {
            records,
            text,
            exclude_id,
            best,
        } => {
            let detector = DuplicateDetector::new(config, load_records(&records)?);
            if best {
                let info = detector
                    .get_duplicate_info(&text, exclude_id.as_deref())
                    .await
                    .context("Duplicate check failed")?;
                print_json(&info)
            } else {
                let duplicates = detector
                    .find_duplicates(&text, exclude_id.as_deref())
                    .await
                    .context("Duplicate check failed")?;
                print_json(&duplicates)
            }
        }
        Command::CheckConfig => {
            info!("✅ Configuration is valid");
            print_json(&config.category_names())
        }
    }
}
