//! `canvas`: operator CLI for saved canvases and the JSON data directory

use anyhow::{bail, Context, Result};
use canvas_gateway::providers::{ProviderClient, ProviderKeys};
use canvas_gateway::{model_capabilities, JsonFileRoot};
use canvas_model::{NodeKind, Position};
use canvas_store::{CanvasStore, FileStore, ManualScheduler, StoreConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(name = "canvas", version, about = "Inspect and edit saved canvases")]
struct Cli {
    /// Directory holding the persisted canvas
    #[arg(long, global = true, env = "CANVAS_STORE_DIR", default_value = ".canvas")]
    store_dir: PathBuf,

    /// Root of the JSON data directory
    #[arg(long, global = true, env = "CANVAS_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Store settings as TOML
    #[arg(long, global = true, env = "CANVAS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the alias table of the saved canvas
    Inspect {
        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve `@alias` references and print the message parts
    Assemble {
        /// Prompt text
        text: String,
    },
    /// Add a node and save the canvas
    Add {
        /// Node type: generator, content, component, data2ui, iframe or folder
        kind: NodeKind,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
    },
    /// List JSON files under the data directory
    ListJson,
    /// Write a JSON file under the data directory
    WriteJson {
        /// Target path relative to the data directory
        #[arg(long)]
        path: String,
        /// File holding the JSON value
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the capabilities of model ids
    Models {
        /// Model ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Fetch the provider catalog using API keys from the environment
    Providers {
        /// Include models outside the curated lists
        #[arg(long)]
        all: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<StoreConfig> {
    match path {
        Some(path) => StoreConfig::from_toml_file(path)
            .with_context(|| format!("failed to read config {}", path.display())),
        None => Ok(StoreConfig::default()),
    }
}

/// Open the saved canvas; timers never fire in a one-shot command
fn open_store(cli: &Cli) -> Result<CanvasStore> {
    let config = load_config(cli.config.as_deref())?;
    let storage = FileStore::open(&cli.store_dir)
        .with_context(|| format!("failed to open store dir {}", cli.store_dir.display()))?;
    let store = CanvasStore::hydrate(config, Arc::new(ManualScheduler::new()), Arc::new(storage));
    if store.is_quarantined() {
        tracing::warn!(
            "saved canvas is unreadable; a copy was kept as '{}' and it will not be overwritten",
            store.backup_key()
        );
    }
    Ok(store)
}

fn inspect(store: &CanvasStore, json: bool) -> Result<()> {
    let aliases = store.alias_map();
    if json {
        println!("{}", serde_json::to_string_pretty(&aliases)?);
        return Ok(());
    }
    if aliases.is_empty() {
        println!("(empty canvas)");
        return Ok(());
    }
    println!("{:<16} {:<10} {:<28} VALUE", "ALIAS", "TYPE", "ID");
    for (alias, entry) in aliases.iter() {
        let value: String = entry.value.chars().take(48).collect();
        println!(
            "{:<16} {:<10} {:<28} {}",
            alias,
            entry.kind.to_string(),
            entry.node_id.to_string(),
            value.replace('\n', " ")
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    tracing::debug!("canvas cli v{}", canvas_store::VERSION);

    match &cli.command {
        Command::Inspect { json } => {
            let store = open_store(&cli)?;
            inspect(&store, *json)?;
        }
        Command::Assemble { text } => {
            let store = open_store(&cli)?;
            let parts = store.build_message_content(text);
            println!("{}", serde_json::to_string_pretty(&parts)?);
        }
        Command::Add { kind, x, y } => {
            let mut store = open_store(&cli)?;
            let id = store.add_node(*kind, Some(Position::new(*x, *y)));
            store.save_to_storage().context("failed to save canvas")?;
            let alias = store.node(&id).map(|n| n.alias().to_string()).unwrap_or_default();
            println!("{id} {alias}");
        }
        Command::ListJson => {
            let root = JsonFileRoot::new(&cli.data_dir);
            for path in root.list_json_files().await? {
                println!("{path}");
            }
        }
        Command::WriteJson { path, input } => {
            let text = tokio::fs::read_to_string(input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            let value: serde_json::Value =
                serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", input.display()))?;
            let written = JsonFileRoot::new(&cli.data_dir).write_json(path, &value).await?;
            tracing::info!("wrote {}", written);
        }
        Command::Models { ids } => {
            for id in ids {
                let capabilities = serde_json::to_string(&model_capabilities(id))?;
                println!("{id} {capabilities}");
            }
        }
        Command::Providers { all } => {
            let keys = ProviderKeys::from_env();
            if keys.is_empty() {
                bail!("no provider API keys configured");
            }
            let catalog = ProviderClient::new(keys)?.fetch_catalog(*all).await;
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
    }
    Ok(())
}
