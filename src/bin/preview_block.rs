use anyhow::{anyhow, Context, Result};
use clap::Parser;
use contract_merge::core::collector::collect_block;
use contract_merge::core::renderer::{render_with_headers, TableHeaders};
use contract_merge::domain::model::Record;
use contract_merge::domain::ports::{BlockStore, ConfigProvider};
use contract_merge::utils::logger;
use contract_merge::{FieldResolver, InMemoryBlockStore, MergeConfig};
use std::path::Path;

/// Renders one block against one record, for checking block definitions
/// before a bulk run.
#[derive(Parser)]
#[command(name = "preview_block")]
#[command(about = "Preview how a dynamic block renders for a single provider record")]
struct Args {
    /// Path to the TOML job file that defines the blocks
    #[arg(short, long, default_value = "merge-job.toml")]
    config: String,

    /// Block id or placeholder name
    #[arg(short, long)]
    block: Option<String>,

    /// JSON file holding one record object
    #[arg(short, long)]
    record: Option<String>,

    /// Record given inline as a JSON object
    #[arg(long, conflicts_with = "record")]
    record_json: Option<String>,

    /// List the available blocks and exit
    #[arg(long)]
    list: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let mut config = MergeConfig::from_file(&args.config)
        .with_context(|| format!("loading job file '{}'", args.config))?;
    if let Some(parent) = Path::new(&args.config).parent() {
        config.resolve_paths(parent);
    }

    let store = InMemoryBlockStore::new(config.load_blocks()?)?;

    if args.list {
        for block in store.list().await? {
            println!(
                "{} [{}] {{{{{}}}}} - {} conditions, {} always-include",
                block.id,
                block.output_type.as_str(),
                block.placeholder,
                block.conditions.len(),
                block.always_include.len()
            );
        }
        return Ok(());
    }

    let key = args
        .block
        .as_deref()
        .ok_or_else(|| anyhow!("--block is required unless --list is given"))?;
    let block = match store.get(key).await? {
        Some(block) => block,
        None => store
            .find_by_placeholder(key)
            .cloned()
            .ok_or_else(|| anyhow!("no block with id or placeholder '{}'", key))?,
    };

    let raw = match (&args.record, &args.record_json) {
        (Some(path), _) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading record file '{}'", path))?,
        (None, Some(json)) => json.clone(),
        (None, None) => return Err(anyhow!("give a record with --record or --record-json")),
    };
    let value: serde_json::Value = serde_json::from_str(&raw).context("parsing record JSON")?;
    let record = Record::from_json(value).ok_or_else(|| anyhow!("record must be a JSON object"))?;

    let resolver = FieldResolver::new()
        .with_extension_key(config.extension_key())
        .with_fields(block.referenced_fields());
    let view = resolver.view(&record);
    let items = collect_block(&resolver, &view, &block);

    tracing::debug!("Block '{}' produced {} items", block.id, items.len());
    for item in &items {
        println!("• {}: {}", item.label, item.value);
    }

    let headers = block
        .value_header
        .as_deref()
        .map(TableHeaders::with_value_header)
        .unwrap_or_default();
    println!();
    println!("{}", render_with_headers(&items, &block.output_type, &headers));

    Ok(())
}
