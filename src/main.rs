use clap::Parser;
use contract_merge::domain::model::Template;
use contract_merge::domain::ports::{BlockStore, ConfigProvider};
use contract_merge::utils::error::ErrorSeverity;
use contract_merge::utils::{logger, validation::Validate};
use contract_merge::{
    BulkMergePipeline, CliConfig, GenerationEngine, InMemoryBlockStore, InMemoryMappingRegistry,
    LocalStorage, MergeConfig, TemplateMerger,
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliConfig::parse();

    let mut config = match MergeConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load job file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if args.log_json || config.json_logging() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting contract-merge");
    tracing::info!("📁 Loaded job file: {}", args.config);

    let base_dir = Path::new(&args.config)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let base_dir = std::env::current_dir()?.join(base_dir);
    config.resolve_paths(&base_dir);
    args.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    let blocks = match config.load_blocks().and_then(InMemoryBlockStore::new) {
        Ok(blocks) => blocks,
        Err(e) => {
            tracing::error!("❌ Failed to load blocks: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    let mappings =
        InMemoryMappingRegistry::from_entries(config.template_id(), config.mappings.clone());
    let merger =
        TemplateMerger::new(blocks, mappings).with_extension_key(config.extension_key());

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No documents will be written");
        perform_dry_run(&config, &merger).await?;
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = BulkMergePipeline::new(storage, config, merger);
    let engine = GenerationEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Contract generation completed successfully!");
            println!("✅ Contract generation completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Contract generation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &MergeConfig, args: &CliConfig) {
    println!("📋 Job Summary:");
    println!(
        "  Job: {} v{}",
        config.job.name,
        config.job.version.as_deref().unwrap_or("0.0.0")
    );
    println!("  Template: {} ({})", config.template_id(), config.template_path());
    println!("  Records: {}", config.records_path());
    println!(
        "  Output: {}/{}",
        config.output_path(),
        config.archive_name()
    );
    println!("  File names: {}", config.filename_pattern());
    println!("  Report: {}", config.include_report());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(
    config: &MergeConfig,
    merger: &TemplateMerger<InMemoryBlockStore, InMemoryMappingRegistry>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let body = tokio::fs::read_to_string(config.template_path()).await?;
    let template = Template::new(config.template_id(), body);
    let prepared = merger.prepare(&template).await?;

    println!("🧩 Placeholders ({}):", prepared.placeholders().len());
    for placeholder in prepared.placeholders() {
        println!("  {{{{{}}}}} -> {}", placeholder, prepared.describe(placeholder));
    }

    if !prepared.unresolved().is_empty() {
        println!();
        println!("⚠️ Unresolved placeholders will render empty:");
        for placeholder in prepared.unresolved() {
            println!("  {}", placeholder);
        }
    }

    let blocks = merger.blocks().list().await?;
    println!();
    println!("📦 Blocks available ({}):", blocks.len());
    for block in &blocks {
        println!(
            "  {} [{}] -> {{{{{}}}}}",
            block.id,
            block.output_type.as_str(),
            block.placeholder
        );
    }

    println!();
    println!("✅ Dry run analysis complete.");

    Ok(())
}
