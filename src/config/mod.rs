pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

/// Command-line flags for a bulk merge run. Values given here override the
/// job file.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "contract-merge")]
#[command(about = "Fill contract templates from provider records in bulk")]
pub struct CliConfig {
    /// Path to the TOML job file
    #[arg(short, long, default_value = "merge-job.toml")]
    pub config: String,

    /// Override load.output_path
    #[arg(long)]
    pub output_path: Option<String>,

    /// Override records.path
    #[arg(long)]
    pub records: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    /// Show how each placeholder resolves without generating documents
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn apply_overrides(&self, config: &mut toml_config::MergeConfig) {
        if let Some(output_path) = &self.output_path {
            tracing::info!("🔧 Output path overridden to: {}", output_path);
            config.load.output_path = output_path.clone();
        }
        if let Some(records) = &self.records {
            tracing::info!("🔧 Records file overridden to: {}", records);
            // Relative to the working directory, not the job file.
            config.records.path = std::env::current_dir()
                .map(|cwd| cwd.join(records).to_string_lossy().into_owned())
                .unwrap_or_else(|_| records.clone());
        }
    }
}
