pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::MergeConfig};

pub use adapters::{InMemoryBlockStore, InMemoryMappingRegistry};
pub use app::pipelines::BulkMergePipeline;
pub use core::collector::collect;
pub use core::condition::evaluate;
pub use core::engine::GenerationEngine;
pub use core::merge::{PreparedTemplate, TemplateMerger};
pub use core::renderer::render;
pub use core::resolver::{resolve, FieldResolver};
pub use utils::error::{MergeError, Result};
