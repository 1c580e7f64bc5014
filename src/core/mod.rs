pub mod collector;
pub mod condition;
pub mod engine;
pub mod format;
pub mod merge;
pub mod renderer;
pub mod resolver;

pub use crate::domain::model::{GenerationBatch, Record};
pub use crate::domain::ports::{BlockStore, ConfigProvider, MappingRegistry, Pipeline, Storage};
pub use crate::utils::error::Result;
