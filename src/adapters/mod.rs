// Adapters layer: concrete implementations for external systems (record files, block and mapping stores).

pub mod csv_records;
pub mod store;

pub use store::{InMemoryBlockStore, InMemoryMappingRegistry};
