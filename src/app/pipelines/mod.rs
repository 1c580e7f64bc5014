pub mod bulk_pipeline;

pub use bulk_pipeline::BulkMergePipeline;
