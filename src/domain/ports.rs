use crate::domain::model::{DynamicBlock, GenerationBatch, PlaceholderMapping, Record};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn template_id(&self) -> &str;
    fn template_path(&self) -> &str;
    fn records_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn archive_name(&self) -> &str;
    fn filename_pattern(&self) -> &str;
    fn name_field(&self) -> &str;
    fn extension_key(&self) -> &str;
    fn include_report(&self) -> bool;
}

/// Source of reusable block definitions, keyed by block id.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<DynamicBlock>>;
    async fn list(&self) -> Result<Vec<DynamicBlock>>;
}

/// Per-template placeholder mappings.
#[async_trait]
pub trait MappingRegistry: Send + Sync {
    async fn get(&self, template_id: &str, placeholder: &str) -> Result<Option<PlaceholderMapping>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<GenerationBatch>;
    async fn load(&self, batch: GenerationBatch) -> Result<String>;
}
