use crate::domain::model::{DynamicBlock, MappingEntry, PlaceholderMapping};
use crate::domain::ports::{BlockStore, MappingRegistry};
use crate::utils::error::Result;
use crate::utils::validation::validate_unique;
use async_trait::async_trait;
use std::collections::HashMap;

/// Block definitions loaded up front from a job file or a JSON export.
///
/// Ids and placeholders must both be unique; a collision is rejected here so
/// a merge never has to pick between two blocks.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlockStore {
    blocks: Vec<DynamicBlock>,
    index: HashMap<String, usize>,
}

impl InMemoryBlockStore {
    pub fn new(blocks: Vec<DynamicBlock>) -> Result<Self> {
        validate_unique("blocks.id", blocks.iter().map(|b| b.id.as_str()))?;
        validate_unique(
            "blocks.placeholder",
            blocks.iter().map(|b| b.placeholder.as_str()),
        )?;

        let index = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (block.id.clone(), i))
            .collect();
        Ok(Self { blocks, index })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn find_by_placeholder(&self, placeholder: &str) -> Option<&DynamicBlock> {
        self.blocks.iter().find(|b| b.placeholder == placeholder)
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn get(&self, id: &str) -> Result<Option<DynamicBlock>> {
        Ok(self.index.get(id).map(|&i| self.blocks[i].clone()))
    }

    async fn list(&self) -> Result<Vec<DynamicBlock>> {
        Ok(self.blocks.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingRegistry {
    mappings: HashMap<(String, String), PlaceholderMapping>,
}

impl InMemoryMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries without a template id are filed under `default_template_id`.
    pub fn from_entries(default_template_id: &str, entries: Vec<MappingEntry>) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            let template_id = entry
                .template_id
                .unwrap_or_else(|| default_template_id.to_string());
            registry.set(&template_id, &entry.placeholder, entry.mapping);
        }
        registry
    }

    /// Replaces any earlier mapping for the placeholder, whatever its type.
    pub fn set(&mut self, template_id: &str, placeholder: &str, mapping: PlaceholderMapping) {
        self.mappings
            .insert((template_id.to_string(), placeholder.to_string()), mapping);
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[async_trait]
impl MappingRegistry for InMemoryMappingRegistry {
    async fn get(&self, template_id: &str, placeholder: &str) -> Result<Option<PlaceholderMapping>> {
        Ok(self
            .mappings
            .get(&(template_id.to_string(), placeholder.to_string()))
            .cloned())
    }
}
