//! Placeholder substitution for one template across many records.
//!
//! [`TemplateMerger::prepare`] does the async part once per template: it asks
//! the mapping registry about every placeholder and fetches the blocks those
//! mappings name. The resulting [`PreparedTemplate`] merges records
//! synchronously.

use crate::core::collector::collect_block;
use crate::core::format::field_value;
use crate::core::renderer::{render_with_headers, TableHeaders};
use crate::core::resolver::{FieldResolver, DEFAULT_EXTENSION_KEY};
use crate::domain::model::{DynamicBlock, MergeOutcome, PlaceholderMapping, Record, Template};
use crate::domain::ports::{BlockStore, MappingRegistry};
use crate::utils::error::Result;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Distinct placeholder names in order of first appearance.
pub fn extract_placeholders(body: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    placeholder_pattern()
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Replaces every `{{name}}` token in one pass over `body`. Replacement text
/// is never scanned again.
pub fn substitute<F>(body: &str, mut replacement: F) -> String
where
    F: FnMut(&str) -> String,
{
    placeholder_pattern()
        .replace_all(body, |caps: &Captures| replacement(&caps[1]))
        .into_owned()
}

#[derive(Debug, Clone)]
enum Slot {
    Field { column: String },
    Block(DynamicBlock),
    Unresolved,
}

pub struct TemplateMerger<B: BlockStore, M: MappingRegistry> {
    blocks: B,
    mappings: M,
    extension_key: String,
}

impl<B: BlockStore, M: MappingRegistry> TemplateMerger<B, M> {
    pub fn new(blocks: B, mappings: M) -> Self {
        Self {
            blocks,
            mappings,
            extension_key: DEFAULT_EXTENSION_KEY.to_string(),
        }
    }

    pub fn with_extension_key(mut self, key: &str) -> Self {
        self.extension_key = key.to_string();
        self
    }

    pub fn blocks(&self) -> &B {
        &self.blocks
    }

    pub async fn prepare(&self, template: &Template) -> Result<PreparedTemplate> {
        let placeholders = extract_placeholders(&template.body);
        let mut slots = HashMap::with_capacity(placeholders.len());
        let mut unresolved = Vec::new();
        let mut fields: Vec<String> = Vec::new();

        for placeholder in &placeholders {
            let slot = match self.mappings.get(&template.id, placeholder).await? {
                Some(PlaceholderMapping::Field { column }) => {
                    fields.push(column.clone());
                    Slot::Field { column }
                }
                Some(PlaceholderMapping::Dynamic { block_id }) => {
                    match self.blocks.get(&block_id).await? {
                        Some(block) => {
                            fields.extend(block.referenced_fields().map(str::to_string));
                            Slot::Block(block)
                        }
                        None => {
                            tracing::warn!(
                                "Placeholder '{}' maps to unknown block '{}'",
                                placeholder,
                                block_id
                            );
                            unresolved.push(placeholder.clone());
                            Slot::Unresolved
                        }
                    }
                }
                None => {
                    tracing::warn!(
                        "Placeholder '{}' has no mapping for template '{}'",
                        placeholder,
                        template.id
                    );
                    unresolved.push(placeholder.clone());
                    Slot::Unresolved
                }
            };
            slots.insert(placeholder.clone(), slot);
        }

        let resolver = FieldResolver::new()
            .with_extension_key(&self.extension_key)
            .with_fields(fields.iter().map(String::as_str));

        tracing::debug!(
            "Prepared template '{}': {} placeholders, {} unresolved, {} field aliases",
            template.id,
            placeholders.len(),
            unresolved.len(),
            resolver.aliases().len()
        );

        Ok(PreparedTemplate {
            template_id: template.id.clone(),
            body: template.body.clone(),
            placeholders,
            slots,
            unresolved,
            resolver,
        })
    }

    pub async fn merge(&self, template: &Template, record: &Record) -> Result<MergeOutcome> {
        Ok(self.prepare(template).await?.merge(record))
    }
}

#[derive(Debug, Clone)]
pub struct PreparedTemplate {
    template_id: String,
    body: String,
    placeholders: Vec<String>,
    slots: HashMap<String, Slot>,
    unresolved: Vec<String>,
    resolver: FieldResolver,
}

impl PreparedTemplate {
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Human-readable description of how `placeholder` will be filled.
    pub fn describe(&self, placeholder: &str) -> String {
        match self.slots.get(placeholder) {
            Some(Slot::Field { column }) => format!("field '{}'", column),
            Some(Slot::Block(block)) => format!(
                "block '{}' ({}, {} conditions, {} always-include)",
                block.id,
                block.output_type.as_str(),
                block.conditions.len(),
                block.always_include.len()
            ),
            Some(Slot::Unresolved) | None => "unresolved".to_string(),
        }
    }

    pub fn merge(&self, record: &Record) -> MergeOutcome {
        let view = self.resolver.view(record);
        let mut missing_fields = Vec::new();

        let content = substitute(&self.body, |placeholder| match self.slots.get(placeholder) {
            Some(Slot::Field { column }) => match self.resolver.resolve_in(&view, column) {
                Some(resolved) => field_value(column, &resolved.value),
                None => {
                    if !missing_fields.iter().any(|m| m == placeholder) {
                        missing_fields.push(placeholder.to_string());
                    }
                    String::new()
                }
            },
            Some(Slot::Block(block)) => {
                let items = collect_block(&self.resolver, &view, block);
                let headers = block
                    .value_header
                    .as_deref()
                    .map(TableHeaders::with_value_header)
                    .unwrap_or_default();
                render_with_headers(&items, &block.output_type, &headers)
            }
            Some(Slot::Unresolved) | None => String::new(),
        });

        MergeOutcome {
            content,
            unresolved: self.unresolved.clone(),
            missing_fields,
        }
    }
}
