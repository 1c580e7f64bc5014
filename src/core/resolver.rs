//! Field lookup against records whose schema changes from upload to upload.
//!
//! A logical field name maps to an ordered list of [`FieldAlias`] candidates:
//! the exact top-level key first, then spellings inside the extension blob,
//! then heuristic top-level spellings. Extension spellings always outrank the
//! top-level heuristics, so a value the uploader put in the extension data
//! wins over a guessed column.

use crate::domain::model::Record;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_EXTENSION_KEY: &str = "dynamicFields";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Direct,
    Extension,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAlias {
    pub source: FieldSource,
    pub key: String,
}

impl FieldAlias {
    pub fn direct(key: impl Into<String>) -> Self {
        Self {
            source: FieldSource::Direct,
            key: key.into(),
        }
    }

    pub fn extension(key: impl Into<String>) -> Self {
        Self {
            source: FieldSource::Extension,
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: Value,
    pub matched_name: String,
    pub source: FieldSource,
}

/// Candidate spellings for `field`, in lookup order, without duplicates.
pub fn derive_aliases(field: &str) -> Vec<FieldAlias> {
    let capitalized = capitalize_first(field);

    let mut candidates = vec![
        FieldAlias::direct(field),
        FieldAlias::extension(field),
        FieldAlias::extension(capitalized.as_str()),
    ];
    if let Some(stem) = strip_suffix_ignore_case(&capitalized, "fte") {
        candidates.push(FieldAlias::extension(format!("{stem}FTE")));
    }
    if let Some(stem) = field.strip_suffix("Fte") {
        candidates.push(FieldAlias::extension(format!("{stem}FTE")));
    }

    candidates.push(FieldAlias::direct(field.to_lowercase()));
    if let Some(stem) = field.strip_suffix("FTE") {
        candidates.push(FieldAlias::direct(format!("{stem}Fte")));
        candidates.push(FieldAlias::direct(stem));
    }
    if let Some(stem) = field.strip_suffix("Fte") {
        candidates.push(FieldAlias::direct(stem));
    }

    let mut seen = HashSet::new();
    candidates.retain(|alias| !alias.key.is_empty() && seen.insert(alias.clone()));
    candidates
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    let tail = s.get(split..)?;
    if tail.eq_ignore_ascii_case(suffix) {
        Some(&s[..split])
    } else {
        None
    }
}

/// Declared alias lists, computed once per logical field.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, Vec<FieldAlias>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, field: &str) {
        if field.is_empty() {
            return;
        }
        self.entries
            .entry(field.to_string())
            .or_insert_with(|| derive_aliases(field));
    }

    pub fn get(&self, field: &str) -> Option<&[FieldAlias]> {
        self.entries.get(field).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A record with its extension blob parsed once.
#[derive(Debug, Clone)]
pub struct RecordView<'a> {
    record: &'a Record,
    extension: Option<Map<String, Value>>,
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a Record, extension_key: &str) -> Self {
        let extension = record.data.get(extension_key).and_then(parse_extension);
        Self { record, extension }
    }

    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }

    /// Direct nulls count as absent. An extension key holding null is still
    /// present and ends the search.
    fn lookup(&self, alias: &FieldAlias) -> Option<&Value> {
        match alias.source {
            FieldSource::Direct => self.record.data.get(&alias.key).filter(|v| !v.is_null()),
            FieldSource::Extension => self.extension.as_ref()?.get(&alias.key),
        }
    }
}

fn parse_extension(raw: &Value) -> Option<Map<String, Value>> {
    match raw {
        Value::Object(map) => Some(map.clone()),
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => None,
            Err(e) => {
                tracing::trace!("Ignoring malformed extension data: {}", e);
                None
            }
        },
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct FieldResolver {
    extension_key: String,
    aliases: AliasTable,
}

impl Default for FieldResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldResolver {
    pub fn new() -> Self {
        Self {
            extension_key: DEFAULT_EXTENSION_KEY.to_string(),
            aliases: AliasTable::new(),
        }
    }

    pub fn with_extension_key(mut self, key: &str) -> Self {
        self.extension_key = key.to_string();
        self
    }

    /// Precomputes alias lists for fields known ahead of time.
    pub fn with_fields<'a, I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for field in fields {
            self.aliases.declare(field);
        }
        self
    }

    pub fn extension_key(&self) -> &str {
        &self.extension_key
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn view<'a>(&self, record: &'a Record) -> RecordView<'a> {
        RecordView::new(record, &self.extension_key)
    }

    pub fn resolve(&self, record: &Record, field: &str) -> Option<Resolution> {
        self.resolve_in(&self.view(record), field)
    }

    pub fn resolve_in(&self, view: &RecordView<'_>, field: &str) -> Option<Resolution> {
        if field.is_empty() {
            return None;
        }

        let derived;
        let aliases = match self.aliases.get(field) {
            Some(aliases) => aliases,
            None => {
                derived = derive_aliases(field);
                derived.as_slice()
            }
        };

        let (alias, value) = aliases
            .iter()
            .find_map(|alias| view.lookup(alias).map(|value| (alias, value)))?;
        if value.is_null() {
            return None;
        }

        Some(Resolution {
            value: value.clone(),
            matched_name: alias.key.clone(),
            source: alias.source,
        })
    }
}

/// Resolves `field` with the default extension key.
pub fn resolve(record: &Record, field: &str) -> Option<Resolution> {
    FieldResolver::new().resolve(record, field)
}
