use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One provider row. Values are scalars; the extension-field blob lives under
/// a reserved key and is parsed lazily by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a flat JSON object. Anything else is rejected.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(obj) => Some(Self {
                data: obj.into_iter().collect(),
            }),
            _ => None,
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Gt,
    Gte,
    Eq,
    Ne,
    Lt,
    Lte,
    /// Kept verbatim so a stored rule round-trips; never matches.
    Unknown(String),
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.trim() {
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "=" | "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            _ => Operator::Unknown(s),
        }
    }
}

impl From<&str> for Operator {
    fn from(s: &str) -> Self {
        Operator::from(s.to_string())
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Unknown(raw) => raw.as_str(),
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub field: String,
    pub operator: Operator,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default)]
    pub label: String,
}

impl Condition {
    pub fn new(field: &str, operator: impl Into<Operator>, value: &str, label: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.into(),
            value: value.to_string(),
            label: label.to_string(),
        }
    }

    /// Empty field or label means the rule can never contribute an item.
    pub fn is_inert(&self) -> bool {
        self.field.is_empty() || self.label.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlwaysIncludeItem {
    #[serde(default)]
    pub label: String,
    #[serde(default, alias = "value_field")]
    pub value_field: String,
}

impl AlwaysIncludeItem {
    pub fn new(label: &str, value_field: &str) -> Self {
        Self {
            label: label.to_string(),
            value_field: value_field.to_string(),
        }
    }
}

/// `bullets` and `list` currently render the same markup; they stay separate
/// so stored blocks keep the value the author picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputType {
    #[default]
    Bullets,
    List,
    Table,
    TableNoBorders,
    Paragraph,
    Other(String),
}

impl From<String> for OutputType {
    fn from(s: String) -> Self {
        match s.trim() {
            "bullets" => OutputType::Bullets,
            "list" => OutputType::List,
            "table" => OutputType::Table,
            "table-no-borders" => OutputType::TableNoBorders,
            "paragraph" => OutputType::Paragraph,
            _ => OutputType::Other(s),
        }
    }
}

impl From<&str> for OutputType {
    fn from(s: &str) -> Self {
        OutputType::from(s.to_string())
    }
}

impl From<OutputType> for String {
    fn from(output_type: OutputType) -> Self {
        output_type.as_str().to_string()
    }
}

impl OutputType {
    pub fn as_str(&self) -> &str {
        match self {
            OutputType::Bullets => "bullets",
            OutputType::List => "list",
            OutputType::Table => "table",
            OutputType::TableNoBorders => "table-no-borders",
            OutputType::Paragraph => "paragraph",
            OutputType::Other(raw) => raw.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicBlock {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub placeholder: String,
    #[serde(default, alias = "output_type")]
    pub output_type: OutputType,
    /// Free-form authoring template; stored but not used when rendering.
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, alias = "always_include")]
    pub always_include: Vec<AlwaysIncludeItem>,
    #[serde(default, alias = "value_header", skip_serializing_if = "Option::is_none")]
    pub value_header: Option<String>,
}

impl DynamicBlock {
    pub fn new(id: &str, placeholder: &str, output_type: impl Into<OutputType>) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            placeholder: placeholder.to_string(),
            output_type: output_type.into(),
            format: String::new(),
            conditions: Vec::new(),
            always_include: Vec::new(),
            value_header: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_always_include(mut self, item: AlwaysIncludeItem) -> Self {
        self.always_include.push(item);
        self
    }

    /// Every field name the block may look up, in authoring order.
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .map(|c| c.field.as_str())
            .chain(self.always_include.iter().map(|a| a.value_field.as_str()))
            .filter(|f| !f.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlaceholderMapping {
    Field {
        column: String,
    },
    Dynamic {
        #[serde(rename = "blockId", alias = "block_id")]
        block_id: String,
    },
}

/// A mapping as it appears in a job file: which template and placeholder it
/// applies to, plus the mapping itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    #[serde(default, alias = "templateId", skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub placeholder: String,
    #[serde(flatten)]
    pub mapping: PlaceholderMapping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    pub body: String,
}

impl Template {
    pub fn new(id: &str, body: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            body: body.into(),
        }
    }
}

/// One line of collected block content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedItem {
    pub label: String,
    pub value: String,
}

impl RenderedItem {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub content: String,
    /// Placeholders with no mapping, or mapped to a block the store lacks.
    pub unresolved: Vec<String>,
    /// Field-mapped placeholders whose column had no value in the record.
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    pub file_name: String,
    pub record_index: usize,
    #[serde(skip)]
    pub content: String,
    pub unresolved: Vec<String>,
    pub missing_fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationBatch {
    pub template_id: String,
    pub documents: Vec<GeneratedDocument>,
}

impl GenerationBatch {
    pub fn documents_with_warnings(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| !d.unresolved.is_empty() || !d.missing_fields.is_empty())
            .count()
    }
}

/// Accepts `value = 0` as well as `value = "0"` in job files.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing_keeps_unknown() {
        assert_eq!(Operator::from(">="), Operator::Gte);
        assert_eq!(Operator::from("=="), Operator::Eq);
        assert_eq!(Operator::from("~"), Operator::Unknown("~".to_string()));
    }

    #[test]
    fn test_block_deserializes_from_camel_case_json() {
        let block: DynamicBlock = serde_json::from_value(serde_json::json!({
            "id": "fte-breakdown",
            "name": "FTE breakdown",
            "placeholder": "fteBlock",
            "outputType": "table-no-borders",
            "format": "",
            "conditions": [
                {"field": "clinicalFTE", "operator": ">", "value": 0, "label": "Clinical"}
            ],
            "alwaysInclude": [{"label": "Admin", "valueField": "administrativeFte"}]
        }))
        .unwrap();

        assert_eq!(block.output_type, OutputType::TableNoBorders);
        assert_eq!(block.conditions[0].value, "0");
        assert_eq!(block.conditions[0].operator, Operator::Gt);
        assert_eq!(block.always_include[0].value_field, "administrativeFte");
        assert_eq!(
            block.referenced_fields().collect::<Vec<_>>(),
            vec!["clinicalFTE", "administrativeFte"]
        );
    }

    #[test]
    fn test_unknown_output_type_round_trips() {
        let block: DynamicBlock = serde_json::from_value(serde_json::json!({
            "id": "b", "placeholder": "p", "outputType": "numbered"
        }))
        .unwrap();
        assert_eq!(block.output_type, OutputType::Other("numbered".to_string()));

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["outputType"], "numbered");
    }

    #[test]
    fn test_placeholder_mapping_is_tagged() {
        let field: PlaceholderMapping =
            serde_json::from_value(serde_json::json!({"type": "field", "column": "name"})).unwrap();
        assert_eq!(
            field,
            PlaceholderMapping::Field {
                column: "name".to_string()
            }
        );

        let dynamic: PlaceholderMapping =
            serde_json::from_value(serde_json::json!({"type": "dynamic", "blockId": "b1"}))
                .unwrap();
        assert_eq!(
            dynamic,
            PlaceholderMapping::Dynamic {
                block_id: "b1".to_string()
            }
        );
    }

    #[test]
    fn test_record_from_json_requires_object() {
        let record = Record::from_json(serde_json::json!({"name": "Dr. A"})).unwrap();
        assert_eq!(record.get("name").unwrap(), "Dr. A");
        assert!(Record::from_json(serde_json::json!([1, 2])).is_none());
    }
}
