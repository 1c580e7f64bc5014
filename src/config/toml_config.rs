use crate::core::resolver::DEFAULT_EXTENSION_KEY;
use crate::domain::model::{DynamicBlock, MappingEntry, Operator, OutputType, PlaceholderMapping};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MergeError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_unique, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_ARCHIVE_NAME: &str = "contracts.zip";
const DEFAULT_FILENAME_PATTERN: &str = "{name}.html";
const DEFAULT_NAME_FIELD: &str = "name";
const FILENAME_TOKENS: &[&str] = &["{name}", "{index}", "{template_id}", "{timestamp}"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// JSON array of blocks exported from the block store; merged with `blocks`.
    pub blocks_file: Option<String>,
    pub job: JobConfig,
    pub template: TemplateConfig,
    pub records: RecordsConfig,
    pub load: LoadConfig,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub blocks: Vec<DynamicBlock>,
    #[serde(default)]
    pub mappings: Vec<MappingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    pub path: String,
    pub extension_key: Option<String>,
    pub name_field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub archive_name: Option<String>,
    pub filename_pattern: Option<String>,
    pub include_report: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: Option<String>,
}

impl MergeConfig {
    /// Loads a job file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MergeError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MergeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Expands `${VAR}` references from the environment; unknown names are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MergeError::ConfigError {
            message: format!("Invalid environment pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Makes relative input paths relative to `base_dir` (the job file's folder).
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &str| -> String {
            let candidate = Path::new(path);
            if candidate.is_absolute() {
                path.to_string()
            } else {
                base_dir.join(candidate).to_string_lossy().into_owned()
            }
        };

        self.template.path = resolve(&self.template.path);
        self.records.path = resolve(&self.records.path);
        if let Some(blocks_file) = &self.blocks_file {
            self.blocks_file = Some(resolve(blocks_file));
        }
    }

    /// Inline blocks followed by the ones from `blocks_file`.
    pub fn load_blocks(&self) -> Result<Vec<DynamicBlock>> {
        let mut blocks = self.blocks.clone();
        if let Some(path) = &self.blocks_file {
            let content = std::fs::read_to_string(path)?;
            let from_file: Vec<DynamicBlock> =
                serde_json::from_str(&content).map_err(|e| MergeError::StoreError {
                    message: format!("Blocks file '{}' is not a valid block export: {}", path, e),
                })?;
            tracing::debug!("Loaded {} blocks from {}", from_file.len(), path);
            blocks.extend(from_file);
        }
        Ok(blocks)
    }

    pub fn validate_config(&self) -> Result<()> {
        for (field, value) in [
            ("template.path", &self.template.path),
            ("records.path", &self.records.path),
            ("load.output_path", &self.load.output_path),
        ] {
            if value.trim().is_empty() {
                return Err(MergeError::MissingConfigError {
                    field: field.to_string(),
                });
            }
        }

        validate_non_empty_string("job.name", &self.job.name)?;
        validate_non_empty_string("template.id", &self.template.id)?;

        validate_path("template.path", &self.template.path)?;
        validate_file_extension("template.path", &self.template.path, &["html", "htm"])?;
        validate_path("records.path", &self.records.path)?;
        validate_file_extension("records.path", &self.records.path, &["csv"])?;
        validate_path("load.output_path", &self.load.output_path)?;
        if let Some(blocks_file) = &self.blocks_file {
            validate_path("blocks_file", blocks_file)?;
            validate_file_extension("blocks_file", blocks_file, &["json"])?;
        }

        self.validate_load_settings()?;
        self.validate_blocks()?;
        self.validate_mappings()?;

        Ok(())
    }

    fn validate_load_settings(&self) -> Result<()> {
        let archive = self.archive_name();
        if !archive.ends_with(".zip") || archive.contains(['/', '\\']) {
            return Err(MergeError::InvalidConfigValueError {
                field: "load.archive_name".to_string(),
                value: archive.to_string(),
                reason: "Archive name must be a plain file name ending in .zip".to_string(),
            });
        }

        let pattern = self.filename_pattern();
        if pattern.contains(['/', '\\']) {
            return Err(MergeError::InvalidConfigValueError {
                field: "load.filename_pattern".to_string(),
                value: pattern.to_string(),
                reason: "Pattern must not contain path separators".to_string(),
            });
        }
        if !FILENAME_TOKENS.iter().any(|token| pattern.contains(*token)) {
            return Err(MergeError::InvalidConfigValueError {
                field: "load.filename_pattern".to_string(),
                value: pattern.to_string(),
                reason: format!(
                    "Pattern must contain at least one of: {}",
                    FILENAME_TOKENS.join(", ")
                ),
            });
        }

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            if !["compact", "json"].contains(&format) {
                return Err(MergeError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }

    fn validate_blocks(&self) -> Result<()> {
        for block in &self.blocks {
            validate_non_empty_string("blocks.id", &block.id)?;
            validate_non_empty_string("blocks.placeholder", &block.placeholder)?;

            if let OutputType::Other(raw) = &block.output_type {
                tracing::warn!(
                    "Block '{}' has unknown output type '{}'; it will render as bullets",
                    block.id,
                    raw
                );
            }
            for condition in &block.conditions {
                if let Operator::Unknown(raw) = &condition.operator {
                    tracing::warn!(
                        "Block '{}' condition on '{}' uses unknown operator '{}'; it never matches",
                        block.id,
                        condition.field,
                        raw
                    );
                }
            }
        }

        validate_unique("blocks.id", self.blocks.iter().map(|b| b.id.as_str()))?;
        validate_unique(
            "blocks.placeholder",
            self.blocks.iter().map(|b| b.placeholder.as_str()),
        )?;
        Ok(())
    }

    fn validate_mappings(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.mappings {
            validate_non_empty_string("mappings.placeholder", &entry.placeholder)?;
            let template_id = entry.template_id.as_deref().unwrap_or(&self.template.id);
            if !seen.insert((template_id, entry.placeholder.as_str())) {
                return Err(MergeError::InvalidConfigValueError {
                    field: "mappings.placeholder".to_string(),
                    value: entry.placeholder.clone(),
                    reason: format!("Mapped more than once for template '{}'", template_id),
                });
            }

            match &entry.mapping {
                PlaceholderMapping::Field { column } => {
                    validate_non_empty_string("mappings.column", column)?;
                }
                PlaceholderMapping::Dynamic { block_id } => {
                    // Blocks from blocks_file are only known after loading.
                    if self.blocks_file.is_none() && !self.blocks.iter().any(|b| &b.id == block_id)
                    {
                        return Err(MergeError::InvalidConfigValueError {
                            field: "mappings.blockId".to_string(),
                            value: block_id.clone(),
                            reason: "No block with this id is defined".to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn json_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|f| f == "json")
            .unwrap_or(false)
    }
}

impl ConfigProvider for MergeConfig {
    fn template_id(&self) -> &str {
        &self.template.id
    }

    fn template_path(&self) -> &str {
        &self.template.path
    }

    fn records_path(&self) -> &str {
        &self.records.path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn archive_name(&self) -> &str {
        self.load
            .archive_name
            .as_deref()
            .unwrap_or(DEFAULT_ARCHIVE_NAME)
    }

    fn filename_pattern(&self) -> &str {
        self.load
            .filename_pattern
            .as_deref()
            .unwrap_or(DEFAULT_FILENAME_PATTERN)
    }

    fn name_field(&self) -> &str {
        self.records
            .name_field
            .as_deref()
            .unwrap_or(DEFAULT_NAME_FIELD)
    }

    fn extension_key(&self) -> &str {
        self.records
            .extension_key
            .as_deref()
            .unwrap_or(DEFAULT_EXTENSION_KEY)
    }

    fn include_report(&self) -> bool {
        self.load.include_report.unwrap_or(true)
    }
}

impl Validate for MergeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[job]
name = "offer-letters"
description = "Annual offer letters"
version = "1.0.0"

[template]
id = "offer"
path = "templates/offer.html"

[records]
path = "providers.csv"

[load]
output_path = "./out"

[[blocks]]
id = "fte"
name = "FTE breakdown"
placeholder = "fteBlock"
outputType = "table"
valueHeader = "FTE"

[[blocks.conditions]]
field = "clinicalFTE"
operator = ">"
value = 0
label = "Clinical FTE"

[[blocks.alwaysInclude]]
label = "Admin FTE"
valueField = "administrativeFte"

[[mappings]]
placeholder = "providerName"
type = "field"
column = "name"

[[mappings]]
placeholder = "fteBlock"
type = "dynamic"
blockId = "fte"
"#;

    #[test]
    fn test_parse_basic_job() {
        let config = MergeConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.job.name, "offer-letters");
        assert_eq!(config.template_id(), "offer");
        assert_eq!(config.blocks.len(), 1);
        assert_eq!(config.blocks[0].output_type, OutputType::Table);
        assert_eq!(config.blocks[0].conditions[0].value, "0");
        assert_eq!(config.blocks[0].value_header.as_deref(), Some("FTE"));
        assert_eq!(
            config.mappings[1].mapping,
            PlaceholderMapping::Dynamic {
                block_id: "fte".to_string()
            }
        );
        assert_eq!(config.archive_name(), "contracts.zip");
        assert_eq!(config.filename_pattern(), "{name}.html");
        assert_eq!(config.extension_key(), "dynamicFields");
        assert!(config.include_report());
        assert!(!config.json_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CONTRACT_MERGE_TEST_RECORDS", "batch-7.csv");

        let content = BASIC.replace("providers.csv", "${CONTRACT_MERGE_TEST_RECORDS}");
        let config = MergeConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.records_path(), "batch-7.csv");

        std::env::remove_var("CONTRACT_MERGE_TEST_RECORDS");
    }

    #[test]
    fn test_mapping_to_unknown_block_fails_validation() {
        let content = BASIC.replace("blockId = \"fte\"", "blockId = \"salary\"");
        let config = MergeConfig::from_toml_str(&content).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("salary"));
    }

    #[test]
    fn test_duplicate_block_placeholder_fails_validation() {
        let content = BASIC.replacen(
            "[[mappings]]",
            "[[blocks]]\nid = \"fte-2\"\nplaceholder = \"fteBlock\"\noutputType = \"list\"\n\n[[mappings]]",
            1,
        );
        let config = MergeConfig::from_toml_str(&content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_paths_fail_validation() {
        let docx = MergeConfig::from_toml_str(&BASIC.replace("offer.html", "offer.docx")).unwrap();
        assert!(docx.validate().is_err());

        let mut nested = MergeConfig::from_toml_str(BASIC).unwrap();
        nested.load.archive_name = Some("../up.zip".to_string());
        assert!(nested.validate().is_err());

        let mut constant = MergeConfig::from_toml_str(BASIC).unwrap();
        constant.load.filename_pattern = Some("contract.html".to_string());
        assert!(constant.validate().is_err());
    }

    #[test]
    fn test_resolve_paths_and_blocks_file() {
        let mut blocks_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        blocks_file
            .write_all(
                br#"[{"id": "bonus", "placeholder": "bonusBlock", "outputType": "paragraph",
                      "alwaysInclude": [{"label": "Bonus", "valueField": "signingBonus"}]}]"#,
            )
            .unwrap();

        let content = format!(
            "blocks_file = \"{}\"\n{}",
            blocks_file.path().display().to_string().replace('\\', "/"),
            BASIC
        );
        let mut config = MergeConfig::from_toml_str(&content).unwrap();
        config.resolve_paths(Path::new("/jobs/2026"));

        assert!(config.template_path().ends_with("templates/offer.html"));
        assert!(Path::new(config.template_path()).is_absolute());

        let blocks = config.load_blocks().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].id, "bonus");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = MergeConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job.name, "offer-letters");
    }

    #[test]
    fn test_empty_required_path_is_missing_config() {
        let mut config = MergeConfig::from_toml_str(BASIC).unwrap();
        config.records.path = "  ".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, MergeError::MissingConfigError { ref field } if field == "records.path"));
    }

    #[test]
    fn test_malformed_blocks_file_is_store_error() {
        let mut blocks_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        blocks_file.write_all(b"{\"id\": \"not-an-array\"}").unwrap();

        let mut config = MergeConfig::from_toml_str(BASIC).unwrap();
        config.blocks_file = Some(blocks_file.path().display().to_string());

        let err = config.load_blocks().unwrap_err();
        assert!(matches!(err, MergeError::StoreError { .. }));
        assert!(err.to_string().contains("not a valid block export"));
    }
}
