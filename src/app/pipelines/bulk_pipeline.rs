use crate::adapters::csv_records::parse_records;
use crate::core::format::plain_value;
use crate::core::merge::TemplateMerger;
use crate::domain::model::{GeneratedDocument, GenerationBatch, Record, Template};
use crate::domain::ports::{BlockStore, ConfigProvider, MappingRegistry, Pipeline, Storage};
use crate::utils::error::{MergeError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

const REPORT_JSON: &str = "merge_report.json";
const REPORT_CSV: &str = "merge_report.csv";

/// Reads provider records, merges each one into the configured template and
/// packs the documents into a single archive.
pub struct BulkMergePipeline<S: Storage, C: ConfigProvider, B: BlockStore, M: MappingRegistry> {
    storage: S,
    config: C,
    merger: TemplateMerger<B, M>,
}

impl<S, C, B, M> BulkMergePipeline<S, C, B, M>
where
    S: Storage,
    C: ConfigProvider,
    B: BlockStore,
    M: MappingRegistry,
{
    pub fn new(storage: S, config: C, merger: TemplateMerger<B, M>) -> Self {
        Self {
            storage,
            config,
            merger,
        }
    }

    async fn load_template(&self) -> Result<Template> {
        let bytes = self.storage.read_file(self.config.template_path()).await?;
        let body = String::from_utf8(bytes).map_err(|e| MergeError::ValidationError {
            message: format!(
                "Template '{}' is not valid UTF-8: {}",
                self.config.template_path(),
                e
            ),
        })?;
        Ok(Template::new(self.config.template_id(), body))
    }

    fn file_name_for(&self, record: &Record, index: usize, timestamp: &str) -> String {
        let name = record
            .get(self.config.name_field())
            .map(plain_value)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("record_{}", index + 1));

        self.config
            .filename_pattern()
            .replace("{name}", &sanitize_file_component(&name))
            .replace("{index}", &(index + 1).to_string())
            .replace(
                "{template_id}",
                &sanitize_file_component(self.config.template_id()),
            )
            .replace("{timestamp}", timestamp)
    }
}

fn sanitize_file_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// Appends `_2`, `_3`, ... before the extension until the name is free.
fn unique_file_name(taken: &mut HashSet<String>, candidate: String) -> String {
    if taken.insert(candidate.clone()) {
        return candidate;
    }

    let path = Path::new(&candidate);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| candidate.clone());
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 2;
    loop {
        let next = format!("{}_{}{}", stem, n, extension);
        if taken.insert(next.clone()) {
            return next;
        }
        n += 1;
    }
}

#[derive(Serialize)]
struct MergeReport<'a> {
    template_id: &'a str,
    generated_at: String,
    documents: usize,
    documents_with_warnings: usize,
    entries: &'a [GeneratedDocument],
}

fn report_csv(documents: &[GeneratedDocument]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["file_name", "record_index", "unresolved", "missing_fields"])?;
    for doc in documents {
        writer.write_record([
            doc.file_name.as_str(),
            &doc.record_index.to_string(),
            &doc.unresolved.join(";"),
            &doc.missing_fields.join(";"),
        ])?;
    }
    writer.into_inner().map_err(|e| MergeError::ProcessingError {
        message: format!("Failed to finish report CSV: {}", e),
    })
}

#[async_trait::async_trait]
impl<S, C, B, M> Pipeline for BulkMergePipeline<S, C, B, M>
where
    S: Storage,
    C: ConfigProvider,
    B: BlockStore,
    M: MappingRegistry,
{
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading records from: {}", self.config.records_path());
        let bytes = self.storage.read_file(self.config.records_path()).await?;
        let records = parse_records(&bytes, self.config.extension_key())?;

        if records.is_empty() {
            tracing::warn!("No records found in {}", self.config.records_path());
        }
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<GenerationBatch> {
        let template = self.load_template().await?;
        let prepared = self.merger.prepare(&template).await?;

        if !prepared.unresolved().is_empty() {
            tracing::warn!(
                "Template '{}' has {} unresolved placeholders: {}",
                template.id,
                prepared.unresolved().len(),
                prepared.unresolved().join(", ")
            );
        }

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut taken = HashSet::new();
        if self.config.include_report() {
            taken.insert(REPORT_JSON.to_string());
            taken.insert(REPORT_CSV.to_string());
        }
        let mut documents = Vec::with_capacity(data.len());

        for (index, record) in data.iter().enumerate() {
            let outcome = prepared.merge(record);
            let file_name =
                unique_file_name(&mut taken, self.file_name_for(record, index, &timestamp));

            if !outcome.missing_fields.is_empty() {
                tracing::debug!(
                    "{}: no value for {}",
                    file_name,
                    outcome.missing_fields.join(", ")
                );
            }

            documents.push(GeneratedDocument {
                file_name,
                record_index: index,
                content: outcome.content,
                unresolved: outcome.unresolved,
                missing_fields: outcome.missing_fields,
            });
        }

        Ok(GenerationBatch {
            template_id: template.id,
            documents,
        })
    }

    async fn load(&self, batch: GenerationBatch) -> Result<String> {
        let archive_name = self.config.archive_name();
        let output_path = format!("{}/{}", self.config.output_path(), archive_name);

        tracing::debug!(
            "Creating archive with {} documents (report: {})",
            batch.documents.len(),
            self.config.include_report()
        );

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            for doc in &batch.documents {
                zip.start_file::<_, ()>(doc.file_name.as_str(), FileOptions::default())?;
                zip.write_all(doc.content.as_bytes())?;
            }

            if self.config.include_report() {
                let report = MergeReport {
                    template_id: &batch.template_id,
                    generated_at: chrono::Utc::now().to_rfc3339(),
                    documents: batch.documents.len(),
                    documents_with_warnings: batch.documents_with_warnings(),
                    entries: &batch.documents,
                };
                zip.start_file::<_, ()>(REPORT_JSON, FileOptions::default())?;
                zip.write_all(serde_json::to_string_pretty(&report)?.as_bytes())?;

                zip.start_file::<_, ()>(REPORT_CSV, FileOptions::default())?;
                zip.write_all(&report_csv(&batch.documents)?)?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing archive ({} bytes) to storage", zip_data.len());
        self.storage.write_file(archive_name, &zip_data).await?;

        Ok(output_path)
    }
}
