use anyhow::Result;
use contract_merge::domain::ports::ConfigProvider;
use contract_merge::{
    BulkMergePipeline, GenerationEngine, InMemoryBlockStore, InMemoryMappingRegistry,
    LocalStorage, MergeConfig, TemplateMerger,
};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const TEMPLATE: &str = "<h1>Offer for {{providerName}}</h1>\n<p>Base salary: {{ salary }}</p>\n{{fteBlock}}\n<footer>{{signature}}</footer>";

const RECORDS: &str = "name,clinicalFTE,administrativeFte,baseSalary,dynamicFields\n\
Dr. A,0.8,0.2,280000,\n\
Dr. B,0,0.5,,\"{\"\"DivisionChiefFTE\"\": \"\"0.3\"\"}\"\n\
Dr. A,0.4,0.1,150000,not json\n";

fn job_file(output_path: &str, include_report: bool) -> String {
    format!(
        r#"
[job]
name = "offer-letters"
version = "1.0.0"

[template]
id = "offer"
path = "offer.html"

[records]
path = "providers.csv"

[load]
output_path = "{}"
archive_name = "offers.zip"
filename_pattern = "{{template_id}}-{{name}}.html"
include_report = {}

[[blocks]]
id = "fte"
name = "FTE breakdown"
placeholder = "fteBlock"
outputType = "bullets"

[[blocks.conditions]]
field = "clinicalFTE"
operator = ">"
value = "0"
label = "Clinical FTE"

[[blocks.conditions]]
field = "divisionChiefFTE"
operator = ">"
value = "0"
label = "Division Chief FTE"

[[blocks.alwaysInclude]]
label = "Admin FTE"
valueField = "administrativeFte"

[[mappings]]
placeholder = "providerName"
type = "field"
column = "name"

[[mappings]]
placeholder = "salary"
type = "field"
column = "baseSalary"

[[mappings]]
placeholder = "fteBlock"
type = "dynamic"
blockId = "fte"
"#,
        output_path, include_report
    )
}

async fn write_job(temp_dir: &TempDir, include_report: bool) -> Result<MergeConfig> {
    let base = temp_dir.path();
    let output_path = base.join("out").to_string_lossy().replace('\\', "/");

    tokio::fs::write(base.join("offer.html"), TEMPLATE).await?;
    tokio::fs::write(base.join("providers.csv"), RECORDS).await?;
    let config_path = base.join("merge-job.toml");
    tokio::fs::write(&config_path, job_file(&output_path, include_report)).await?;

    let mut config = MergeConfig::from_file(&config_path)?;
    config.resolve_paths(base);
    Ok(config)
}

fn engine(
    config: MergeConfig,
) -> Result<
    GenerationEngine<
        BulkMergePipeline<LocalStorage, MergeConfig, InMemoryBlockStore, InMemoryMappingRegistry>,
    >,
> {
    let blocks = InMemoryBlockStore::new(config.load_blocks()?)?;
    let mappings =
        InMemoryMappingRegistry::from_entries(config.template_id(), config.mappings.clone());
    let merger = TemplateMerger::new(blocks, mappings).with_extension_key(config.extension_key());
    let storage = LocalStorage::new(config.output_path().to_string());
    Ok(GenerationEngine::new(BulkMergePipeline::new(
        storage, config, merger,
    )))
}

fn read_entry(archive: &mut zip::ZipArchive<std::fs::File>, name: &str) -> Result<String> {
    let mut content = String::new();
    archive.by_name(name)?.read_to_string(&mut content)?;
    Ok(content)
}

#[tokio::test]
async fn test_bulk_merge_writes_archive_with_reports() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = write_job(&temp_dir, true).await?;
    config.validate_config()?;

    let output_path = engine(config)?.run().await?;
    assert!(output_path.ends_with("out/offers.zip"));
    assert!(Path::new(&output_path).exists());

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&output_path)?)?;
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "merge_report.csv",
            "merge_report.json",
            "offer-Dr._A.html",
            "offer-Dr._A_2.html",
            "offer-Dr._B.html",
        ]
    );

    let first = read_entry(&mut archive, "offer-Dr._A.html")?;
    assert!(first.contains("<h1>Offer for Dr. A</h1>"));
    assert!(first.contains("Base salary: $280,000.00"));
    assert!(first.contains(
        "<ul><li><strong>Clinical FTE:</strong> 0.8</li><li><strong>Admin FTE:</strong> 0.2</li></ul>"
    ));
    assert!(first.contains("<footer></footer>"));

    let second = read_entry(&mut archive, "offer-Dr._B.html")?;
    assert!(second.contains("<li><strong>Division Chief FTE:</strong> 0.3</li>"));
    assert!(!second.contains("Clinical FTE"));
    assert!(second.contains("Base salary: </p>"));

    let third = read_entry(&mut archive, "offer-Dr._A_2.html")?;
    assert!(third.contains("Base salary: $150,000.00"));
    assert!(third.contains("<strong>Clinical FTE:</strong> 0.4"));

    let report: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "merge_report.json")?)?;
    assert_eq!(report["template_id"], "offer");
    assert_eq!(report["documents"], 3);
    assert_eq!(report["documents_with_warnings"], 3);
    assert_eq!(report["entries"][1]["file_name"], "offer-Dr._B.html");
    assert_eq!(report["entries"][1]["missing_fields"][0], "salary");
    assert_eq!(report["entries"][0]["unresolved"][0], "signature");

    let csv_report = read_entry(&mut archive, "merge_report.csv")?;
    assert_eq!(csv_report.lines().count(), 4);
    assert!(csv_report.contains("offer-Dr._B.html,1,signature,salary"));

    Ok(())
}

#[tokio::test]
async fn test_bulk_merge_without_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = write_job(&temp_dir, false).await?;

    let output_path = engine(config)?.run().await?;

    let archive = zip::ZipArchive::new(std::fs::File::open(&output_path)?)?;
    assert_eq!(archive.len(), 3);
    assert!(archive.file_names().all(|name| name.ends_with(".html")));
    Ok(())
}

#[tokio::test]
async fn test_missing_records_file_fails_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = write_job(&temp_dir, true).await?;
    config.records.path = temp_dir
        .path()
        .join("missing.csv")
        .to_string_lossy()
        .into_owned();

    let err = engine(config)?.run().await.unwrap_err();
    assert!(matches!(err, contract_merge::MergeError::IoError(_)));
    assert!(!temp_dir.path().join("out/offers.zip").exists());
    Ok(())
}
