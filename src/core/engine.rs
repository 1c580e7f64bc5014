use crate::core::Pipeline;
use crate::utils::error::Result;

/// Drives a [`Pipeline`] through extract, transform and load.
pub struct GenerationEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> GenerationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting contract generation...");

        let records = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", records.len());

        let batch = self.pipeline.transform(records).await?;
        tracing::info!(
            "Generated {} documents for template '{}' ({} with warnings)",
            batch.documents.len(),
            batch.template_id,
            batch.documents_with_warnings()
        );

        let output_path = self.pipeline.load(batch).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
