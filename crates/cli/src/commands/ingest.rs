//! `ragchat ingest <dir>` — Index every file in a directory.

use ragchat_config::AppConfig;
use ragchat_rag::{Chunker, IngestionPipeline};
use std::path::Path;

pub async fn run(config: AppConfig, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (embedder, index) = super::rag_clients(&config).await?;
    let chunker = Chunker::from_config(&config.rag)?;
    let pipeline = IngestionPipeline::new(chunker, embedder, index.clone());

    let report = pipeline.ingest_dir(dir).await?;

    println!(
        "Indexed {} document(s), {} chunk(s) from {}",
        report.documents,
        report.chunks,
        dir.display()
    );
    println!("Index now holds {} chunk(s) [{}]", index.count().await?, index.name());
    Ok(())
}
