//! Command handlers.

use super::TransformArgs;
use daguerre::{AssetService, ImageEngine, StatsReporter};
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Upload a file and print its identifier.
#[tracing::instrument(skip(service), fields(file = %file.display()))]
pub async fn ingest_file<E: ImageEngine>(
    service: &AssetService<E>,
    file: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = tokio::fs::File::open(file).await?;
    let id = service.ingest(ReaderStream::new(handle)).await?;
    println!("{}", id);
    Ok(())
}

/// Fetch an asset into `output` and report what was written.
#[tracing::instrument(skip(service, transform), fields(output = %output.display()))]
pub async fn read_to_file<E: ImageEngine>(
    service: &AssetService<E>,
    id: &str,
    transform: &TransformArgs,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let rendition = service.read_query(id, transform.params()).await?;
    tokio::fs::write(output, rendition.bytes()).await?;

    println!(
        "{} ({} bytes{}) -> {}",
        rendition.content_type(),
        rendition.bytes().len(),
        rendition
            .extension()
            .as_deref()
            .map(|ext| format!(", {}", ext))
            .unwrap_or_default(),
        output.display()
    );
    Ok(())
}

/// Print a stats snapshot as pretty JSON.
pub fn print_stats<E: ImageEngine>(
    reporter: &StatsReporter<E>,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = reporter.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
