//! Ingest command - validate an archive and store its dataset.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use classfold::{IngestRequest, Ingestor, LocalObjectStore, ObjectStore, ValidationConfig};

pub fn run(
    archive: PathBuf,
    bucket: String,
    dataset_name: Option<String>,
    create_bucket: bool,
    classes: usize,
    files_per_class: usize,
    store_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(LocalObjectStore::open(&store_dir)?);
    if create_bucket && store.create_bucket(&bucket)? {
        println!("{} bucket {}", "Created".green(), bucket.white().bold());
    }

    let file_name = archive
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Not a file: {}", archive.display()))?;
    let payload = fs::read(&archive)
        .map_err(|e| format!("Failed to read {}: {}", archive.display(), e))?;

    let mut request = IngestRequest::new(bucket, file_name, payload)
        .with_config(ValidationConfig::new(classes, files_per_class)?);
    if let Some(name) = dataset_name {
        request = request.with_dataset_name(name);
    }

    let report = Ingestor::new(store).ingest_archive(request)?;

    println!(
        "{} {} → {}/{}",
        "✓".green().bold(),
        archive.display(),
        report.bucket.white().bold(),
        report.dataset.white().bold()
    );
    println!("  {}", report.validation.summary());
    println!("  Uploaded {} objects", report.objects_uploaded.to_string().green());
    Ok(())
}
