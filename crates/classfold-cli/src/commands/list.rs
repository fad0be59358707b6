//! List command - browse datasets, classes and samples.

use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use super::open_catalog;

pub fn run(
    bucket: String,
    dataset: Option<String>,
    class: Option<String>,
    store_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = open_catalog(&store_dir)?;

    match (dataset, class) {
        (Some(dataset), Some(class)) => {
            let samples = catalog.list_samples(&bucket, &dataset, &class)?;
            println!(
                "{} {}/{} ({} samples)",
                "Class".cyan().bold(),
                dataset,
                class.white().bold(),
                samples.len()
            );
            for sample in samples {
                let name = sample.key.rsplit('/').next().unwrap_or(&sample.key);
                println!(
                    "  {:<16} {:>10} bytes  {}",
                    name,
                    sample.size,
                    format_modified(sample.last_modified).dimmed()
                );
            }
        }
        (Some(dataset), None) => {
            let classes = catalog.list_classes(&bucket, &dataset)?;
            println!("{} {}", "Classes in".cyan().bold(), dataset.white().bold());
            for class in classes {
                println!("  {}", class);
            }
        }
        (None, _) => {
            let datasets = catalog.list_datasets(&bucket)?;
            println!("{} {}", "Datasets in".cyan().bold(), bucket.white().bold());
            if datasets.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for dataset in datasets {
                println!("  {}", dataset);
            }
        }
    }
    Ok(())
}

fn format_modified(modified: Option<DateTime<Utc>>) -> String {
    match modified {
        Some(ts) => ts
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}
