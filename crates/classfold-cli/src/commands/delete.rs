//! Delete command - remove a dataset, a class or one sample.

use std::path::PathBuf;

use colored::Colorize;

use super::open_catalog;

pub fn run(
    bucket: String,
    dataset: String,
    class: Option<String>,
    sample: Option<String>,
    store_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = open_catalog(&store_dir)?;

    let message = match (class, sample) {
        (Some(class), Some(sample)) => {
            catalog.delete_sample(&bucket, &dataset, &class, &sample)?;
            format!("sample {}/{}/{}", dataset, class, sample)
        }
        (Some(class), None) => {
            let removed = catalog.delete_class(&bucket, &dataset, &class)?;
            format!("class {}/{} ({} objects)", dataset, class, removed)
        }
        (None, _) => {
            let removed = catalog.delete_dataset(&bucket, &dataset)?;
            format!("dataset {} ({} objects)", dataset, removed)
        }
    };

    println!("{} {}", "Deleted".red().bold(), message);
    Ok(())
}
