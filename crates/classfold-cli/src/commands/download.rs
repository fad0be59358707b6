//! Download command - copy stored objects to a local directory.

use std::path::PathBuf;

use colored::Colorize;

use super::open_catalog;

pub fn run(
    bucket: String,
    dataset: String,
    class: Option<String>,
    dest: PathBuf,
    store_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = open_catalog(&store_dir)?;

    let count = match &class {
        Some(class) => catalog.download_class(&bucket, &dataset, class, &dest)?,
        None => catalog.download_dataset(&bucket, &dataset, &dest)?,
    };

    println!(
        "{} {} files to {}",
        "Downloaded".green().bold(),
        count,
        dest.display().to_string().white().bold()
    );
    Ok(())
}
