//! File command - single files outside any dataset.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;

use super::open_catalog;
use crate::cli::FileAction;

pub fn run(action: FileAction, store_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = open_catalog(&store_dir)?;

    match action {
        FileAction::Upload {
            bucket,
            path,
            metadata,
        } => {
            let name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .ok_or_else(|| format!("Not a file: {}", path.display()))?;
            let data = fs::read(&path)?;
            let upload = catalog.upload_file(&bucket, &name, &data, metadata.as_deref())?;
            let verb = if upload.overwritten {
                "Overwrote".yellow().bold()
            } else {
                "Uploaded".green().bold()
            };
            println!(
                "{} {} ({} bytes) in bucket {}",
                verb,
                name.white().bold(),
                upload.object.size,
                bucket
            );
        }
        FileAction::Download { bucket, name, dest } => {
            let target = catalog.download_file(&bucket, &name, &dest)?;
            println!("{} {}", "Downloaded".green().bold(), target.display());
        }
        FileAction::Delete { bucket, name } => {
            catalog.delete_file(&bucket, &name)?;
            println!("{} file {}", "Deleted".red().bold(), name.white().bold());
        }
    }
    Ok(())
}
