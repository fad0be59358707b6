//! Bucket command - create or delete buckets.

use std::path::PathBuf;

use colored::Colorize;

use super::open_catalog;
use crate::cli::BucketAction;

pub fn run(action: BucketAction, store_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = open_catalog(&store_dir)?;

    match action {
        BucketAction::Create { name } => {
            if catalog.create_bucket(&name)? {
                println!("{} bucket {}", "Created".green().bold(), name.white().bold());
            } else {
                println!("Bucket {} already exists", name.white().bold());
            }
        }
        BucketAction::Delete { name } => {
            catalog.delete_bucket(&name)?;
            println!("{} bucket {}", "Deleted".red().bold(), name.white().bold());
        }
    }
    Ok(())
}
