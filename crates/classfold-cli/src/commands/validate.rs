//! Validate command - check an archive without storing it.

use std::path::PathBuf;

use colored::Colorize;
use classfold::archive::{ensure_zip_name, extract_zip};
use classfold::{
    ArchiveLayout, DatasetValidator, LocalTree, StagingArea, StagingStats, ValidationConfig,
    ValidationReport,
};
use tracing::warn;

use crate::cli::OutputFormat;

pub fn run(
    archive: PathBuf,
    classes: usize,
    files_per_class: usize,
    format: OutputFormat,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let file_name = archive
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    ensure_zip_name(&file_name)?;
    if !archive.is_file() {
        return Err(format!("Archive not found: {}", archive.display()).into());
    }
    let config = ValidationConfig::new(classes, files_per_class)?;

    // The archive is expanded into scratch space; flat datasets are
    // normalized there and the original archive is never touched.
    let stats = StagingStats::new();
    let staging = StagingArea::acquire(&stats, None)?;
    let extracted = extract_zip(&archive, staging.path())?;
    if verbose {
        eprintln!("Extracted {} files from {}", extracted, archive.display());
    }

    let layout = ArchiveLayout::new(staging.path());
    let verdict = DatasetValidator::with_config(config).validate(&mut LocalTree::new(), &layout);
    let released = staging.release();

    match settle(verdict, released) {
        Ok(report) => {
            print_report(&report, &format)?;
            Ok(())
        }
        Err(e) => {
            let code = e.as_violation().map(|v| v.code()).unwrap_or("error");
            match format {
                OutputFormat::Json => {
                    let body = serde_json::json!({
                        "valid": false,
                        "error": code,
                        "message": e.to_string(),
                    });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                OutputFormat::Text | OutputFormat::Csv => {
                    println!(
                        "{} {} [{}]",
                        "✗".red().bold(),
                        file_name.white().bold(),
                        code.red()
                    );
                }
            }
            Err(e.into())
        }
    }
}

/// The validation outcome wins; a cleanup failure only surfaces when the
/// archive itself was accepted.
fn settle(
    verdict: classfold::Result<ValidationReport>,
    released: classfold::Result<()>,
) -> classfold::Result<ValidationReport> {
    if let (Err(_), Err(cleanup)) = (&verdict, &released) {
        warn!(error = %cleanup, "failed to release staging area");
    }
    verdict.and_then(|report| released.map(|()| report))
}

fn print_report(
    report: &ValidationReport,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Csv => {
            report.write_csv(std::io::stdout())?;
        }
        OutputFormat::Text => {
            println!(
                "{} {} ({} mode)",
                "✓".green().bold(),
                report.dataset.white().bold(),
                report.mode.name().cyan()
            );
            println!();
            println!("{}", "Classes:".yellow().bold());
            for (class, count) in &report.classes {
                println!("  {:<12} {}", class, count.to_string().green());
            }
            println!();
            println!(
                "Total: {} files in {} classes",
                report.total_files.to_string().white().bold(),
                report.classes.len()
            );
            if report.files_renamed + report.files_moved > 0 {
                println!(
                    "Normalized: {} renamed, {} moved into class folders",
                    report.files_renamed, report.files_moved
                );
            }
        }
    }
    Ok(())
}
