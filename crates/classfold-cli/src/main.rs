//! Classfold CLI - validate, store and browse labeled image datasets.

mod cli;
mod commands;
mod server;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Validate {
            archive,
            classes,
            files_per_class,
            format,
        } => commands::validate::run(archive, classes, files_per_class, format, cli.verbose),

        Commands::Ingest {
            archive,
            bucket,
            dataset_name,
            create_bucket,
            classes,
            files_per_class,
        } => commands::ingest::run(
            archive,
            bucket,
            dataset_name,
            create_bucket,
            classes,
            files_per_class,
            cli.store,
        ),

        Commands::List {
            bucket,
            dataset,
            class,
        } => commands::list::run(bucket, dataset, class, cli.store),

        Commands::Delete {
            bucket,
            dataset,
            class,
            sample,
        } => commands::delete::run(bucket, dataset, class, sample, cli.store),

        Commands::Download {
            bucket,
            dataset,
            class,
            dest,
        } => commands::download::run(bucket, dataset, class, dest, cli.store),

        Commands::Bucket { action } => commands::bucket::run(action, cli.store),

        Commands::File { action } => commands::file::run(action, cli.store),

        Commands::Serve { port } => commands::serve::run(port, cli.store),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr so command output on stdout stays machine-readable.
fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("classfold={}", level).parse()?)
                .add_directive(format!("classfold_cli={}", level).parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}
