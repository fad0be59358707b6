//! Serve command - run the HTTP API.

use std::path::PathBuf;

use colored::Colorize;

use crate::server::{app, state::AppState, ServerConfig};

pub fn run(port: u16, store_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig {
        store_dir,
        port,
        ..ServerConfig::default()
    };
    let state = AppState::open(&config)?;

    println!();
    println!(
        "{} {}",
        "Starting classfold API at".cyan().bold(),
        format!("http://localhost:{}/api", port).white().bold()
    );
    println!();
    println!("  Store: {}", config.store_dir.display());
    println!();
    println!("Press {} to stop the server", "Ctrl+C".yellow().bold());
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(app::run_server(state, &config))
}
