mod cli;
mod prompt;
mod terminal;

use clap::Parser;

use pbtrim_core::config::TrimConfig;
use pbtrim_core::pipeline;

use cli::Cli;
use terminal::TerminalConsole;

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Validate everything before touching the network.
    let config = match TrimConfig::from_inputs(
        cli.connection_string.as_deref(),
        cli.container.as_deref(),
        cli.blobs.as_deref(),
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "container '{}', {} blob(s)",
        config.storage.container,
        config.blobs.len()
    );

    let mut console = TerminalConsole;
    let summary = match pipeline::run(&config, &mut console) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if config.blobs.len() > 1 {
        println!();
        println!(
            "Summary: {} resized, {} skipped, {} failed",
            summary.resized(),
            summary.declined(),
            summary.failed()
        );
    }

    if summary.has_failures() {
        std::process::exit(1);
    }
}
