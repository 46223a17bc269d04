//! clang-build CLI - a build system for C and C++ projects driving LLVM

use std::fs::File;
use std::sync::Mutex;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

mod cli;
mod commands;

use cli::Cli;

const LOG_FILE: &str = "clang-build.log";

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    init_logging(&cli);

    tracing::info!("clang-build {}", env!("CARGO_PKG_VERSION"));
    commands::build::execute(cli)?;
    tracing::info!("clang-build finished.");
    Ok(())
}

/// Everything goes to the log file; the console shows warnings unless
/// asked for more, and `RUST_LOG` overrides it.
fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("clang_build={}", level)));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let file = File::create(LOG_FILE).ok().map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false)
            .with_filter(LevelFilter::DEBUG)
    });

    tracing_subscriber::registry().with(console).with(file).init();
}
