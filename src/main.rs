//! Redink - hotkey-driven text correction for Wayland
//!
//! Select text in any application, press a configured chord, and the
//! selection is replaced with a rewritten version from the Gemini API.

use clap::Parser;
use redink::{config, Daemon};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "redink")]
#[command(author, version, about = "Hotkey-driven text correction for Wayland")]
#[command(long_about = "
Redink is a system-wide writing assistant for Wayland Linux systems.
Select text in any application, press a configured chord, and the
selection is replaced in place with a rewritten version from the
Gemini API.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Start ydotool daemon: systemctl --user enable --now ydotool
  4. Put your API key in ~/.config/redink/config.toml (or REDINK_API_KEY)
  5. Run: redink

USAGE:
  Select text, press a chord (default: Ctrl+Shift+G for grammar fix).
  The selection is replaced; your clipboard is restored afterwards.
")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration first: the log level may come from it
    let config = config::load_config(cli.config.as_deref())?;

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    init_logging(log_level, config.logging.file.as_deref())?;

    config.validate()?;

    print_hotkey_table(&config)?;

    let mut daemon = Daemon::new(config);
    daemon.run().await?;

    Ok(())
}

/// Initialize tracing: stderr always, plus an optional log file
fn init_logging(level: &str, log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("redink={},warn", level)));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::sync::Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Print the configured hotkey table to stdout at startup
fn print_hotkey_table(config: &redink::Config) -> anyhow::Result<()> {
    let bindings = config.bindings()?;

    println!("Redink is running. Available hotkeys:");
    for binding in &bindings {
        println!(
            "  {:<28} {:<12} {}",
            binding.chord,
            binding.mode.config_name(),
            binding.mode.description()
        );
    }
    println!();
    println!("Select text in any application and press a chord.");
    println!("Press Ctrl+C to stop.");

    Ok(())
}
