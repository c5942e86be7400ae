//! Command-line interface for the Nordic Thingy:52.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Find a nearby Thingy:52 (or list all with `--all`) |
//! | `watch` | Print sensor and connection events until Ctrl+C |
//! | `led` | Set the LED: `on`, `breathe`, `flash`, `off`, `random` |
//! | `beep` | Play a tone |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Configuration
//!
//! Settings live in `config.toml` under the platform config directory
//! (`~/.config/thingy/config.toml` on Linux): default device, scan timeout,
//! accelerometer throttle, default tone and greeting.
//!
//! # Environment Variables
//!
//! - `THINGY_DEVICE`: Default device (overridden by `--device`)
//! - `NO_COLOR`: Disable colored output when set
//! - `RUST_LOG`: Log filter when neither `--verbose` nor `--quiet` is given

mod cli;
mod commands;
mod config;
mod format;
mod style;
mod util;

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{WatchArgs, cmd_beep, cmd_config, cmd_led, cmd_scan, cmd_watch};
use config::Config;
use format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "thingy", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();
    let opts = FormatOptions::new(cli.no_color);

    match cli.command {
        Commands::Scan {
            timeout,
            all,
            format,
        } => cmd_scan(timeout, all, format, cli.quiet, &opts, &config).await,
        Commands::Watch {
            device,
            count,
            throttle_ms,
            events,
            format,
            compact,
        } => {
            let opts = opts.with_compact(compact);
            cmd_watch(WatchArgs {
                device: &device,
                count,
                throttle_ms,
                events: &events,
                format,
                quiet: cli.quiet,
                opts: &opts,
                config: &config,
            })
            .await
        }
        Commands::Led { device, action } => cmd_led(&device, &action, cli.quiet, &config).await,
        Commands::Beep {
            device,
            frequency,
            duration,
            volume,
        } => cmd_beep(&device, frequency, duration, volume, cli.quiet, &config).await,
        Commands::Config { action } => cmd_config(action, &Config::path()),
        Commands::Completions { .. } => Ok(()),
    }
}
