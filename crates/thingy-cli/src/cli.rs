//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use thingy_core::{EventKind, LedColor};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable device connection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device name or address fragment, or use THINGY_DEVICE env var
    #[arg(short, long, env = "THINGY_DEVICE")]
    pub device: Option<String>,

    /// Scan timeout in seconds per attempt
    #[arg(short = 'T', long)]
    pub timeout: Option<u64>,

    /// Light the LED white and beep once connected
    #[arg(long)]
    pub greet: bool,
}

#[derive(Parser)]
#[command(name = "thingy")]
#[command(author, version, about = "CLI for the Nordic Thingy:52", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find a nearby Thingy:52
    Scan {
        /// Scan timeout in seconds
        #[arg(short = 'T', long)]
        timeout: Option<u64>,

        /// List every device in range instead of the closest one
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Connect and print events until Ctrl+C
    Watch {
        #[command(flatten)]
        device: DeviceArgs,

        /// Number of sensor events to print before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        /// Minimum milliseconds between accelerometer events
        #[arg(long)]
        throttle_ms: Option<u64>,

        /// Only print these event kinds (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        events: Vec<EventKind>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Compact JSON (one event per line)
        #[arg(long)]
        compact: bool,
    },

    /// Control the LED
    Led {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(subcommand)]
        action: LedAction,
    },

    /// Play a tone on the speaker
    Beep {
        #[command(flatten)]
        device: DeviceArgs,

        /// Frequency in Hz
        #[arg(short = 'F', long)]
        frequency: Option<u16>,

        /// Duration in milliseconds
        #[arg(short = 'D', long)]
        duration: Option<u16>,

        /// Volume (0-100)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        volume: Option<u8>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// LED modes
#[derive(Debug, Clone, Subcommand)]
pub enum LedAction {
    /// Constant RGB color
    On {
        /// Red component
        red: u8,
        /// Green component
        green: u8,
        /// Blue component
        blue: u8,
    },

    /// Pulse a palette color
    Breathe {
        /// Palette color (red, green, yellow, blue, purple, cyan, white or 1-7)
        color: LedColor,

        /// Intensity in percent
        #[arg(short, long, default_value = "20", value_parser = clap::value_parser!(u8).range(1..=100))]
        intensity: u8,

        /// Breathe period in milliseconds
        #[arg(short, long, default_value = "3500")]
        delay: u16,
    },

    /// Flash a palette color once
    Flash {
        /// Palette color (red, green, yellow, blue, purple, cyan, white or 1-7)
        color: LedColor,

        /// Intensity in percent
        #[arg(short, long, default_value = "20", value_parser = clap::value_parser!(u8).range(1..=100))]
        intensity: u8,

        /// Optional delay byte appended to the command
        #[arg(short, long)]
        delay: Option<u8>,
    },

    /// Turn the LED off
    Off,

    /// Constant random color
    Random,
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Default device name or address
    Device,
    /// Scan timeout in seconds
    ScanTimeout,
    /// Accelerometer throttle window in milliseconds
    ThrottleMs,
    /// Default tone frequency in Hz
    ToneFrequency,
    /// Default tone duration in milliseconds
    ToneDuration,
    /// Default tone volume (0-100)
    ToneVolume,
    /// Greet on connect (LED white + beep)
    Greet,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (remove) a configuration value
    Unset {
        /// Configuration key to remove
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Show configuration file path
    Path,
}
