//! Clap derive structures for the `kitsync` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// kitsync: reconcile device cloud kits from the command line
#[derive(Debug, Parser)]
#[command(
    name = "kitsync",
    version,
    about = "Drive and reconcile device cloud kits from the command line",
    long_about = "Write digital outputs and settings to gateway kits, keep radios in line\n\
        with the stock kit configuration, and route captured push batches.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Cloud account profile to use
    #[arg(long, short = 'p', env = "KITSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device cloud URL (overrides profile)
    #[arg(long, short = 'c', env = "KITSYNC_CLOUD", global = true)]
    pub cloud: Option<String>,

    /// Account user name (overrides profile)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Account password (overrides profile and keyring)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "KITSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "KITSYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "KITSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write outputs, settings, and serial data
    Io(IoArgs),

    /// Discover radios attached to a gateway
    #[command(alias = "node")]
    Nodes(NodesArgs),

    /// Read and write device settings
    #[command(alias = "set")]
    Settings(SettingsArgs),

    /// Compare radios against the stock kit configuration
    Stock(StockArgs),

    /// Route captured push batches
    Push(PushArgs),

    /// Manage push monitors
    #[command(alias = "mon")]
    Monitor(MonitorArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  IO
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct IoArgs {
    #[command(subcommand)]
    pub command: IoCommand,
}

#[derive(Debug, Subcommand)]
pub enum IoCommand {
    /// Write directives (DIO pins, settings, serial chunks) to a device
    Write {
        /// Device ID
        device: String,

        /// Directives as NAME=VALUE (e.g. DIO0=high M0=256 serial=Hello)
        #[arg(required = true, value_name = "NAME=VALUE")]
        directives: Vec<String>,

        /// Print the encoded commands instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Set digital outputs on a radio behind the gateway
    Outputs {
        /// Gateway device ID
        device: String,

        /// Radio node address
        node: String,

        /// Output levels as PIN=LEVEL (e.g. DIO3=on)
        #[arg(required = true, value_name = "PIN=LEVEL")]
        levels: Vec<String>,
    },

    /// Send data out of a serial port
    Serial {
        /// Device ID
        device: String,

        /// Data to send
        data: String,

        /// Radio node behind the gateway (defaults to the gateway itself)
        #[arg(long)]
        node: Option<String>,

        /// Data is already base64-encoded
        #[arg(long)]
        encoded: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NODES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: NodesCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodesCommand {
    /// List radios attached to a gateway
    #[command(alias = "ls")]
    List {
        /// Gateway device ID
        device: String,

        /// Run discovery on the gateway instead of using the cloud's cache
        #[arg(long)]
        no_cache: bool,

        /// Clear the gateway's node table before discovery (implies --no-cache)
        #[arg(long)]
        clear: bool,
    },

    /// Look up cached radios by extended address, on any gateway
    Find {
        /// Extended addresses (e.g. 00:13:A2:00:40:A1:B2:C3)
        #[arg(required = true, value_name = "ADDR")]
        addrs: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SETTINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show device or radio settings
    Get {
        /// Device ID
        device: String,

        /// Radio node address (defaults to the gateway itself)
        #[arg(long)]
        radio: Option<String>,

        /// Use the cloud's cached copy instead of querying the device
        #[arg(long)]
        cache: bool,
    },

    /// Write settings from a JSON file ({group: {key: value}})
    Set {
        /// Device ID
        device: String,

        /// Radio node address (defaults to the gateway itself)
        #[arg(long)]
        radio: Option<String>,

        /// JSON settings file
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Write only what differs between the device and a JSON target
    Sync {
        /// Device ID
        device: String,

        /// Radio node address (defaults to the gateway itself)
        #[arg(long)]
        radio: Option<String>,

        /// JSON target settings file
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STOCK
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StockArgs {
    #[command(subcommand)]
    pub command: StockCommand,
}

#[derive(Debug, Subcommand)]
pub enum StockCommand {
    /// Show the stock kit configuration
    Show,

    /// Show what stock would change on a radio
    Diff {
        /// Gateway device ID
        device: String,

        /// Radio node address
        #[arg(long)]
        radio: String,
    },

    /// Bring a radio in line with the stock configuration
    Apply {
        /// Gateway device ID
        device: String,

        /// Radio node address
        #[arg(long)]
        radio: String,
    },

    /// Diff a saved settings file against stock (offline)
    DiffFile {
        /// JSON settings file ({group: {key: value}})
        path: PathBuf,
    },

    /// Look up the AT command for a pin name
    Pin {
        /// Pin name (e.g. DIO12)
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PUSH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PushArgs {
    #[command(subcommand)]
    pub command: PushCommand,
}

#[derive(Debug, Subcommand)]
pub enum PushCommand {
    /// Route a captured push batch against logging handlers (offline)
    Dispatch {
        /// JSON batch file ({"Document": {"Msg": ...}})
        path: PathBuf,

        /// Device IDs to listen for (repeatable)
        #[arg(long = "device", short = 'd')]
        devices: Vec<String>,

        /// Exit non-zero when the batch would be answered as inactive
        #[arg(long)]
        strict: bool,
    },

    /// Show how a topic routes
    Route {
        /// Push topic (e.g. 1234/DataPoint/00000000-.../temp)
        topic: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MONITOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MonitorArgs {
    #[command(subcommand)]
    pub command: MonitorCommand,
}

#[derive(Debug, Subcommand)]
pub enum MonitorCommand {
    /// Create or re-activate the push monitor for an endpoint
    Ensure {
        /// Public URL the cloud pushes to
        #[arg(long)]
        endpoint: String,

        /// Subscribe to one device's data points (default: account DeviceCore)
        #[arg(long)]
        device: Option<String>,
    },

    /// List monitors pushing to an endpoint
    List {
        /// Public URL the cloud pushes to
        #[arg(long)]
        endpoint: String,

        /// One device's data point monitors (default: account DeviceCore)
        #[arg(long)]
        device: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,

        /// Store the push monitor password instead of the account password
        #[arg(long)]
        monitor: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
