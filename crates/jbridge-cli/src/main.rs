//! jbridge command-line tool
//!
//! Derives method descriptors offline, checks that a boundary library binds,
//! and calls into a loaded boundary.
//!
//! The boundary library comes from `--library`, `JBRIDGE_LIBRARY`, or the
//! `[boundary]` table of `jbridge.toml`, in that order.

mod args;
mod commands;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jbridge::config::CONFIG_FILE;
use jbridge::{BridgeConfig, LogConfig};
use std::path::{Path, PathBuf};

use output::{resolve_color_choice, StyledOutput};

#[derive(Parser)]
#[command(name = "jbridge")]
#[command(about = "Call into a foreign object runtime over the jbridge C ABI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file [default: ./jbridge.toml when present]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Boundary library to load
    #[arg(long, global = true)]
    library: Option<String>,

    /// Prefix prepended to every entry-point symbol
    #[arg(long, global = true)]
    symbol_prefix: Option<String>,

    /// When to use colors
    #[arg(long, global = true, value_parser = ["auto", "always", "never"])]
    color: Option<String>,

    /// Trace every call stage on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the descriptor a call with these arguments would use
    Signature {
        /// Argument literals (JSON; bare words are strings)
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
        /// Explicit return kind
        #[arg(short, long)]
        returns: Option<String>,
        /// Derive a constructor descriptor
        #[arg(long)]
        constructor: bool,
    },

    /// Load the boundary library and bind all seven entry points
    Check,

    /// Call a static method, e.g. `com.example.Calc.add 2 3 --returns int`
    Call {
        /// Dotted path to the method
        path: String,
        /// Argument literals (JSON; bare words are strings)
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
        /// Explicit return kind
        #[arg(short, long)]
        returns: Option<String>,
    },

    /// Construct an object and release it again
    New {
        /// Dotted class name
        class: String,
        /// Constructor argument literals
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));

    if let Err(err) = run(cli, &mut out) {
        out.error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run(cli: Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Signature {
            args,
            returns,
            constructor,
        } => {
            jbridge::init_logging(&log_config(None, cli.verbose));
            commands::signature::execute(out, args, returns.as_deref(), *constructor)
        }
        Commands::Check => {
            let config = load_config(&cli)?;
            jbridge::init_logging(&log_config(Some(&config), cli.verbose));
            commands::check::execute(out, &config.boundary)
        }
        Commands::Call {
            path,
            args,
            returns,
        } => {
            let config = load_config(&cli)?;
            jbridge::init_logging(&log_config(Some(&config), cli.verbose));
            commands::call::execute(out, &config.boundary, path, args, returns.as_deref())
        }
        Commands::New { class, args } => {
            let config = load_config(&cli)?;
            jbridge::init_logging(&log_config(Some(&config), cli.verbose));
            commands::new::execute(out, &config.boundary, class, args)
        }
    }
}

/// File (explicit or `./jbridge.toml`), then environment, then flags
fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(CONFIG_FILE)).filter(|p| p.is_file()),
    };

    let mut config = match &path {
        Some(path) => read_config(path)?,
        None => BridgeConfig::default(),
    };
    config.apply_env();
    if let Some(library) = &cli.library {
        config.boundary.library = library.clone();
    }
    if let Some(prefix) = &cli.symbol_prefix {
        config.boundary.symbol_prefix = prefix.clone();
    }
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<BridgeConfig> {
    BridgeConfig::from_file(path).with_context(|| format!("reading {}", path.display()))
}

fn log_config(config: Option<&BridgeConfig>, verbose: bool) -> LogConfig {
    if verbose {
        return LogConfig::debug();
    }
    match config {
        Some(config) => config.log.clone(),
        None => LogConfig::from_env(),
    }
}
