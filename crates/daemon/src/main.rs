//! LanShare Daemon
//!
//! Shares a directory over HTTP on the local network.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use daemon::config::Config;
use daemon::ui::QrStyle;

/// LanShare - share a directory over HTTP on the local network.
#[derive(Parser, Debug)]
#[command(name = "lanshare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the file server
    Serve(ServeArgs),

    /// Print the effective configuration as TOML
    Config(ConfigArgs),

    /// Print the version
    Version,
}

/// Flags for `serve`. Anything left unset keeps the configured value.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory to share
    #[arg(short, long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Address to bind to
    #[arg(short, long, value_name = "IP")]
    pub bind: Option<String>,

    /// Print a QR code for each reachable URL
    #[arg(short, long, value_enum, value_name = "STYLE")]
    pub qrcode: Option<QrStyle>,

    /// Also write each QR code as a PNG file
    #[arg(long, value_name = "FILE")]
    pub qrcode_png: Option<PathBuf>,
}

/// Flags for `config`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConfigArgs {
    /// Write the configuration to this file instead of printing it
    #[arg(long, value_name = "FILE")]
    pub write: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.dir {
            config.server.root = dir.clone();
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(style) = self.qrcode {
            config.advertise.qrcode = style;
        }
    }
}

fn version_line() -> String {
    format!("lanshare {}", env!("CARGO_PKG_VERSION"))
}

/// Defaults, then the config file, then `LANSHARE_*`, then `--log-level`.
fn load_config(path: Option<&Path>, log_level: Option<String>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    config.apply_env_overrides();
    if let Some(level) = log_level {
        config.logging.level = level;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let args = match cli.command {
        Commands::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        Commands::Config(args) => {
            let config = load_config(cli.config.as_deref(), cli.log_level)?;
            config.validate()?;
            match args.write {
                Some(path) => {
                    config.save(&path)?;
                    println!("Configuration written to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
            return Ok(());
        }
        Commands::Serve(args) => args,
    };

    let mut config = load_config(cli.config.as_deref(), cli.log_level)?;
    args.apply(&mut config);
    config.validate()?;

    let _log_guard = daemon::logging::init(&config.logging)?;
    tracing::info!("{} starting", version_line());

    daemon::server::serve(&config, args.qrcode_png.as_deref()).await
}
