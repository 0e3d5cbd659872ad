use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use orb_cli::{Commands, OutputFormat, commands, config::load_config};

#[derive(Parser)]
#[command(
    name = "orb",
    about = "Inspect and extract Orb resource archives",
    version,
    author,
    long_about = "A command-line tool for reading Orb archives and their Bro sidecars: list the object catalog, list and extract resources, and check an archive pair for damage."
)]
struct Cli {
    /// Set the logging level
    #[arg(short, long, value_enum, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "ORB_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let default_level = Level::from(cli.log_level).to_string().to_lowercase();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    commands::handle(cli.command, cli.format, &config)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "orb", "info", "GAME.ORB", "-l", "debug", "-o", "json", "-c", "orb.toml",
        ])
        .unwrap();
        assert!(matches!(cli.log_level, LogLevel::Debug));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("orb.toml")));
        assert!(matches!(cli.command, Commands::Info { .. }));
    }

    #[test]
    fn log_level_defaults_to_warn() {
        let cli = Cli::try_parse_from(["orb", "verify", "GAME.ORB"]).unwrap();
        assert_eq!(Level::from(cli.log_level), Level::WARN);
    }
}
