pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use concierge_core::config::{ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Resort concierge operator CLI",
    long_about = "Prepare the concierge database, load the demo resort catalogue, and inspect runtime readiness.",
    after_help = "Examples:\n  concierge migrate\n  concierge --config config/concierge.toml seed\n  concierge doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    source: ConfigSource,
    #[command(subcommand)]
    command: Command,
}

/// Where configuration comes from, shared by every subcommand.
#[derive(Debug, Args)]
struct ConfigSource {
    /// Explicit config file; it must exist when given.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Overrides `database.url` after file and environment layers.
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,
}

impl ConfigSource {
    fn into_load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                database_url: self.database_url,
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks (config, database, LLM key)")]
    Start,
    #[command(about = "Apply pending database migrations")]
    Migrate,
    #[command(about = "Load the demo resort catalogue: rooms, spa services and activities")]
    Seed,
    #[command(about = "Show effective configuration values with their source, secrets redacted")]
    Config,
    #[command(about = "Check config, LLM key readiness, database connectivity and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.source.into_load_options();

    let result = match cli.command {
        Command::Start => commands::start::run(&options),
        Command::Migrate => commands::migrate::run(&options),
        Command::Seed => commands::seed::run(&options),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn global_config_flags_apply_to_any_subcommand() {
        let cli = Cli::try_parse_from([
            "concierge",
            "seed",
            "--config",
            "config/concierge.toml",
            "--database-url",
            "sqlite::memory:",
        ])
        .expect("arguments should parse");

        assert!(matches!(cli.command, Command::Seed));
        let options = cli.source.into_load_options();
        assert_eq!(options.config_path, Some(PathBuf::from("config/concierge.toml")));
        assert!(options.require_file);
        assert_eq!(options.overrides.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn no_flags_means_discovered_file_is_optional() {
        let cli = Cli::try_parse_from(["concierge", "doctor", "--json"]).expect("parse");

        assert!(matches!(cli.command, Command::Doctor { json: true }));
        let options = cli.source.into_load_options();
        assert!(options.config_path.is_none());
        assert!(!options.require_file);
    }
}
