//! `pierlink` -- CLI binary for the IRC <-> Discord bridge.
//!
//! Subcommands:
//!
//! - `pierlink run` -- Start the bridge and relay until Ctrl+C.
//! - `pierlink check-config` -- Validate a config file and print it.

use clap::{Parser, Subcommand};

mod commands;

/// pierlink IRC <-> Discord bridge.
#[derive(Parser)]
#[command(name = "pierlink", about = "IRC <-> Discord bridge", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bridge.
    Run(commands::run::RunArgs),

    /// Validate the configuration and print it with secrets redacted.
    CheckConfig(commands::check_config::CheckConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::CheckConfig(args) => commands::check_config::run(args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_without_error() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_has_all_subcommands() {
        let cmd = Cli::command();
        let names: Vec<&str> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        assert!(names.contains(&"run"));
        assert!(names.contains(&"check-config"));
    }

    #[test]
    fn cli_verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["pierlink", "run", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn cli_config_override() {
        let cli =
            Cli::try_parse_from(["pierlink", "check-config", "--config", "/tmp/p.json"]).unwrap();
        match cli.command {
            Commands::CheckConfig(args) => {
                assert_eq!(args.config.as_deref(), Some("/tmp/p.json"));
            }
            _ => panic!("expected check-config"),
        }
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["pierlink"]).is_err());
    }
}
