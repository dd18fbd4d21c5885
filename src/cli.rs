//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

use crate::config::StaticConfig;

/// affiliate-engine - referral tracking, attribution and commission settlement
#[derive(Parser, Debug)]
#[command(name = "affiliate-engine")]
#[command(version)]
#[command(about = "Affiliate attribution and commission settlement service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = StaticConfig::DEFAULT_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server and background jobs (default)
    Serve,

    /// Run the payout scheduler once and exit
    RunPayouts,

    /// Refresh the affiliate performance cache once and exit
    RefreshPerformance,

    /// Print a sample configuration file
    GenerateConfig {
        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["affiliate-engine"]);
        assert_eq!(cli.config, StaticConfig::DEFAULT_PATH);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parses_subcommands() {
        let cli = Cli::parse_from(["affiliate-engine", "run-payouts", "--config", "prod.toml"]);
        assert_eq!(cli.command, Some(Commands::RunPayouts));
        assert_eq!(cli.config, "prod.toml");

        let cli = Cli::parse_from(["affiliate-engine", "generate-config", "-o", "out.toml"]);
        assert_eq!(
            cli.command,
            Some(Commands::GenerateConfig {
                output: Some("out.toml".into())
            })
        );
    }
}
