//! Command-line interface for the `ircwire` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ircwire", version, about = "IRC line codec and client loop")]
pub(crate) struct Cli {
    /// Config file. Defaults to `<config dir>/ircwire/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Print every IRC line of the input as a JSON object.
    Json {
        /// Read from this file instead of stdin.
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Connect to a configured server, answer PINGs and log chat traffic.
    Connect {
        /// Server name from the config; the first entry when omitted.
        #[arg(long)]
        server: Option<String>,
    },
    /// Write a default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_connect_with_global_config() {
        let cli = Cli::parse_from(["ircwire", "connect", "--server", "oftc", "--config", "a.toml"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("a.toml")));
        assert!(matches!(cli.command, CliCommand::Connect { server: Some(ref s) } if s == "oftc"));
    }
}
