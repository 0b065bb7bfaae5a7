//! Command-line interface for objreplay.
//!
//! This module provides the CLI structure and command handlers for the
//! `objreplay` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, ReplayCommand};

/// objreplay - Copy content objects between object storages
///
/// Consumes a journal of content records and copies every visible object
/// from a source object storage to a destination, with presence checks,
/// exclusion lists, and per-operation retries.
#[derive(Debug, Parser)]
#[command(name = "objreplay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay the journal from the source storage to the destination
    Replay(ReplayCommand),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_debug() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "objreplay");
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_quiet() {
        let cli = Cli::try_parse_from(["objreplay", "-q", "replay"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        let cli = Cli::try_parse_from(["objreplay", "replay"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        let cli = Cli::try_parse_from(["objreplay", "-v", "replay"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_trace() {
        let cli = Cli::try_parse_from(["objreplay", "-vv", "replay"]).unwrap();
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_parse_replay() {
        let cli = Cli::try_parse_from(["objreplay", "replay"]).unwrap();
        assert!(matches!(cli.command, Command::Replay(_)));
    }

    #[test]
    fn test_parse_replay_flags() {
        let args = [
            "objreplay",
            "replay",
            "-n",
            "500",
            "--size-limit",
            "1048576",
            "--no-check-dst",
            "--concurrency",
            "8",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Replay(cmd) = cli.command else {
            panic!("expected replay command");
        };
        assert_eq!(cmd.stop_after_objects, Some(500));
        assert_eq!(cmd.size_limit, Some(1_048_576));
        assert_eq!(cmd.check_dst(), Some(false));
        assert_eq!(cmd.concurrency, Some(8));
    }

    #[test]
    fn test_parse_replay_exclude_file() {
        let args = ["objreplay", "replay", "--exclude-file", "/tmp/excluded.bin"];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Replay(cmd) = cli.command else {
            panic!("expected replay command");
        };
        assert_eq!(cmd.exclude_file, Some(PathBuf::from("/tmp/excluded.bin")));
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["objreplay", "config", "show", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["objreplay", "-c", "/custom/config.toml", "replay"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_check_dst_flags_conflict_resolution() {
        // The later flag wins through overrides_with.
        let cli =
            Cli::try_parse_from(["objreplay", "replay", "--check-dst", "--no-check-dst"]).unwrap();
        let Command::Replay(cmd) = cli.command else {
            panic!("expected replay command");
        };
        assert_eq!(cmd.check_dst(), Some(false));
    }
}
