//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config::Config;

/// Replay command arguments.
///
/// Every flag here overrides the corresponding configuration value;
/// unset flags leave the configuration untouched.
#[derive(Debug, Default, Args)]
pub struct ReplayCommand {
    /// Path to the journal file (newline-delimited JSON records)
    #[arg(short, long, value_name = "FILE")]
    pub journal: Option<PathBuf>,

    /// Stop after consuming this many journal records
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub stop_after_objects: Option<u64>,

    /// Path to a file of sorted binary digests to exclude
    #[arg(long, value_name = "FILE")]
    pub exclude_file: Option<PathBuf>,

    /// Skip objects larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    pub size_limit: Option<u64>,

    /// Check the destination for presence before copying
    #[arg(long, overrides_with = "no_check_dst")]
    pub check_dst: bool,

    /// Copy without checking the destination first
    #[arg(long)]
    pub no_check_dst: bool,

    /// Maximum number of concurrent object copies
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

impl ReplayCommand {
    /// Resolve the `--check-dst`/`--no-check-dst` flag pair.
    ///
    /// Returns `None` when neither flag was given.
    #[must_use]
    pub fn check_dst(&self) -> Option<bool> {
        if self.no_check_dst {
            Some(false)
        } else if self.check_dst {
            Some(true)
        } else {
            None
        }
    }

    /// Apply the command-line overrides to a loaded configuration.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(journal) = &self.journal {
            config.journal.path = Some(journal.clone());
        }
        if let Some(stop) = self.stop_after_objects {
            config.replay.stop_after_objects = Some(stop);
        }
        if let Some(exclude) = &self.exclude_file {
            config.replay.exclude_file = Some(exclude.clone());
        }
        if let Some(limit) = self.size_limit {
            config.replay.size_limit = Some(limit);
        }
        if let Some(check_dst) = self.check_dst() {
            config.replay.check_dst = check_dst;
        }
        if let Some(concurrency) = self.concurrency {
            config.replay.concurrency = concurrency;
        }
    }
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dst_default_is_unset() {
        let cmd = ReplayCommand::default();
        assert_eq!(cmd.check_dst(), None);
    }

    #[test]
    fn test_check_dst_explicit() {
        let cmd = ReplayCommand {
            check_dst: true,
            ..ReplayCommand::default()
        };
        assert_eq!(cmd.check_dst(), Some(true));
    }

    #[test]
    fn test_no_check_dst() {
        let cmd = ReplayCommand {
            no_check_dst: true,
            ..ReplayCommand::default()
        };
        assert_eq!(cmd.check_dst(), Some(false));
    }

    #[test]
    fn test_apply_to_leaves_config_untouched_by_default() {
        let mut config = Config::default();
        ReplayCommand::default().apply_to(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_apply_to_overrides() {
        let mut config = Config::default();
        let cmd = ReplayCommand {
            journal: Some(PathBuf::from("/var/journal.ndjson")),
            stop_after_objects: Some(1000),
            exclude_file: Some(PathBuf::from("/var/excluded.bin")),
            size_limit: Some(4096),
            check_dst: false,
            no_check_dst: true,
            concurrency: Some(4),
        };
        cmd.apply_to(&mut config);

        assert_eq!(config.journal.path, Some(PathBuf::from("/var/journal.ndjson")));
        assert_eq!(config.replay.stop_after_objects, Some(1000));
        assert_eq!(
            config.replay.exclude_file,
            Some(PathBuf::from("/var/excluded.bin"))
        );
        assert_eq!(config.replay.size_limit, Some(4096));
        assert!(!config.replay.check_dst);
        assert_eq!(config.replay.concurrency, 4);
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
