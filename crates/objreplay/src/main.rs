//! `objreplay` - CLI for the content replayer
//!
//! This binary drives a replay of content records from a journal file
//! into a destination object storage, and exposes the configuration
//! management commands.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use objreplay::cli::{Cli, Command, ConfigCommand, ReplayCommand};
use objreplay::replay::{run, ContentReplayer, ReplayOptions};
use objreplay::reporter::DeadLetterStore;
use objreplay::{init_logging, Config, Error, FileJournal, HashFilter};
use objreplay_store::{get_objstorage, ObjStorage, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Replay(replay_cmd) => handle_replay(config, &replay_cmd).await,
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_replay(mut config: Config, cmd: &ReplayCommand) -> anyhow::Result<()> {
    cmd.apply_to(&mut config);
    config.validate()?;

    let journal_path = config.journal.path.clone().ok_or(Error::ConfigValidation {
        message: "journal.path must be set (or pass --journal)".to_string(),
    })?;

    let src: Arc<dyn ObjStorage> = Arc::from(get_objstorage(&config.src)?);
    let dst: Arc<dyn ObjStorage> = Arc::from(get_objstorage(&config.dst)?);

    let exclude = match &config.replay.exclude_file {
        Some(path) => HashFilter::load(path)
            .with_context(|| format!("loading exclusion list {}", path.display()))?,
        None => HashFilter::empty(),
    };

    let options = ReplayOptions {
        concurrency: config.replay.concurrency,
        check_dst: config.replay.check_dst,
        max_retries: config.replay.max_retries,
        max_backoff: config.max_backoff(),
        size_limit: config.replay.size_limit,
    };

    let mut replayer = ContentReplayer::new(src, dst, options).with_exclude(exclude);
    if config.reporter.enabled {
        let store = DeadLetterStore::open(config.dead_letter_path())?;
        replayer = replayer.with_reporter(store);
    }
    let replayer = Arc::new(replayer);

    let mut journal = FileJournal::open(
        journal_path,
        config.journal.batch_size,
        config.journal.offset_path.clone(),
    )
    .await?;

    run(&mut journal, &replayer, config.replay.stop_after_objects).await?;

    println!("Done.");
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storages]");
                println!("  Source:             {}", describe_store(&config.src));
                println!("  Destination:        {}", describe_store(&config.dst));
                println!();
                println!("[Journal]");
                println!("  Path:               {}", describe_path(&config.journal.path));
                println!("  Batch size:         {}", config.journal.batch_size);
                println!(
                    "  Offset file:        {}",
                    describe_path(&config.journal.offset_path)
                );
                println!();
                println!("[Replay]");
                println!("  Concurrency:        {}", config.replay.concurrency);
                println!("  Check destination:  {}", config.replay.check_dst);
                println!("  Max retries:        {}", config.replay.max_retries);
                println!("  Max backoff (s):    {}", config.replay.max_backoff_secs);
                println!(
                    "  Size limit:         {}",
                    config
                        .replay
                        .size_limit
                        .map_or_else(|| "unset".to_string(), |v| v.to_string())
                );
                println!(
                    "  Exclude file:       {}",
                    describe_path(&config.replay.exclude_file)
                );
                println!();
                println!("[Reporter]");
                println!("  Enabled:            {}", config.reporter.enabled);
                println!(
                    "  Database:           {}",
                    config.dead_letter_path().display()
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            if !validate_config_file(path) {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

/// Check a config file, reporting the outcome on stdout.
fn validate_config_file(path: std::path::PathBuf) -> bool {
    match Config::load_from(Some(path)) {
        Ok(_) => {
            println!("Configuration is valid.");
            true
        }
        Err(e) => {
            println!("Configuration error: {e}");
            false
        }
    }
}

fn describe_store(store: &StoreConfig) -> String {
    match store {
        StoreConfig::Memory => "memory".to_string(),
        StoreConfig::Pathslicing { root, depth } => {
            format!("pathslicing (root={}, depth={depth})", root.display())
        }
    }
}

fn describe_path(path: &Option<std::path::PathBuf>) -> String {
    path.as_ref()
        .map_or_else(|| "unset".to_string(), |p| p.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_config_file_accepts_defaults() {
        // A missing file falls back to defaults, which validate.
        assert!(validate_config_file(std::path::PathBuf::from(
            "/nonexistent/config.toml"
        )));
    }

    #[test]
    fn test_validate_config_file_rejects_invalid_values() {
        let path = std::env::temp_dir().join(format!(
            "objreplay_validate_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[replay]\nconcurrency = 0\n").unwrap();

        assert!(!validate_config_file(path.clone()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_describe_store() {
        assert_eq!(describe_store(&StoreConfig::Memory), "memory");
        let sliced = StoreConfig::Pathslicing {
            root: std::path::PathBuf::from("/srv/objects"),
            depth: 3,
        };
        assert_eq!(
            describe_store(&sliced),
            "pathslicing (root=/srv/objects, depth=3)"
        );
    }
}
