//! `objreplay` - A content replayer for object storages
//!
//! This library provides the core functionality for replaying a journal of
//! content records against a pair of object storages: each visible record
//! is fetched from the source storage and copied to the destination,
//! subject to filtering, presence checks, and per-operation retries.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod exclude;
pub mod journal;
pub mod logging;
pub mod replay;
pub mod reporter;
pub mod stats;

pub use config::Config;
pub use error::{Error, Result};
pub use exclude::HashFilter;
pub use journal::{ContentRecord, ContentStatus, FileJournal, JournalClient, MemoryJournal};
pub use logging::init_logging;
pub use replay::{run, ContentReplayer, Decision, ReplayOptions};
pub use reporter::DeadLetterStore;
pub use stats::{ReplayStats, StatsSnapshot};
