//! Journal client abstraction for objreplay.
//!
//! The replayer consumes content records from a journal: an ordered feed
//! of change events describing objects added to the source storage. The
//! [`JournalClient`] trait is the seam behind which the actual transport
//! lives; this module ships a file-backed client reading newline-delimited
//! JSON and an in-memory client for tests.

use std::collections::VecDeque;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

use objreplay_store::ObjectId;

use crate::error::{Error, Result};

/// Visibility status of a content object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// The object is visible and should be replayed.
    Visible,
    /// The object is hidden and must not be copied.
    Hidden,
    /// The object has been removed from the source.
    Absent,
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Hidden => write!(f, "hidden"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// A single content record from the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Content digest of the object.
    pub id: ObjectId,
    /// Size of the object in bytes.
    pub length: u64,
    /// Visibility status.
    pub status: ContentStatus,
}

impl ContentRecord {
    /// Create a visible record for the given object.
    #[must_use]
    pub fn visible(id: ObjectId, length: u64) -> Self {
        Self {
            id,
            length,
            status: ContentStatus::Visible,
        }
    }

    /// Check whether this record should be considered for replay.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.status == ContentStatus::Visible
    }
}

/// A source of content record batches.
///
/// Implementations deliver records in journal order. `commit` is called
/// by the replay loop after a batch has been fully processed, so a
/// restarted consumer resumes at the last committed position
/// (at-least-once delivery).
#[async_trait::async_trait]
pub trait JournalClient: Send {
    /// Fetch the next batch of records.
    ///
    /// Returns `None` when the journal is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or decoded.
    async fn next_batch(&mut self) -> Result<Option<Vec<ContentRecord>>>;

    /// Persist the consumer position after a processed batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the position cannot be persisted.
    async fn commit(&mut self) -> Result<()>;
}

/// A journal client reading newline-delimited JSON records from a file.
///
/// Each line is one [`ContentRecord`]:
///
/// ```text
/// {"id":"9f86d08…","length":4,"status":"visible"}
/// ```
///
/// When an offset file is configured, the number of consumed records is
/// written there on `commit` and already-consumed lines are skipped on
/// the next open.
#[derive(Debug)]
pub struct FileJournal {
    /// Line reader over the journal file.
    lines: Lines<BufReader<tokio::fs::File>>,
    /// Records handed out per batch.
    batch_size: usize,
    /// Optional offset file for resuming.
    offset_path: Option<PathBuf>,
    /// Records consumed since the start of the journal.
    consumed: u64,
    /// Records consumed at the last commit.
    committed: u64,
}

impl FileJournal {
    /// Open a journal file, resuming from the offset file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be opened or the committed
    /// offset points past its end.
    pub async fn open(
        path: PathBuf,
        batch_size: usize,
        offset_path: Option<PathBuf>,
    ) -> Result<Self> {
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|source| Error::JournalOpen {
                path: path.clone(),
                source,
            })?;
        let mut lines = BufReader::new(file).lines();

        let committed = match &offset_path {
            Some(offset) => read_offset(offset).await?,
            None => 0,
        };

        // Skip lines consumed by a previous run.
        for n in 0..committed {
            if lines.next_line().await?.is_none() {
                return Err(Error::internal(format!(
                    "committed offset {committed} is past the end of the journal ({n} records)"
                )));
            }
        }
        if committed > 0 {
            info!("resuming journal {} at record {}", path.display(), committed);
        }

        Ok(Self {
            lines,
            batch_size,
            offset_path,
            consumed: committed,
            committed,
        })
    }

    /// Number of records consumed since the start of the journal.
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

/// Read a committed offset from disk, treating a missing file as zero.
async fn read_offset(path: &PathBuf) -> Result<u64> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content
            .trim()
            .parse()
            .map_err(|_| Error::internal(format!("corrupt offset file {}", path.display()))),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(source) => Err(Error::JournalOpen {
            path: path.clone(),
            source,
        }),
    }
}

#[async_trait::async_trait]
impl JournalClient for FileJournal {
    async fn next_batch(&mut self) -> Result<Option<Vec<ContentRecord>>> {
        let mut batch = Vec::with_capacity(self.batch_size);

        while batch.len() < self.batch_size {
            let Some(line) = self.lines.next_line().await? else {
                break;
            };
            self.consumed += 1;
            if line.trim().is_empty() {
                continue;
            }
            let record: ContentRecord = serde_json::from_str(&line)
                .map_err(|err| Error::journal_decode(self.consumed, err.to_string()))?;
            batch.push(record);
        }

        if batch.is_empty() {
            debug!("journal exhausted after {} records", self.consumed);
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let Some(path) = &self.offset_path else {
            self.committed = self.consumed;
            return Ok(());
        };

        // Write to a temp file then rename, so a crash mid-commit leaves
        // the previous offset intact.
        let tmp = path.with_extension("tmp");
        let map_err = |source| Error::OffsetCommit {
            path: path.clone(),
            source,
        };
        tokio::fs::write(&tmp, self.consumed.to_string())
            .await
            .map_err(map_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(map_err)?;

        self.committed = self.consumed;
        debug!("committed journal offset {}", self.committed);
        Ok(())
    }
}

/// An in-memory journal client, used by tests.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    batches: VecDeque<Vec<ContentRecord>>,
    commits: usize,
}

impl MemoryJournal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a journal delivering the given records in one batch.
    #[must_use]
    pub fn with_records(records: Vec<ContentRecord>) -> Self {
        let mut journal = Self::new();
        journal.push_batch(records);
        journal
    }

    /// Queue a batch of records for delivery.
    pub fn push_batch(&mut self, records: Vec<ContentRecord>) {
        self.batches.push_back(records);
    }

    /// Number of commits observed.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits
    }
}

#[async_trait::async_trait]
impl JournalClient for MemoryJournal {
    async fn next_batch(&mut self) -> Result<Option<Vec<ContentRecord>>> {
        Ok(self.batches.pop_front())
    }

    async fn commit(&mut self) -> Result<()> {
        self.commits += 1;
        Ok(())
    }
}
