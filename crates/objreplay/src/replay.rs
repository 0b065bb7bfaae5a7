//! Replay pipeline: copy journal records from a source to a destination
//! object storage.
//!
//! Each consumed record receives exactly one [`Decision`]. Visible records
//! that pass the exclusion list, the size limit, and the destination
//! presence check are fetched from the source and stored in the
//! destination, with every storage operation retried on transient
//! failure. Records in a batch are processed by a bounded pool of
//! concurrent tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use objreplay_store::{ObjStorage, ObjectId};

use crate::error::{Error, Result};
use crate::exclude::HashFilter;
use crate::journal::{ContentRecord, JournalClient};
use crate::reporter::{DeadLetterStore, FailureReport};
use crate::stats::{ReplayStats, StatsSnapshot};

/// The outcome of replaying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The object was copied to the destination.
    Copied,
    /// The object was already present in the destination.
    InDst,
    /// The record was not visible.
    Skipped,
    /// The object was excluded by the exclusion list or size limit.
    Excluded,
    /// The source storage does not have the object.
    NotInSrc,
    /// A storage operation exhausted its retries.
    Failed,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copied => write!(f, "copied"),
            Self::InDst => write!(f, "in_dst"),
            Self::Skipped => write!(f, "skipped"),
            Self::Excluded => write!(f, "excluded"),
            Self::NotInSrc => write!(f, "not_in_src"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Tuning knobs for the replay pipeline.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Maximum number of concurrent object copies.
    pub concurrency: usize,
    /// Check the destination for presence before copying.
    pub check_dst: bool,
    /// Maximum attempts per storage operation.
    pub max_retries: usize,
    /// Upper bound for the jittered retry backoff.
    pub max_backoff: Duration,
    /// Skip objects larger than this many bytes.
    pub size_limit: Option<u64>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            concurrency: 16,
            check_dst: true,
            max_retries: 3,
            max_backoff: Duration::from_secs(60),
            size_limit: None,
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryFailure {
    /// The object is missing; never retried.
    NotFound,
    /// All attempts failed.
    Exhausted,
}

/// The replay worker: copies content objects between two storages.
pub struct ContentReplayer {
    /// Source object storage.
    src: Arc<dyn ObjStorage>,
    /// Destination object storage.
    dst: Arc<dyn ObjStorage>,
    /// Pipeline options.
    options: ReplayOptions,
    /// Digests that must not be copied.
    exclude: HashFilter,
    /// Dead-letter store for permanent failures.
    reporter: Option<DeadLetterStore>,
    /// Decision and volume counters.
    stats: ReplayStats,
    /// Bounds the number of in-flight copies.
    limiter: Arc<Semaphore>,
}

impl std::fmt::Debug for ContentReplayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentReplayer")
            .field("src", &self.src.name())
            .field("dst", &self.dst.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ContentReplayer {
    /// Create a replayer copying from `src` to `dst`.
    #[must_use]
    pub fn new(src: Arc<dyn ObjStorage>, dst: Arc<dyn ObjStorage>, options: ReplayOptions) -> Self {
        let limiter = Arc::new(Semaphore::new(options.concurrency));
        Self {
            src,
            dst,
            options,
            exclude: HashFilter::empty(),
            reporter: None,
            stats: ReplayStats::new(),
            limiter,
        }
    }

    /// Attach an exclusion list.
    #[must_use]
    pub fn with_exclude(mut self, exclude: HashFilter) -> Self {
        self.exclude = exclude;
        self
    }

    /// Attach a dead-letter store for permanent failures.
    #[must_use]
    pub fn with_reporter(mut self, reporter: DeadLetterStore) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Get a snapshot of the replay counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Get the dead-letter store, if one is attached.
    #[must_use]
    pub fn reporter(&self) -> Option<&DeadLetterStore> {
        self.reporter.as_ref()
    }

    /// Replay one batch of records with bounded concurrency.
    ///
    /// The call returns once every record in the batch has received a
    /// decision.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker task panics or is cancelled.
    /// Per-object storage failures are not errors here; they end up in
    /// the `failed` counter and the dead-letter store.
    pub async fn replay(self: &Arc<Self>, batch: Vec<ContentRecord>) -> Result<()> {
        let mut tasks = JoinSet::new();
        for record in batch {
            let replayer = Arc::clone(self);
            tasks.spawn(async move {
                // Semaphore is never closed, acquire cannot fail.
                let _permit = replayer.limiter.acquire().await;
                replayer.process_record(record).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let decision = joined.map_err(|err| Error::TaskJoin(err.to_string()))?;
            self.stats.record(decision);
        }
        Ok(())
    }

    /// Decide and execute the replay of a single record.
    async fn process_record(&self, record: ContentRecord) -> Decision {
        let id = record.id;

        if !record.is_visible() {
            debug!("skipped {} (status={})", id, record.status);
            return Decision::Skipped;
        }

        if self.exclude.contains(&id) {
            debug!("skipped {} (excluded)", id);
            return Decision::Excluded;
        }

        if let Some(limit) = self.options.size_limit {
            if record.length > limit {
                debug!("skipped {} ({} bytes over limit)", id, record.length);
                return Decision::Excluded;
            }
        }

        if self.options.check_dst {
            match self
                .retrying("contains", &id, || self.dst.contains(&id))
                .await
            {
                Ok(true) => {
                    debug!("skipped {} (in dst)", id);
                    return Decision::InDst;
                }
                Ok(false) => {}
                // Presence unknown after retries: attempt the copy anyway,
                // add is idempotent.
                Err(_) => {}
            }
        }

        let data = match self.retrying("get", &id, || self.src.get(&id)).await {
            Ok(data) => data,
            Err(RetryFailure::NotFound) => {
                error!("failed to retrieve {}: object not found", id);
                return Decision::NotInSrc;
            }
            Err(RetryFailure::Exhausted) => return Decision::Failed,
        };
        debug!("retrieved {}", id);

        if self
            .retrying("add", &id, || self.dst.add(&id, &data))
            .await
            .is_err()
        {
            return Decision::Failed;
        }
        debug!("stored {}", id);

        self.stats.add_bytes(data.len() as u64);
        Decision::Copied
    }

    /// Run a storage operation with jittered exponential retry.
    ///
    /// Not-found is terminal on the first attempt; any other failure is
    /// retried up to `max_retries` attempts, then reported to the
    /// dead-letter store.
    async fn retrying<T, F, Fut>(
        &self,
        operation: &'static str,
        id: &ObjectId,
        mut op: F,
    ) -> std::result::Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = objreplay_store::Result<T>>,
    {
        let max_attempts = self.options.max_retries;
        for attempt in 1..=max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_not_found() => return Err(RetryFailure::NotFound),
                Err(err) if attempt < max_attempts => {
                    self.stats.add_retry();
                    debug!("retry operation {} on {}: {}", operation, id, err);
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(err) => {
                    error!(
                        "failed operation {} on {} after {} retries: {}",
                        operation, id, max_attempts, err
                    );
                    self.report_failure(operation, id, &err);
                }
            }
        }
        Err(RetryFailure::Exhausted)
    }

    /// Compute the jittered backoff before the next attempt.
    ///
    /// Uniformly random between zero and `min(2^(attempt-1)s, max_backoff)`.
    fn backoff(&self, attempt: usize) -> Duration {
        let exp = 1u64 << (attempt - 1).min(63);
        let cap = Duration::from_secs(exp).min(self.options.max_backoff);
        if cap.is_zero() {
            return Duration::ZERO;
        }
        let secs = rand::thread_rng().gen_range(0.0..cap.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Write a permanent failure to the dead-letter store.
    fn report_failure(&self, operation: &str, id: &ObjectId, err: &objreplay_store::StorageError) {
        let Some(reporter) = &self.reporter else {
            return;
        };
        let report = FailureReport {
            obj_id: id.to_hex(),
            operation: operation.to_string(),
            error: err.to_string(),
            retries: self.options.max_retries,
        };
        if let Err(report_err) = reporter.report(&report) {
            warn!("could not record dead letter for {}: {}", id, report_err);
        }
    }
}

/// Drive journal batches through the replayer.
///
/// Batches are consumed until the journal is exhausted or
/// `stop_after_objects` records have been processed. The journal is
/// committed after each fully settled batch, so a crash replays at most
/// one batch. Returns the final counters.
///
/// # Errors
///
/// Returns an error if the journal fails or a worker task panics.
pub async fn run<J: JournalClient>(
    journal: &mut J,
    replayer: &Arc<ContentReplayer>,
    stop_after_objects: Option<u64>,
) -> Result<StatsSnapshot> {
    let started = Instant::now();
    let mut consumed: u64 = 0;

    while let Some(mut batch) = journal.next_batch().await? {
        let mut truncated = false;
        if let Some(stop) = stop_after_objects {
            let remaining = stop.saturating_sub(consumed);
            if remaining == 0 {
                break;
            }
            if (batch.len() as u64) > remaining {
                batch.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));
                truncated = true;
            }
        }

        consumed += batch.len() as u64;
        replayer.replay(batch).await?;

        // A truncated batch is not fully processed; leave the offset at
        // the previous commit so the remainder is delivered again.
        if truncated {
            break;
        }
        journal.commit().await?;

        if stop_after_objects.is_some_and(|stop| consumed >= stop) {
            break;
        }
    }

    let snapshot = replayer.stats();
    info!("{}", snapshot.summary(started.elapsed()));
    Ok(snapshot)
}
