//! Dual-sink writer: local workbook plus remote sheet.
//!
//! The remote sink runs in one of two modes chosen at startup:
//!
//! - [`WriteMode::Queued`]: rows go into a bounded drop-oldest queue drained
//!   by [`DualSinkWriter::run_worker`]. A row leaves the queue only once it
//!   was written or found to duplicate the last remote row, so rate limits
//!   and transient errors retry the same row.
//! - [`WriteMode::Direct`]: the caller performs the remote write inline.

use crate::error::Result;
use crate::local::LocalWorkbookSink;
use crate::remote::{RemoteSession, RemoteSheet};
use crate::row::gap_display;
use crate::throttle;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vote_tracker_core::{
    same_minute, PairBaseline, PersistenceConfig, Snapshot, TrackedPair, TrackedPairDiff,
};

// =============================================================================
// Configuration
// =============================================================================

/// How remote writes are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Background worker drains a bounded queue.
    Queued,
    /// Remote write happens synchronously in the caller.
    Direct,
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub mode: WriteMode,
    pub queue_capacity: usize,
    pub rate_limit_cooldown: Duration,
    pub retry_delay: Duration,
    pub init_retry: Duration,
}

impl WriterConfig {
    /// Direct mode for stateless hosting, queued otherwise.
    #[must_use]
    pub fn from_config(config: &PersistenceConfig, stateless: bool) -> Self {
        Self {
            mode: if stateless {
                WriteMode::Direct
            } else {
                WriteMode::Queued
            },
            queue_capacity: config.queue_capacity.max(1),
            rate_limit_cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            init_retry: Duration::from_secs(config.init_retry_secs),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            mode: WriteMode::Queued,
            queue_capacity: 500,
            rate_limit_cooldown: Duration::from_secs(60),
            retry_delay: Duration::from_secs(5),
            init_retry: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// Row Queue
// =============================================================================

#[derive(Debug, Clone)]
struct QueuedRow {
    seq: u64,
    row: TrackedPairDiff,
}

/// Bounded FIFO of rows awaiting the remote sheet. Full queues drop the oldest.
#[derive(Debug)]
pub struct RowQueue {
    rows: Mutex<VecDeque<QueuedRow>>,
    capacity: usize,
    next_seq: AtomicU64,
    notify: Notify,
}

impl RowQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            next_seq: AtomicU64::new(0),
            notify: Notify::new(),
        }
    }

    /// Enqueues without blocking. Returns true if the oldest row was dropped.
    pub fn push(&self, row: TrackedPairDiff) -> bool {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let dropped = {
            let mut rows = self.rows.lock();
            let dropped = rows.len() >= self.capacity;
            if dropped {
                rows.pop_front();
            }
            rows.push_back(QueuedRow { seq, row });
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    fn peek(&self) -> Option<QueuedRow> {
        self.rows.lock().front().cloned()
    }

    /// Pops the head only if it is still the row with `seq`.
    fn pop_if(&self, seq: u64) -> bool {
        let mut rows = self.rows.lock();
        if rows.front().is_some_and(|r| r.seq == seq) {
            rows.pop_front();
            true
        } else {
            false
        }
    }

    fn clear(&self) -> usize {
        let mut rows = self.rows.lock();
        let n = rows.len();
        rows.clear();
        n
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Time labels in queue order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.rows.lock().iter().map(|r| r.row.ts_label.clone()).collect()
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Result of one worker step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Queue empty.
    Idle,
    /// Head row written at this sheet row.
    Written(u32),
    /// Head row fell in the same minute as the last remote row and was dropped.
    SkippedDuplicate,
    /// Rate limited; head row kept.
    RateLimited,
    /// Other failure; session invalidated, head row kept.
    Failed,
    /// No remote sheet could be opened.
    Unavailable,
}

enum Delivery {
    Written(u32),
    Duplicate,
}

/// Persists tracked-pair rows to the local workbook and the remote sheet.
pub struct DualSinkWriter {
    pair: TrackedPair,
    config: WriterConfig,
    local: Option<Arc<LocalWorkbookSink>>,
    remote: Option<Arc<RemoteSession>>,
    queue: RowQueue,
}

impl std::fmt::Debug for DualSinkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualSinkWriter")
            .field("mode", &self.config.mode)
            .field("local", &self.local.as_ref().map(|l| l.path().to_path_buf()))
            .field("remote", &self.remote.is_some())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl DualSinkWriter {
    pub fn new(pair: TrackedPair, config: WriterConfig) -> Self {
        let queue = RowQueue::new(config.queue_capacity);
        Self {
            pair,
            config,
            local: None,
            remote: None,
            queue,
        }
    }

    #[must_use]
    pub fn with_local(mut self, sink: LocalWorkbookSink) -> Self {
        self.local = Some(Arc::new(sink));
        self
    }

    #[must_use]
    pub fn with_remote(mut self, session: Arc<RemoteSession>) -> Self {
        self.remote = Some(session);
        self
    }

    #[must_use]
    pub fn mode(&self) -> WriteMode {
        self.config.mode
    }

    #[must_use]
    pub fn pair(&self) -> &TrackedPair {
        &self.pair
    }

    #[must_use]
    pub fn queue(&self) -> &RowQueue {
        &self.queue
    }

    #[must_use]
    pub fn remote(&self) -> Option<&Arc<RemoteSession>> {
        self.remote.as_ref()
    }

    /// Stateless marker check; always true without a remote sink.
    pub async fn remote_due(&self, interval: Duration, now: DateTime<Utc>) -> bool {
        match &self.remote {
            Some(session) => throttle::should_write_remote(session, interval, now).await,
            None => true,
        }
    }

    /// Builds the row for `current` and hands it to the sinks.
    ///
    /// Returns the row when at least both tracked candidates were present;
    /// `None` means nothing was persisted and the throttle must not advance.
    /// `write_remote` gates the remote sink only.
    pub async fn write(
        &self,
        current: &Snapshot,
        baseline: Option<PairBaseline>,
        previous: Option<&Snapshot>,
        write_remote: bool,
    ) -> Option<TrackedPairDiff> {
        let Some(row) = self.pair.diff(current, baseline, previous) else {
            tracing::debug!(
                a = %self.pair.a_name,
                b = %self.pair.b_name,
                "Tracked candidates missing, nothing persisted"
            );
            return None;
        };

        self.write_local(&row).await;
        if write_remote {
            self.write_remote(&row).await;
        }
        Some(row)
    }

    async fn write_local(&self, row: &TrackedPairDiff) {
        let Some(sink) = self.local.clone() else {
            return;
        };
        let owned = row.clone();
        match tokio::task::spawn_blocking(move || sink.append(&owned)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Failed to write local workbook"),
            Err(e) => tracing::error!(error = %e, "Local workbook task panicked"),
        }
    }

    async fn write_remote(&self, row: &TrackedPairDiff) {
        let Some(session) = &self.remote else {
            return;
        };
        if session.is_disabled() {
            return;
        }

        match self.config.mode {
            WriteMode::Queued => {
                if self.queue.push(row.clone()) {
                    tracing::warn!(
                        capacity = self.config.queue_capacity,
                        "Remote queue full, dropped oldest row"
                    );
                }
            }
            WriteMode::Direct => {
                if session.in_backoff() {
                    tracing::debug!(label = %row.ts_label, "Remote sheet cooling down, row not written");
                    return;
                }
                let sheet = match session.sheet().await {
                    Ok(sheet) => sheet,
                    Err(e) => {
                        tracing::warn!(error = %e, "Remote sheet unavailable, row not written");
                        return;
                    }
                };
                match self.deliver(sheet.as_ref(), row).await {
                    Ok(Delivery::Written(n)) => {
                        tracing::info!(row = n, label = %row.ts_label, "Remote row written")
                    }
                    Ok(Delivery::Duplicate) => {
                        tracing::debug!(label = %row.ts_label, "Remote row skipped, same minute")
                    }
                    Err(e) if e.is_rate_limited() => {
                        tracing::warn!(
                            error = %e,
                            cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
                            "Remote sheet rate limited, row not written"
                        );
                        session.back_off(self.config.rate_limit_cooldown);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Remote write failed");
                        session.invalidate().await;
                    }
                }
            }
        }
    }

    /// Writes the head of the queue once.
    pub async fn drain_once(&self) -> DrainOutcome {
        let Some(head) = self.queue.peek() else {
            return DrainOutcome::Idle;
        };

        let Some(session) = &self.remote else {
            self.queue.clear();
            return DrainOutcome::Unavailable;
        };

        let sheet = match session.sheet().await {
            Ok(sheet) => sheet,
            Err(e) => {
                if session.is_disabled() {
                    let dropped = self.queue.clear();
                    tracing::warn!(dropped, "Remote sheet disabled, discarding queued rows");
                } else {
                    tracing::warn!(error = %e, "Remote sheet init failed");
                }
                return DrainOutcome::Unavailable;
            }
        };

        match self.deliver(sheet.as_ref(), &head.row).await {
            Ok(Delivery::Written(n)) => {
                self.queue.pop_if(head.seq);
                tracing::info!(
                    row = n,
                    label = %head.row.ts_label,
                    gap = %gap_display(head.row.gap),
                    queued = self.queue.len(),
                    "Remote row written"
                );
                DrainOutcome::Written(n)
            }
            Ok(Delivery::Duplicate) => {
                self.queue.pop_if(head.seq);
                tracing::debug!(label = %head.row.ts_label, "Remote row skipped, same minute");
                DrainOutcome::SkippedDuplicate
            }
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(
                    error = %e,
                    cooldown_secs = self.config.rate_limit_cooldown.as_secs(),
                    "Remote sheet rate limited, backing off"
                );
                DrainOutcome::RateLimited
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote write failed, reconnecting");
                session.invalidate().await;
                DrainOutcome::Failed
            }
        }
    }

    /// Drains the queue forever, sleeping per the backoff policy.
    pub async fn run_worker(self: Arc<Self>) {
        tracing::info!(capacity = self.config.queue_capacity, "Remote writer started");
        loop {
            match self.drain_once().await {
                DrainOutcome::Idle => self.queue.wait().await,
                DrainOutcome::Written(_) | DrainOutcome::SkippedDuplicate => {}
                DrainOutcome::RateLimited => tokio::time::sleep(self.config.rate_limit_cooldown).await,
                DrainOutcome::Failed => tokio::time::sleep(self.config.retry_delay).await,
                DrainOutcome::Unavailable => {
                    if self.remote.as_ref().map_or(true, |s| s.is_disabled()) {
                        self.queue.wait().await;
                    } else {
                        tokio::time::sleep(self.config.init_retry).await;
                    }
                }
            }
        }
    }

    /// Dedup, append, format, then marker.
    async fn deliver(&self, sheet: &dyn RemoteSheet, row: &TrackedPairDiff) -> Result<Delivery> {
        if let Some(last) = sheet.last_time_label().await? {
            if same_minute(&last, &row.ts_label) {
                return Ok(Delivery::Duplicate);
            }
        }

        let row_number = sheet.append_row(row).await?;

        if let Err(e) = sheet.format_row(row_number).await {
            tracing::warn!(error = %e, row = row_number, "Remote row formatting failed");
        }
        if let Err(e) = sheet.write_marker(Utc::now().timestamp()).await {
            tracing::warn!(error = %e, "Marker update failed");
        }
        Ok(Delivery::Written(row_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Failure, FailingConnector, FakeConnector, FakeSheet};
    use chrono::{FixedOffset, TimeZone};
    use std::sync::atomic::AtomicUsize;
    use vote_tracker_core::Candidate;

    const A: &str = "T1 Doran";
    const B: &str = "Hanwha Life Esports Gumayusi";

    fn pair() -> TrackedPair {
        TrackedPair::new(A, B).with_labels("Doran", "Gumayusi")
    }

    fn snapshot(min: u32, sec: u32, a: u64, b: u64) -> Snapshot {
        let ts = FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 2, 25, 16, min, sec)
            .unwrap();
        Snapshot::new(
            ts,
            vec![
                Candidate::new("1", format!(" {A} "), a),
                Candidate::new("2", B, b),
                Candidate::new("3", "Someone Else", 7),
            ],
        )
    }

    fn queued_writer(sheet: Arc<FakeSheet>) -> (DualSinkWriter, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector::new(sheet));
        let session = Arc::new(RemoteSession::new(connector.clone()));
        (
            DualSinkWriter::new(pair(), WriterConfig::default()).with_remote(session),
            connector,
        )
    }

    fn row(label: &str) -> TrackedPairDiff {
        TrackedPairDiff {
            ts_label: label.to_string(),
            a_votes: 1,
            a_diff: 0,
            b_votes: 1,
            b_diff: 0,
            gap: 0,
        }
    }

    #[test]
    fn test_config_mode_selection() {
        let persistence = vote_tracker_core::AppConfig::default().persistence;
        assert_eq!(WriterConfig::from_config(&persistence, false).mode, WriteMode::Queued);
        assert_eq!(WriterConfig::from_config(&persistence, true).mode, WriteMode::Direct);
    }

    #[test]
    fn test_queue_drops_oldest() {
        let queue = RowQueue::new(2);
        assert!(!queue.push(row("a")));
        assert!(!queue.push(row("b")));
        assert!(queue.push(row("c")));
        assert_eq!(queue.labels(), vec!["b", "c"]);
    }

    #[test]
    fn test_pop_if_ignores_stale_seq() {
        let queue = RowQueue::new(1);
        queue.push(row("a"));
        let head = queue.peek().unwrap();
        queue.push(row("b"));
        assert!(!queue.pop_if(head.seq));
        assert_eq!(queue.labels(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_write_without_both_candidates_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.xlsx");
        let sheet = Arc::new(FakeSheet::new());
        let (writer, _) = queued_writer(sheet.clone());
        let writer = writer.with_local(LocalWorkbookSink::new(&path, pair().header()));

        let ts = FixedOffset::east_opt(7 * 3600).unwrap().with_ymd_and_hms(2026, 2, 25, 16, 0, 0).unwrap();
        let only_a = Snapshot::new(ts, vec![Candidate::new("1", A, 10)]);

        assert!(writer.write(&only_a, None, None, true).await.is_none());
        assert!(!path.exists());
        assert!(writer.queue().is_empty());
        assert_eq!(writer.drain_once().await, DrainOutcome::Idle);
        assert!(sheet.data_rows().is_empty());
    }

    #[tokio::test]
    async fn test_write_diffs_against_baseline_then_previous() {
        let (writer, _) = queued_writer(Arc::new(FakeSheet::new()));
        let prev = snapshot(29, 0, 1000, 900);
        let cur = snapshot(30, 0, 1100, 950);

        let from_prev = writer.write(&cur, None, Some(&prev), false).await.unwrap();
        assert_eq!((from_prev.a_diff, from_prev.b_diff, from_prev.gap), (100, 50, 150));

        let baseline = PairBaseline { a_votes: 1050, b_votes: 960 };
        let from_base = writer.write(&cur, Some(baseline), Some(&prev), false).await.unwrap();
        assert_eq!((from_base.a_diff, from_base.b_diff), (50, -10));

        let first = writer.write(&cur, None, None, false).await.unwrap();
        assert_eq!((first.a_diff, first.b_diff), (0, 0));
        assert!(writer.queue().is_empty());
    }

    #[tokio::test]
    async fn test_queued_row_is_written_formatted_and_marked() {
        let sheet = Arc::new(FakeSheet::new());
        let (writer, _) = queued_writer(sheet.clone());

        let written = writer.write(&snapshot(29, 30, 1200, 1000), None, None, true).await.unwrap();
        assert_eq!(writer.queue().len(), 1);

        assert_eq!(writer.drain_once().await, DrainOutcome::Written(2));
        assert!(writer.queue().is_empty());

        let rows = sheet.data_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], written.ts_label);
        assert_eq!(rows[0][5], "200");
        assert_eq!(sheet.formatted_rows(), vec![2]);
        assert!(sheet.marker().is_some());
    }

    #[tokio::test]
    async fn test_same_minute_row_is_skipped() {
        let sheet = Arc::new(FakeSheet::new());
        sheet.push_row(&["2026-02-25 16:29:05", "1", "0", "1", "0", "0"]);
        let (writer, _) = queued_writer(sheet.clone());

        writer.write(&snapshot(29, 40, 1200, 1000), None, None, true).await;
        assert_eq!(writer.drain_once().await, DrainOutcome::SkippedDuplicate);
        assert!(writer.queue().is_empty());
        assert_eq!(sheet.data_rows().len(), 1);
        assert_eq!(sheet.append_attempts(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_keeps_row_at_head() {
        let sheet = Arc::new(FakeSheet::new());
        sheet.fail_next_append(Failure::RateLimited);
        let (writer, connector) = queued_writer(sheet.clone());

        writer.write(&snapshot(29, 30, 1200, 1000), None, None, true).await;
        writer.write(&snapshot(30, 30, 1210, 1001), None, None, true).await;

        assert_eq!(writer.drain_once().await, DrainOutcome::RateLimited);
        assert_eq!(writer.queue().len(), 2);
        assert_eq!(writer.queue().labels()[0], "2026-02-25 16:29:30");

        assert_eq!(writer.drain_once().await, DrainOutcome::Written(2));
        assert_eq!(writer.drain_once().await, DrainOutcome::Written(3));
        assert_eq!(sheet.append_attempts(), 3);
        assert_eq!(connector.connects(), 1);
    }

    #[tokio::test]
    async fn test_other_error_invalidates_session() {
        let sheet = Arc::new(FakeSheet::new());
        sheet.fail_next_append(Failure::Network);
        let (writer, connector) = queued_writer(sheet.clone());

        writer.write(&snapshot(29, 30, 1200, 1000), None, None, true).await;
        assert_eq!(writer.drain_once().await, DrainOutcome::Failed);
        assert_eq!(writer.queue().len(), 1);

        assert_eq!(writer.drain_once().await, DrainOutcome::Written(2));
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_discard_queue_and_stop_enqueueing() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let session = Arc::new(RemoteSession::new(Arc::new(FailingConnector::missing_credentials(
            attempts.clone(),
        ))));
        let writer = DualSinkWriter::new(pair(), WriterConfig::default()).with_remote(session);

        writer.write(&snapshot(29, 30, 1200, 1000), None, None, true).await;
        assert_eq!(writer.drain_once().await, DrainOutcome::Unavailable);
        assert!(writer.queue().is_empty());

        writer.write(&snapshot(30, 30, 1200, 1000), None, None, true).await;
        assert!(writer.queue().is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_direct_mode_writes_inline() {
        let sheet = Arc::new(FakeSheet::new());
        let session = Arc::new(RemoteSession::new(Arc::new(FakeConnector::new(sheet.clone()))));
        let config = WriterConfig {
            mode: WriteMode::Direct,
            ..WriterConfig::default()
        };
        let writer = DualSinkWriter::new(pair(), config).with_remote(session);

        writer.write(&snapshot(29, 30, 1200, 1000), None, None, true).await;
        assert!(writer.queue().is_empty());
        assert_eq!(sheet.data_rows().len(), 1);

        // second write in the same minute is deduplicated
        writer.write(&snapshot(29, 50, 1201, 1000), None, None, true).await;
        assert_eq!(sheet.data_rows().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_rate_limit_pauses_later_writes() {
        let sheet = Arc::new(FakeSheet::new());
        sheet.fail_next_append(Failure::RateLimited);
        let session = Arc::new(RemoteSession::new(Arc::new(FakeConnector::new(sheet.clone()))));
        let config = WriterConfig {
            mode: WriteMode::Direct,
            ..WriterConfig::default()
        };
        let writer = DualSinkWriter::new(pair(), config).with_remote(session.clone());

        writer.write(&snapshot(29, 30, 1200, 1000), None, None, true).await;
        assert_eq!(sheet.append_attempts(), 1);
        assert!(session.in_backoff());

        writer.write(&snapshot(30, 30, 1210, 1001), None, None, true).await;
        assert_eq!(sheet.append_attempts(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        writer.write(&snapshot(31, 30, 1220, 1002), None, None, true).await;
        assert_eq!(sheet.append_attempts(), 2);
        assert_eq!(sheet.data_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_local_sink_receives_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.xlsx");
        let writer = DualSinkWriter::new(pair(), WriterConfig::default())
            .with_local(LocalWorkbookSink::new(&path, pair().header()));

        writer.write(&snapshot(29, 30, 1200, 1000), None, None, false).await;
        writer.write(&snapshot(30, 30, 1250, 1010), None, None, false).await;

        let rows = LocalWorkbookSink::new(&path, pair().header()).read().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].a_votes, 1250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_retries_after_cooldown() {
        let sheet = Arc::new(FakeSheet::new());
        sheet.fail_next_append(Failure::RateLimited);
        let (writer, _) = queued_writer(sheet.clone());
        let writer = Arc::new(writer);

        let worker = tokio::spawn(Arc::clone(&writer).run_worker());
        writer.write(&snapshot(29, 30, 1200, 1000), None, None, true).await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(sheet.data_rows().is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(sheet.data_rows().len(), 1);
        assert!(writer.queue().is_empty());

        worker.abort();
    }

    #[tokio::test]
    async fn test_remote_due_without_remote_sink() {
        let writer = DualSinkWriter::new(pair(), WriterConfig::default());
        assert!(writer.remote_due(Duration::from_secs(60), Utc::now()).await);
    }
}
