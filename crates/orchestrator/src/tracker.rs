//! The tick loop tying the fetcher, shared state and sinks together.

use crate::recovery::recover_from_history;
use crate::state::TrackerState;
use crate::view::CurrentStateView;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use vote_tracker_bstage::{PollFetcher, PollFetcherConfig, SessionConfig, SessionManager};
use vote_tracker_core::{
    AppConfig, DayRolloverTracker, ExecutionMode, Snapshot, SnapshotStore, TrackedPair,
};
use vote_tracker_sheets::{
    DualSinkWriter, GoogleSheetsConnector, LocalWorkbookSink, PersistenceThrottle, RemoteSession,
    WriteMode, WriterConfig,
};

const FETCH_FAILED: &str = "Failed to fetch poll results. Retrying...";

/// Timing and mode settings resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub mode: ExecutionMode,
    pub fetch_interval: Duration,
    pub write_interval: Duration,
    pub history_capacity: usize,
    pub snapshot_offset: FixedOffset,
    pub rollover_offset: FixedOffset,
}

impl TrackerSettings {
    /// # Errors
    /// Returns error if a timezone offset is out of range.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            mode: config.persistence.execution_mode,
            fetch_interval: config.fetch_interval(),
            write_interval: config.write_interval(),
            history_capacity: config.history.capacity,
            snapshot_offset: config.snapshot_offset()?,
            rollover_offset: config.rollover_offset()?,
        })
    }
}

/// Owns the live state and runs fetch ticks against it.
pub struct VoteTracker {
    settings: TrackerSettings,
    fetcher: PollFetcher,
    writer: Arc<DualSinkWriter>,
    state: Mutex<TrackerState>,
    recovery_attempted: AtomicBool,
}

impl std::fmt::Debug for VoteTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteTracker")
            .field("mode", &self.settings.mode)
            .field("fetcher", &self.fetcher)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl VoteTracker {
    pub fn new(settings: TrackerSettings, fetcher: PollFetcher, writer: DualSinkWriter) -> Self {
        let state = TrackerState::new(
            SnapshotStore::new(settings.history_capacity),
            PersistenceThrottle::new(settings.write_interval),
            DayRolloverTracker::new(settings.rollover_offset, settings.snapshot_offset),
        );
        Self {
            settings,
            fetcher,
            writer: Arc::new(writer),
            state: Mutex::new(state),
            recovery_attempted: AtomicBool::new(false),
        }
    }

    /// Wires the session, fetcher and sinks described by `config`.
    ///
    /// The local workbook is skipped in stateless mode.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        let settings = TrackerSettings::from_config(config)?;
        let stateless = config.is_stateless();
        let timeout = Duration::from_secs(config.poll.request_timeout_secs);

        let session = Arc::new(
            SessionManager::new(SessionConfig::from_config(
                &config.bstage,
                config.poll.request_timeout_secs,
            ))
            .context("Failed to create BStage session")?,
        );
        let fetcher = PollFetcher::new(PollFetcherConfig::from_config(config)?, session)
            .context("Failed to create poll fetcher")?;

        let pair = config.tracked_pair();
        let mut writer = DualSinkWriter::new(
            pair.clone(),
            WriterConfig::from_config(&config.persistence, stateless),
        );
        if config.persistence.local_enabled && !stateless {
            writer = writer.with_local(LocalWorkbookSink::new(&config.persistence.local_path, pair.header()));
        }
        if config.persistence.remote_enabled {
            let connector = GoogleSheetsConnector::new(config.google.clone(), pair.header(), timeout);
            writer = writer.with_remote(Arc::new(RemoteSession::new(Arc::new(connector))));
        }

        Ok(Self::new(settings, fetcher, writer))
    }

    #[must_use]
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    #[must_use]
    pub fn writer(&self) -> &Arc<DualSinkWriter> {
        &self.writer
    }

    #[must_use]
    pub fn pair(&self) -> &TrackedPair {
        self.writer.pair()
    }

    /// One rollover check, fetch and (throttled) persist.
    ///
    /// Returns whether the fetch succeeded.
    pub async fn tick(&self) -> bool {
        self.check_day_change(Utc::now());

        let Some(reading) = self.fetcher.fetch().await else {
            self.record_fetch_failure();
            return false;
        };

        let total = reading.snapshot.total;
        let candidates = reading.snapshot.candidates.len();
        self.state.lock().apply(reading.snapshot, reading.metadata);
        tracing::info!(total, candidates, "Poll fetched");

        self.persist(Utc::now()).await;
        true
    }

    /// Captures the previous day when the rollover date has changed.
    pub fn check_day_change(&self, now: DateTime<Utc>) -> bool {
        let now = now.with_timezone(&self.settings.rollover_offset);
        self.state.lock().check_day_change(&now)
    }

    fn record_fetch_failure(&self) {
        let auth_error = self.fetcher.session().last_error();
        let mut state = self.state.lock();
        match auth_error {
            Some(e) => state.error = Some(format!("Authentication failed: {e}")),
            None if state.error.is_none() => state.error = Some(FETCH_FAILED.to_string()),
            None => {}
        }
        tracing::warn!(error = state.error.as_deref().unwrap_or_default(), "Poll fetch failed");
    }

    async fn persist(&self, now: DateTime<Utc>) {
        let due = match self.settings.mode {
            ExecutionMode::LongLived => self.local_due(now),
            ExecutionMode::Stateless => {
                self.writer
                    .remote_due(self.settings.write_interval, now)
                    .await
            }
        };
        if !due {
            return;
        }

        let (inputs, baseline) = {
            let state = self.state.lock();
            (state.write_inputs(), state.throttle.baseline())
        };
        let Some((current, previous)) = inputs else {
            return;
        };

        if let Some(row) = self
            .writer
            .write(&current, baseline, previous.as_ref(), true)
            .await
        {
            self.state.lock().throttle.record_write(now, row.baseline());
        }
    }

    fn local_due(&self, now: DateTime<Utc>) -> bool {
        self.state.lock().throttle.should_write_local(now)
    }

    /// Ticks forever at the fetch interval.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.settings.fetch_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.settings.fetch_interval.as_secs(),
            "Tick loop started"
        );
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Starts the tick loop and, in queued mode, the remote writer.
    pub fn spawn_background(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(2);
        if self.writer.mode() == WriteMode::Queued && self.writer.remote().is_some() {
            handles.push(tokio::spawn(Arc::clone(&self.writer).run_worker()));
        }
        handles.push(tokio::spawn(Arc::clone(self).run()));
        handles
    }

    /// Fires a detached tick.
    pub fn trigger_refresh(self: &Arc<Self>) {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            tracker.tick().await;
        });
    }

    /// Stateless entry point: recovers once, then ticks unless data is fresh.
    pub async fn refresh_if_stale(&self) {
        self.recover_previous_day().await;

        let last = self.state.lock().last_updated;
        let fresh = last.is_some_and(|ts| {
            (Utc::now() - ts.with_timezone(&Utc))
                .to_std()
                .is_ok_and(|age| age < self.settings.fetch_interval)
        });
        if fresh {
            tracing::debug!("Data fresh, skipping on-demand fetch");
            return;
        }
        self.tick().await;
    }

    /// Loads the previous day's result from the remote sheet.
    ///
    /// Only the first call does any work. Returns whether a fact was loaded.
    pub async fn recover_previous_day(&self) -> bool {
        if self.recovery_attempted.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.recover_at(Utc::now()).await
    }

    async fn recover_at(&self, now: DateTime<Utc>) -> bool {
        let Some(session) = self.writer.remote() else {
            return false;
        };
        let sheet = match session.sheet().await {
            Ok(sheet) => sheet,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load previous day");
                return false;
            }
        };

        let rollover = self.state.lock().rollover.clone();
        let today = rollover.date_of(&now);
        let recovered = match recover_from_history(sheet.as_ref(), &rollover, self.pair(), now).await {
            Ok(fact) => fact,
            Err(e) => {
                tracing::warn!(error = %e, "Previous day recovery failed");
                None
            }
        };

        let mut state = self.state.lock();
        state.rollover.mark_recovered(today);
        match recovered {
            Some(fact) => {
                state.previous_day = fact;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn current_state(&self) -> CurrentStateView {
        CurrentStateView::build(&self.state.lock(), self.settings.fetch_interval.as_secs())
    }

    /// Snapshot history in append order.
    #[must_use]
    pub fn history(&self) -> Vec<Snapshot> {
        self.state.lock().store.to_vec()
    }
}
