//! In-memory remote sheet for tests.

use crate::error::{Result, SheetError};
use crate::remote::{RemoteConnector, RemoteSheet};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vote_tracker_core::TrackedPairDiff;

/// Failure injected into the next append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    RateLimited,
    Network,
}

impl Failure {
    fn error(self) -> SheetError {
        match self {
            Self::RateLimited => SheetError::api(429, "Quota exceeded"),
            Self::Network => SheetError::Network("connection reset".to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    rows: Vec<Vec<String>>,
    marker: Option<String>,
    marker_unreadable: bool,
    formatted: Vec<u32>,
    append_failures: VecDeque<Failure>,
    appends: usize,
}

/// A sheet held in memory. Row 0 is the header.
#[derive(Debug)]
pub struct FakeSheet {
    state: Mutex<FakeState>,
}

impl Default for FakeSheet {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSheet {
    pub fn new() -> Self {
        let state = FakeState {
            rows: vec![vec!["Time".to_string()]],
            ..FakeState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Adds a raw row, as if written by another process.
    pub fn push_row(&self, cells: &[&str]) {
        self.state
            .lock()
            .rows
            .push(cells.iter().map(|c| (*c).to_string()).collect());
    }

    pub fn fail_next_append(&self, failure: Failure) {
        self.state.lock().append_failures.push_back(failure);
    }

    pub fn set_marker(&self, marker: Option<&str>) {
        self.state.lock().marker = marker.map(str::to_string);
    }

    pub fn make_marker_unreadable(&self) {
        self.state.lock().marker_unreadable = true;
    }

    #[must_use]
    pub fn marker(&self) -> Option<String> {
        self.state.lock().marker.clone()
    }

    /// All rows after the header.
    #[must_use]
    pub fn data_rows(&self) -> Vec<Vec<String>> {
        self.state.lock().rows.iter().skip(1).cloned().collect()
    }

    #[must_use]
    pub fn formatted_rows(&self) -> Vec<u32> {
        self.state.lock().formatted.clone()
    }

    /// Append attempts, failed ones included.
    #[must_use]
    pub fn append_attempts(&self) -> usize {
        self.state.lock().appends
    }
}

#[async_trait]
impl RemoteSheet for FakeSheet {
    async fn last_time_label(&self) -> Result<Option<String>> {
        let state = self.state.lock();
        if state.rows.len() < 2 {
            return Ok(None);
        }
        Ok(state.rows.last().and_then(|r| r.first()).cloned())
    }

    async fn append_row(&self, row: &TrackedPairDiff) -> Result<u32> {
        let mut state = self.state.lock();
        state.appends += 1;
        if let Some(failure) = state.append_failures.pop_front() {
            return Err(failure.error());
        }
        state.rows.push(vec![
            row.ts_label.clone(),
            row.a_votes.to_string(),
            row.a_diff.to_string(),
            row.b_votes.to_string(),
            row.b_diff.to_string(),
            row.gap.to_string(),
        ]);
        Ok(u32::try_from(state.rows.len()).unwrap_or(u32::MAX))
    }

    async fn format_row(&self, row_number: u32) -> Result<()> {
        self.state.lock().formatted.push(row_number);
        Ok(())
    }

    async fn read_marker(&self) -> Result<Option<String>> {
        let state = self.state.lock();
        if state.marker_unreadable {
            return Err(SheetError::Network("marker unreachable".to_string()));
        }
        Ok(state.marker.clone())
    }

    async fn write_marker(&self, unix_secs: i64) -> Result<()> {
        self.state.lock().marker = Some(unix_secs.to_string());
        Ok(())
    }

    async fn time_column(&self) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .rows
            .iter()
            .map(|r| r.first().cloned().unwrap_or_default())
            .collect())
    }

    async fn row_values(&self, index: usize) -> Result<Vec<String>> {
        Ok(self.state.lock().rows.get(index).cloned().unwrap_or_default())
    }
}

/// Connector that always hands out the same [`FakeSheet`].
#[derive(Debug)]
pub struct FakeConnector {
    sheet: Arc<FakeSheet>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(sheet: Arc<FakeSheet>) -> Self {
        Self {
            sheet,
            connects: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConnector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn RemoteSheet>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.sheet.clone())
    }
}

/// Connector that never connects.
#[derive(Debug)]
pub struct FailingConnector {
    attempts: Arc<AtomicUsize>,
    missing_credentials: bool,
}

impl FailingConnector {
    pub fn missing_credentials(attempts: Arc<AtomicUsize>) -> Self {
        Self {
            attempts,
            missing_credentials: true,
        }
    }

    pub fn network(attempts: Arc<AtomicUsize>) -> Self {
        Self {
            attempts,
            missing_credentials: false,
        }
    }
}

#[async_trait]
impl RemoteConnector for FailingConnector {
    async fn connect(&self) -> Result<Arc<dyn RemoteSheet>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.missing_credentials {
            Err(SheetError::MissingCredentials("no key configured".to_string()))
        } else {
            Err(SheetError::Network("connection refused".to_string()))
        }
    }
}
