//! Remote sheet abstraction and its lazily connected session.

use crate::error::{Result, SheetError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use vote_tracker_core::TrackedPairDiff;

/// Operations the writer, throttle and recovery need from a remote sheet.
#[async_trait]
pub trait RemoteSheet: Send + Sync {
    /// Time label of the sheet's current last data row, `None` when only the
    /// header exists. Read fresh on every call.
    async fn last_time_label(&self) -> Result<Option<String>>;

    /// Appends a row and returns its 1-based sheet row number.
    async fn append_row(&self, row: &TrackedPairDiff) -> Result<u32>;

    /// Applies number formats and alignment to one row.
    async fn format_row(&self, row_number: u32) -> Result<()>;

    /// Raw marker cell text, `None` when empty.
    async fn read_marker(&self) -> Result<Option<String>>;

    /// Stores the last-write time in unix seconds.
    async fn write_marker(&self, unix_secs: i64) -> Result<()>;

    /// Column A, header included.
    async fn time_column(&self) -> Result<Vec<String>>;

    /// Cells of the row at `index` into [`RemoteSheet::time_column`].
    async fn row_values(&self, index: usize) -> Result<Vec<String>>;
}

/// Opens a [`RemoteSheet`], bootstrapping it on first use.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn RemoteSheet>>;
}

/// Caches one connected sheet and reconnects after [`RemoteSession::invalidate`].
///
/// Missing credentials disable the session for the life of the process.
/// A rate limit can pause it until a deadline.
pub struct RemoteSession {
    connector: Arc<dyn RemoteConnector>,
    sheet: Mutex<Option<Arc<dyn RemoteSheet>>>,
    disabled: AtomicBool,
    backoff_until: parking_lot::Mutex<Option<Instant>>,
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("disabled", &self.is_disabled())
            .finish_non_exhaustive()
    }
}

impl RemoteSession {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            connector,
            sheet: Mutex::new(None),
            disabled: AtomicBool::new(false),
            backoff_until: parking_lot::Mutex::new(None),
        }
    }

    /// Returns the connected sheet, connecting if needed.
    ///
    /// # Errors
    /// Returns [`SheetError::Disabled`] once credentials were found missing,
    /// otherwise the connection error.
    pub async fn sheet(&self) -> Result<Arc<dyn RemoteSheet>> {
        if self.is_disabled() {
            return Err(SheetError::Disabled);
        }

        let mut guard = self.sheet.lock().await;
        if let Some(sheet) = guard.as_ref() {
            return Ok(Arc::clone(sheet));
        }

        match self.connector.connect().await {
            Ok(sheet) => {
                *guard = Some(Arc::clone(&sheet));
                Ok(sheet)
            }
            Err(e @ SheetError::MissingCredentials(_)) => {
                self.disabled.store(true, Ordering::Relaxed);
                tracing::warn!(error = %e, "Remote sheet disabled");
                Err(e)
            }
            Err(e) => {
                tracing::error!(error = %e, "Remote sheet connection failed");
                Err(e)
            }
        }
    }

    /// Drops the cached sheet so the next call reconnects.
    pub async fn invalidate(&self) {
        *self.sheet.lock().await = None;
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    /// Pauses remote writes for `cooldown` from now.
    pub fn back_off(&self, cooldown: Duration) {
        *self.backoff_until.lock() = Some(Instant::now() + cooldown);
    }

    /// True while a rate-limit cooldown is running.
    #[must_use]
    pub fn in_backoff(&self) -> bool {
        let mut until = self.backoff_until.lock();
        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                false
            }
            None => false,
        }
    }
}
