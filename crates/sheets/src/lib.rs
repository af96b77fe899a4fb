//! Persistence sinks for tracked-pair rows.
//!
//! Two sinks receive the same six-column row:
//! - a local `.xlsx` workbook, rewritten with styling on every append
//! - a Google Sheet, written through a queue or inline with rate-limit backoff
//!
//! [`PersistenceThrottle`] gates how often rows are produced, and
//! [`DualSinkWriter`] fans each row out to whichever sinks are configured.

pub mod error;
pub mod google;
pub mod local;
pub mod remote;
pub mod row;
pub mod throttle;
pub mod writer;

#[cfg(any(test, feature = "test-harness"))]
pub mod testing;

pub use error::{Result, SheetError};
pub use google::{GoogleSheet, GoogleSheetsConnector, ServiceAccountKey, SheetsClient, TokenSource};
pub use local::{LocalWorkbookSink, SHEET_NAME};
pub use remote::{RemoteConnector, RemoteSession, RemoteSheet};
pub use row::{gap_display, row_values, ROW_WIDTH};
pub use throttle::{parse_marker, should_write_remote, PersistenceThrottle};
pub use writer::{DrainOutcome, DualSinkWriter, RowQueue, WriteMode, WriterConfig};
