use crate::models::TrackedPair;
use crate::snapshot_store::DEFAULT_HISTORY_CAPACITY;
use crate::time::offset_from_hours;
use anyhow::{bail, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub poll: PollConfig,
    pub bstage: BstageConfig,
    pub tracking: TrackingConfig,
    pub timezones: TimezoneConfig,
    pub history: HistoryConfig,
    pub persistence: PersistenceConfig,
    pub google: GoogleSheetsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub poll_id: String,
    /// Seconds between ticks. Also the freshness window in stateless mode.
    pub fetch_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BstageConfig {
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub account_url: String,
    pub app_url: String,
    pub space_id: String,
    pub redirect_uri: String,
    /// Proactive token lease, shorter than the provider TTL.
    pub token_lease_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub a_name: String,
    pub a_label: String,
    pub b_name: String,
    pub b_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneConfig {
    pub snapshot_offset_hours: i32,
    pub rollover_offset_hours: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub capacity: usize,
}

/// How the process is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Background tick loop and remote writer task.
    LongLived,
    /// One tick per request; no background tasks, no local filesystem.
    Stateless,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub execution_mode: ExecutionMode,
    pub write_interval_secs: u64,
    pub local_enabled: bool,
    pub local_path: String,
    pub remote_enabled: bool,
    pub queue_capacity: usize,
    pub rate_limit_cooldown_secs: u64,
    pub retry_delay_secs: u64,
    pub init_retry_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSheetsConfig {
    pub spreadsheet_id: String,
    /// Service-account key as inline JSON. Takes precedence over the path.
    #[serde(default)]
    pub credentials_json: Option<String>,
    #[serde(default)]
    pub credentials_path: Option<String>,
    pub throttle_sheet: String,
    pub api_url: String,
    pub token_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5050,
            },
            poll: PollConfig {
                poll_id: "698ecd18c1bbe47a262c4f4b".to_string(),
                fetch_interval_secs: 3,
                request_timeout_secs: 15,
                requests_per_minute: 120,
            },
            bstage: BstageConfig {
                email: String::new(),
                password: String::new(),
                account_url: "https://account.bstage.in".to_string(),
                app_url: "https://bstageplus.com".to_string(),
                space_id: "flnk-official".to_string(),
                redirect_uri: "https://bstageplus.com/account/login-callback/bstage".to_string(),
                token_lease_secs: 25 * 60,
            },
            tracking: TrackingConfig {
                a_name: "T1 Doran".to_string(),
                a_label: "Doran".to_string(),
                b_name: "Hanwha Life Esports Gumayusi".to_string(),
                b_label: "Gumayusi".to_string(),
            },
            timezones: TimezoneConfig {
                snapshot_offset_hours: 7,
                rollover_offset_hours: 9,
            },
            history: HistoryConfig {
                capacity: DEFAULT_HISTORY_CAPACITY,
            },
            persistence: PersistenceConfig {
                execution_mode: ExecutionMode::LongLived,
                write_interval_secs: 60,
                local_enabled: true,
                local_path: "result.xlsx".to_string(),
                remote_enabled: true,
                queue_capacity: 500,
                rate_limit_cooldown_secs: 60,
                retry_delay_secs: 5,
                init_retry_secs: 10,
            },
            google: GoogleSheetsConfig {
                spreadsheet_id: String::new(),
                credentials_json: None,
                credentials_path: None,
                throttle_sheet: "_throttle".to_string(),
                api_url: "https://sheets.googleapis.com/v4".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Checks values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.poll.poll_id.trim().is_empty() {
            bail!("poll.poll_id must not be empty");
        }
        if self.poll.fetch_interval_secs == 0 {
            bail!("poll.fetch_interval_secs must be positive");
        }
        if self.poll.requests_per_minute == 0 {
            bail!("poll.requests_per_minute must be positive");
        }
        if self.persistence.write_interval_secs == 0 {
            bail!("persistence.write_interval_secs must be positive");
        }
        if self.history.capacity == 0 {
            bail!("history.capacity must be positive");
        }
        if self.persistence.queue_capacity == 0 {
            bail!("persistence.queue_capacity must be positive");
        }
        if self.tracking.a_name.trim() == self.tracking.b_name.trim() {
            bail!("tracking.a_name and tracking.b_name must differ");
        }
        self.snapshot_offset()?;
        self.rollover_offset()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error when the configured hours are out of range.
    pub fn snapshot_offset(&self) -> Result<FixedOffset> {
        match offset_from_hours(self.timezones.snapshot_offset_hours) {
            Some(offset) => Ok(offset),
            None => bail!(
                "timezones.snapshot_offset_hours out of range: {}",
                self.timezones.snapshot_offset_hours
            ),
        }
    }

    /// # Errors
    ///
    /// Returns an error when the configured hours are out of range.
    pub fn rollover_offset(&self) -> Result<FixedOffset> {
        match offset_from_hours(self.timezones.rollover_offset_hours) {
            Some(offset) => Ok(offset),
            None => bail!(
                "timezones.rollover_offset_hours out of range: {}",
                self.timezones.rollover_offset_hours
            ),
        }
    }

    #[must_use]
    pub fn tracked_pair(&self) -> TrackedPair {
        TrackedPair::new(self.tracking.a_name.trim(), self.tracking.b_name.trim())
            .with_labels(&self.tracking.a_label, &self.tracking.b_label)
    }

    #[must_use]
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.poll.fetch_interval_secs)
    }

    #[must_use]
    pub fn write_interval(&self) -> Duration {
        Duration::from_secs(self.persistence.write_interval_secs)
    }

    #[must_use]
    pub fn is_stateless(&self) -> bool {
        self.persistence.execution_mode == ExecutionMode::Stateless
    }
}
