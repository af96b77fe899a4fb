use crate::config::{AppConfig, ExecutionMode};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Environment prefix for overrides, e.g. `VOTE_TRACKER_POLL__POLL_ID`.
pub const ENV_PREFIX: &str = "VOTE_TRACKER_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, a TOML file, and environment variables.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    /// In stateless mode an unset fetch interval defaults to 5 seconds, since
    /// each tick includes the full upstream latency.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        let mut config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Self::overrides(path))
            .extract()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        let interval_overridden = Self::overrides(path)
            .find_value("poll.fetch_interval_secs")
            .is_ok();
        if config.persistence.execution_mode == ExecutionMode::Stateless && !interval_overridden {
            config.poll.fetch_interval_secs = 5;
        }

        config.validate()?;
        Ok(config)
    }

    /// User-supplied layers only, without defaults.
    fn overrides(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
