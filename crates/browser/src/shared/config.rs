use loadfence_core::{SignalKind, TrackerError};
use std::env;
use std::time::Duration;

pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DRAW_CONFIRM_DELAY_MS: u64 = 100;

pub const ENV_DEFAULT_DELAY_MS: &str = "LOADFENCE_DEFAULT_DELAY_MS";
pub const ENV_DRAW_CONFIRM_DELAY_MS: &str = "LOADFENCE_DRAW_CONFIRM_DELAY_MS";

/// Delays applied to the two completion signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Safety margin after progress reports 100%. Some engines report 100%
    /// before visual and network work has settled.
    pub default_delay: Duration,
    /// Quiet period after the last frame drawn once progress reached 100%.
    pub draw_confirm_delay: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_delay: Duration::from_millis(DEFAULT_DELAY_MS),
            draw_confirm_delay: Duration::from_millis(DRAW_CONFIRM_DELAY_MS),
        }
    }
}

impl TrackerConfig {
    pub fn with_default_delay(mut self, ms: u64) -> Self {
        self.default_delay = Duration::from_millis(ms);
        self
    }

    pub fn with_draw_confirm_delay(mut self, ms: u64) -> Self {
        self.draw_confirm_delay = Duration::from_millis(ms);
        self
    }

    pub fn fast() -> Self {
        Self {
            default_delay: Duration::from_millis(500),
            draw_confirm_delay: Duration::from_millis(50),
        }
    }

    pub fn patient() -> Self {
        Self {
            default_delay: Duration::from_millis(3000),
            draw_confirm_delay: Duration::from_millis(250),
        }
    }

    pub fn delay_for(&self, kind: SignalKind) -> Duration {
        match kind {
            SignalKind::Default => self.default_delay,
            SignalKind::DrawConfirm => self.draw_confirm_delay,
        }
    }

    /// The draw confirmation only helps if it can beat the default delay.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.default_delay.is_zero() {
            return Err(TrackerError::invalid_config("default_delay", "0ms"));
        }
        if self.draw_confirm_delay >= self.default_delay {
            return Err(TrackerError::invalid_config(
                "draw_confirm_delay",
                format!(
                    "{}ms (must be shorter than default_delay {}ms)",
                    self.draw_confirm_delay.as_millis(),
                    self.default_delay.as_millis()
                ),
            ));
        }
        Ok(())
    }

    /// Reads overrides from the environment, falling back to the defaults for
    /// anything unset or unparsable. If the overrides together fail
    /// [`TrackerConfig::validate`], the defaults are used instead.
    ///
    /// - `LOADFENCE_DEFAULT_DELAY_MS` (default: 1000)
    /// - `LOADFENCE_DRAW_CONFIRM_DELAY_MS` (default: 100)
    pub fn from_env() -> Self {
        Self::from_lookup_lenient(|key| env::var(key).ok())
    }

    /// Like [`TrackerConfig::from_env`], but rejects malformed values and
    /// validates the result.
    pub fn try_from_env() -> Result<Self, TrackerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup_lenient(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, fallback: u64| {
            lookup(key)
                .and_then(|val| val.trim().parse::<u64>().ok())
                .unwrap_or(fallback)
        };
        let config = Self::default()
            .with_default_delay(read(ENV_DEFAULT_DELAY_MS, DEFAULT_DELAY_MS))
            .with_draw_confirm_delay(read(ENV_DRAW_CONFIRM_DELAY_MS, DRAW_CONFIRM_DELAY_MS));
        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!(error = %e, ?config, "ignoring tracker delay overrides");
                Self::default()
            }
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TrackerError> {
        let read = |key: &str, fallback: u64| -> Result<u64, TrackerError> {
            match lookup(key) {
                None => Ok(fallback),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| TrackerError::invalid_config(key, raw)),
            }
        };
        let config = Self::default()
            .with_default_delay(read(ENV_DEFAULT_DELAY_MS, DEFAULT_DELAY_MS)?)
            .with_draw_confirm_delay(read(ENV_DRAW_CONFIRM_DELAY_MS, DRAW_CONFIRM_DELAY_MS)?);
        config.validate()?;
        Ok(config)
    }
}
