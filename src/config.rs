//! Configuration types.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::error::ConfigError;

/// Offer deadline shown by the countdown: the last second of September 2025, IST.
pub const DEFAULT_DEADLINE: &str = "2025-09-30T23:59:59+05:30";

/// Wizard configuration.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Relay endpoint that receives the final form-encoded POST.
    pub relay_url: String,
    /// Upper bound on a single relay request.
    pub submit_timeout: Duration,
    /// Countdown recompute cadence.
    pub tick_interval: Duration,
    /// Delay between mount and the wizard opening itself.
    pub show_delay: Duration,
    /// Fixed instant the countdown runs toward.
    pub deadline: DateTime<FixedOffset>,
    /// Mounted wizards no request reaches for this long are unmounted.
    pub session_idle_ttl: Duration,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:8081/intake".to_string(),
            submit_timeout: Duration::from_secs(30),
            tick_interval: Duration::from_secs(1),
            show_delay: Duration::from_secs(4),
            deadline: default_deadline(),
            session_idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

fn default_deadline() -> DateTime<FixedOffset> {
    // Constant is checked by `default_deadline_parses`.
    DateTime::parse_from_rfc3339(DEFAULT_DEADLINE).unwrap_or_default()
}

impl WizardConfig {
    /// Load configuration from `WIZARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `WIZARD_RELAY_URL` is required; everything else falls back to
    /// [`WizardConfig::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let relay_url = lookup("WIZARD_RELAY_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "WIZARD_RELAY_URL".into(),
                hint: "Set it to the intake endpoint that receives submissions.".into(),
            })?;
        if !relay_url.starts_with("http://") && !relay_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "WIZARD_RELAY_URL".into(),
                message: format!("expected an http(s) URL, got {relay_url}"),
            });
        }

        let submit_timeout = match lookup("WIZARD_SUBMIT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_u64("WIZARD_SUBMIT_TIMEOUT_SECS", &raw)?),
            None => defaults.submit_timeout,
        };
        let tick_interval = match lookup("WIZARD_TICK_MS") {
            Some(raw) => Duration::from_millis(parse_u64("WIZARD_TICK_MS", &raw)?),
            None => defaults.tick_interval,
        };
        let show_delay = match lookup("WIZARD_SHOW_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_u64("WIZARD_SHOW_DELAY_MS", &raw)?),
            None => defaults.show_delay,
        };
        let session_idle_ttl = match lookup("WIZARD_SESSION_IDLE_SECS") {
            Some(raw) => Duration::from_secs(parse_u64("WIZARD_SESSION_IDLE_SECS", &raw)?),
            None => defaults.session_idle_ttl,
        };
        let deadline = match lookup("WIZARD_DEADLINE") {
            Some(raw) => DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "WIZARD_DEADLINE".into(),
                    message: e.to_string(),
                }
            })?,
            None => defaults.deadline,
        };

        for (key, value) in [
            ("WIZARD_SUBMIT_TIMEOUT_SECS", submit_timeout),
            ("WIZARD_TICK_MS", tick_interval),
            ("WIZARD_SESSION_IDLE_SECS", session_idle_ttl),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be greater than zero".into(),
                });
            }
        }

        Ok(Self {
            relay_url,
            submit_timeout,
            tick_interval,
            show_delay,
            deadline,
            session_idle_ttl,
        })
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected a non-negative integer, got {raw:?}"),
    })
}
