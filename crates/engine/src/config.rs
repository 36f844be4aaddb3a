use std::time::Duration;

use chrono_tz::Tz;

/// Engine configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Local zone for day/week/month boundary arithmetic (default: `UTC`).
    pub timezone: Tz,
    /// Interval between overdue/reminder sweep ticks (default: `60`).
    pub sweep_interval_secs: u64,
    /// Upper bound on one snapshot save attempt (default: `5`).
    pub save_timeout_secs: u64,
    /// Delay before a failed snapshot save is retried (default: `10`).
    pub save_retry_secs: u64,
    /// Capacity of the serialized command queue (default: `64`).
    pub command_buffer: usize,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `CHORE_TIMEZONE`      | `UTC`   |
    /// | `SWEEP_INTERVAL_SECS` | `60`    |
    /// | `SAVE_TIMEOUT_SECS`   | `5`     |
    /// | `SAVE_RETRY_SECS`     | `10`    |
    /// | `COMMAND_BUFFER`      | `64`    |
    pub fn from_env() -> Self {
        let timezone: Tz = std::env::var("CHORE_TIMEZONE")
            .unwrap_or_else(|_| "UTC".into())
            .parse()
            .expect("CHORE_TIMEZONE must be a valid IANA zone name");

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("SWEEP_INTERVAL_SECS must be a valid u64");

        let save_timeout_secs: u64 = std::env::var("SAVE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SAVE_TIMEOUT_SECS must be a valid u64");

        let save_retry_secs: u64 = std::env::var("SAVE_RETRY_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("SAVE_RETRY_SECS must be a valid u64");

        let command_buffer: usize = std::env::var("COMMAND_BUFFER")
            .unwrap_or_else(|_| "64".into())
            .parse()
            .expect("COMMAND_BUFFER must be a valid usize");

        Self {
            timezone,
            sweep_interval_secs,
            save_timeout_secs,
            save_retry_secs,
            command_buffer,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }

    pub fn save_retry(&self) -> Duration {
        Duration::from_secs(self.save_retry_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            sweep_interval_secs: 60,
            save_timeout_secs: 5,
            save_retry_secs: 10,
            command_buffer: 64,
        }
    }
}
