use once_cell::sync::Lazy;
use std::{env, str::FromStr, time::Duration};

/// Controller tunables, read once from the environment.
pub struct Settings {
    pub event_buffer_capacity: usize,
    pub sdk_poll_interval: Duration,
    pub gate_check_interval: Duration,
    pub player_check_timeout: Duration,
    pub seeked_debounce: Duration,
    pub play_retry_interval: Duration,
    pub pause_seeked_timeout: Duration,
    pub twitch_placeholder_channel: String,
}

impl Settings {
    fn from_env() -> Self {
        // a .env file is optional
        let _ = dotenvy::dotenv();

        Settings {
            event_buffer_capacity: env_or("EVENT_BUFFER_CAPACITY", 100),
            sdk_poll_interval: millis_or("SDK_POLL_INTERVAL_MS", 500),
            gate_check_interval: millis_or("GATE_CHECK_INTERVAL_MS", 500),
            player_check_timeout: millis_or("PLAYER_CHECK_TIMEOUT_MS", 5_000),
            seeked_debounce: millis_or("SEEKED_DEBOUNCE_MS", 1_000),
            play_retry_interval: millis_or("PLAY_RETRY_INTERVAL_MS", 50),
            pause_seeked_timeout: millis_or("PAUSE_SEEKED_TIMEOUT_MS", 250),
            twitch_placeholder_channel: env::var("TWITCH_PLACEHOLDER_CHANNEL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "twitchdev".to_string()),
        }
    }

    /// Timer settings handed to a controller at construction.
    pub fn timings(&self) -> ControllerTimings {
        ControllerTimings {
            sdk_poll_interval: self.sdk_poll_interval,
            gate_check_interval: self.gate_check_interval,
            player_check_timeout: self.player_check_timeout,
            seeked_debounce: self.seeked_debounce,
            play_retry_interval: self.play_retry_interval,
            pause_seeked_timeout: self.pause_seeked_timeout,
        }
    }
}

fn env_or<T: FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn millis_or(var: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_or(var, default_ms))
}

/// Global settings instance
pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

/// Per-controller copy of the timer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTimings {
    pub sdk_poll_interval: Duration,
    pub gate_check_interval: Duration,
    pub player_check_timeout: Duration,
    pub seeked_debounce: Duration,
    pub play_retry_interval: Duration,
    pub pause_seeked_timeout: Duration,
}

impl ControllerTimings {
    /// Built-in values, ignoring the environment.
    pub const STANDARD: ControllerTimings = ControllerTimings {
        sdk_poll_interval: Duration::from_millis(500),
        gate_check_interval: Duration::from_millis(500),
        player_check_timeout: Duration::from_millis(5_000),
        seeked_debounce: Duration::from_millis(1_000),
        play_retry_interval: Duration::from_millis(50),
        pause_seeked_timeout: Duration::from_millis(250),
    };
}

impl Default for ControllerTimings {
    fn default() -> Self {
        SETTINGS.timings()
    }
}
