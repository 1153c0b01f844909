use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time thresholds driving detection escalation.
///
/// All thresholds are measured from the first detection of an episode,
/// except the cancellation window which is also checked against the last one.
/// In configuration files every duration is written in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Episode age at which recording starts (default: 250 ms).
    #[serde(rename = "detection_threshold_ms", with = "millis")]
    pub detection_threshold: Duration,

    /// Quiet window after which an un-alarmed episode is cancelled (default: 600 ms).
    #[serde(rename = "cancellation_threshold_ms", with = "millis")]
    pub cancellation_threshold: Duration,

    /// Episode age at which the alarm fires (default: 1 s).
    #[serde(rename = "alarm_threshold_ms", with = "millis")]
    pub alarm_threshold: Duration,

    /// Episode age at which an active recording is stopped and kept (default: 5 s).
    #[serde(rename = "recording_duration_ms", with = "millis")]
    pub recording_duration: Duration,

    /// Hard upper bound on episode length (default: 60 s).
    #[serde(rename = "wait_duration_ms", with = "millis")]
    pub wait_duration: Duration,

    /// Clock ticker period (default: 100 ms).
    #[serde(rename = "tick_interval_ms", with = "millis")]
    pub tick_interval: Duration,
}

impl EscalationConfig {
    pub fn validate(&self) -> Result<(), String> {
        let named = [
            ("detection threshold", self.detection_threshold),
            ("cancellation threshold", self.cancellation_threshold),
            ("alarm threshold", self.alarm_threshold),
            ("recording duration", self.recording_duration),
            ("wait duration", self.wait_duration),
            ("tick interval", self.tick_interval),
        ];
        if let Some((name, _)) = named.iter().find(|(_, d)| d.is_zero()) {
            return Err(format!("{} must be positive", name));
        }
        if self.tick_interval > self.cancellation_threshold {
            return Err(format!(
                "tick interval {:?} exceeds cancellation threshold {:?}",
                self.tick_interval, self.cancellation_threshold
            ));
        }
        Ok(())
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            detection_threshold: Duration::from_millis(250),
            cancellation_threshold: Duration::from_millis(600),
            alarm_threshold: Duration::from_secs(1),
            recording_duration: Duration::from_secs(5),
            wait_duration: Duration::from_secs(60),
            tick_interval: Duration::from_millis(100),
        }
    }
}

/// Configuration for the capture session loop and its command queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory where photos and recordings are written.
    pub captures_dir: PathBuf,

    /// How long an idle session waits for a command before re-checking.
    #[serde(rename = "idle_poll_ms", with = "millis")]
    pub idle_poll: Duration,

    /// Capacity of the command queue toward the session.
    pub command_capacity: usize,

    /// Consecutive command delivery failures before the drop is reported as an error.
    pub max_command_failures: u32,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.idle_poll.is_zero() {
            return Err("idle poll must be positive".into());
        }
        if self.command_capacity == 0 {
            return Err("command capacity must be at least 1".into());
        }
        if self.max_command_failures == 0 {
            return Err("max command failures must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            captures_dir: PathBuf::from("./captures"),
            idle_poll: Duration::from_millis(100),
            command_capacity: 32,
            max_command_failures: 10,
        }
    }
}

/// Serde adapter storing a `Duration` as whole milliseconds.
pub mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
