//! Daemon configuration: JSON file, then command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use couch_watch_core::models::config::millis;
use couch_watch_core::{EscalationConfig, SessionConfig};
use couch_watch_ffmpeg::CameraSettings;

use crate::cli::Cli;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device: String,
    /// ffmpeg demuxer for the device; `null` lets ffmpeg detect the input format.
    pub input_format: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let settings = CameraSettings::default();
        Self {
            device: settings.device,
            input_format: settings.input_format,
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
        }
    }
}

impl CameraConfig {
    pub fn settings(&self) -> CameraSettings {
        CameraSettings {
            device: self.device.clone(),
            input_format: self.input_format.clone(),
            width: self.width,
            height: self.height,
            fps: self.fps,
        }
    }
}

/// Everything the daemon needs, as read from `--config`.
///
/// ```json
/// {
///   "escalation": { "detection_threshold_ms": 250, "alarm_threshold_ms": 1000 },
///   "camera": { "device": "/dev/video0", "width": 640, "height": 480, "fps": 10 },
///   "mask": "./roi_mask.pgm",
///   "detect": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub escalation: EscalationConfig,
    pub session: SessionConfig,
    pub camera: CameraConfig,
    pub mask: PathBuf,
    pub sounds_dir: PathBuf,
    pub outbox_dir: PathBuf,
    pub muted: bool,
    pub detect: bool,
    /// Operator channel poll timeout.
    #[serde(rename = "router_poll_ms", with = "millis")]
    pub router_poll: Duration,
    /// Delay before reopening the camera after the session ended.
    #[serde(rename = "session_retry_ms", with = "millis")]
    pub session_retry: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            escalation: EscalationConfig::default(),
            session: SessionConfig::default(),
            camera: CameraConfig::default(),
            mask: PathBuf::from("./roi_mask.pgm"),
            sounds_dir: PathBuf::from("./sounds"),
            outbox_dir: PathBuf::from("./outbox"),
            muted: false,
            detect: false,
            router_poll: Duration::from_millis(500),
            session_retry: Duration::from_secs(2),
        }
    }
}

impl WatchConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// File (if any) with the command-line flags applied on top.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, cli: &Cli) {
        if let Some(device) = &cli.device {
            self.camera.device = device.clone();
        }
        if let Some(width) = cli.width {
            self.camera.width = width;
        }
        if let Some(height) = cli.height {
            self.camera.height = height;
        }
        if let Some(fps) = cli.fps {
            self.camera.fps = fps;
        }
        if let Some(mask) = &cli.mask {
            self.mask = mask.clone();
        }
        if let Some(dir) = &cli.captures_dir {
            self.session.captures_dir = dir.clone();
        }
        if let Some(dir) = &cli.sounds_dir {
            self.sounds_dir = dir.clone();
        }
        if let Some(dir) = &cli.outbox_dir {
            self.outbox_dir = dir.clone();
        }
        self.muted |= cli.muted;
        self.detect |= cli.detect;
    }

    pub fn validate(&self) -> Result<()> {
        self.escalation
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid escalation settings")?;
        self.session
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid session settings")?;
        self.camera
            .settings()
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid camera settings")?;
        if self.router_poll.is_zero() {
            bail!("router poll must be positive");
        }
        Ok(())
    }
}
