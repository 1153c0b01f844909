//! Camera frames read from an ffmpeg child process.
//!
//! ffmpeg decodes the device (or any input URL) and writes raw 8-bit gray
//! frames of a fixed size to its stdout; each frame is exactly
//! `width * height` bytes.

use std::io::{ErrorKind, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

use log::{debug, info, warn};

use couch_watch_core::models::error::WatchError;
use couch_watch_core::models::frame::Frame;
use couch_watch_core::traits::frame_source::FrameSource;

use crate::tools;

/// Input parameters for the camera process.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    /// Device path or any input ffmpeg accepts.
    pub device: String,
    /// Demuxer passed with `-f`, e.g. `v4l2`. `None` lets ffmpeg detect the format.
    pub input_format: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            input_format: Some("v4l2".into()),
            width: 640,
            height: 480,
            fps: 10.0,
        }
    }
}

impl CameraSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.device.is_empty() {
            return Err("device must not be empty".into());
        }
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "frame size {}x{} is invalid",
                self.width, self.height
            ));
        }
        if self.fps.is_nan() || self.fps <= 0.0 {
            return Err(format!("frame rate {} must be positive", self.fps));
        }
        Ok(())
    }

    /// ffmpeg arguments producing raw gray frames on stdout.
    pub fn capture_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
        if let Some(format) = &self.input_format {
            args.extend(["-f".into(), format.clone()]);
            args.extend(["-framerate".into(), format!("{}", self.fps)]);
            args.extend([
                "-video_size".into(),
                format!("{}x{}", self.width, self.height),
            ]);
        }
        args.extend(["-i".into(), self.device.clone()]);
        args.extend([
            "-vf".into(),
            format!("fps={},scale={}:{}", self.fps, self.width, self.height),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "gray".into(),
            "-".into(),
        ]);
        args
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

pub struct FfmpegFrameSource {
    settings: CameraSettings,
    child: Child,
    stdout: ChildStdout,
}

impl FfmpegFrameSource {
    /// Start the camera process.
    pub fn open(settings: CameraSettings) -> Result<Self, WatchError> {
        settings
            .validate()
            .map_err(WatchError::ConfigurationFailed)?;

        let mut child = Command::new(tools::ffmpeg_path())
            .args(settings.capture_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                WatchError::DeviceNotAvailable(format!(
                    "failed to start ffmpeg for {}: {}",
                    settings.device, e
                ))
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(WatchError::DeviceNotAvailable(
                    "ffmpeg stdout not captured".into(),
                ));
            }
        };

        info!(
            "Camera {} opened at {}x{} @ {} fps",
            settings.device, settings.width, settings.height, settings.fps
        );
        Ok(Self {
            settings,
            child,
            stdout,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, WatchError> {
        let mut data = vec![0u8; self.settings.frame_len()];
        match self.stdout.read_exact(&mut data) {
            Ok(()) => Ok(Some(Frame::new(
                self.settings.width,
                self.settings.height,
                data,
            ))),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("Camera stream {} ended", self.settings.device);
                Err(WatchError::FrameReadFailed(format!(
                    "camera stream {} ended",
                    self.settings.device
                )))
            }
            Err(e) => Err(WatchError::FrameReadFailed(e.to_string())),
        }
    }

    fn frame_rate(&self) -> f64 {
        self.settings.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.settings.width, self.settings.height)
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            if e.kind() != ErrorKind::InvalidInput {
                warn!("Failed to stop camera process: {}", e);
            }
        }
        let _ = self.child.wait();
    }
}
