//! Motion-JPEG AVI recorder fed through an ffmpeg stdin pipe.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use log::{debug, warn};

use couch_watch_core::models::error::WatchError;
use couch_watch_core::models::frame::Frame;
use couch_watch_core::storage::capture_files;
use couch_watch_core::traits::recorder::Recorder;

use crate::tools;

struct ActiveRecording {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl ActiveRecording {
    fn stop(&mut self) {
        self.stdin.take();
        if let Err(e) = self.child.kill() {
            if e.kind() != ErrorKind::InvalidInput {
                warn!("Failed to stop encoder for {}: {}", self.path.display(), e);
            }
        }
        let _ = self.child.wait();
    }
}

/// Encodes raw gray frames into an MJPEG `.avi` file.
pub struct FfmpegRecorder {
    quality: u8,
    active: Option<ActiveRecording>,
}

impl Default for FfmpegRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRecorder {
    pub fn new() -> Self {
        Self {
            quality: 5,
            active: None,
        }
    }

    /// MJPEG quantiser, 2 (best) to 31 (worst).
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(2, 31);
        self
    }

    pub fn record_args(&self, path: &Path, fps: f64, width: u32, height: u32) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "gray".into(),
            "-s".into(),
            format!("{}x{}", width, height),
            "-r".into(),
            format!("{}", fps),
            "-i".into(),
            "-".into(),
            "-c:v".into(),
            "mjpeg".into(),
            "-q:v".into(),
            self.quality.to_string(),
            path.to_string_lossy().into_owned(),
        ]
    }
}

impl Recorder for FfmpegRecorder {
    fn open(&mut self, path: &Path, fps: f64, width: u32, height: u32) -> Result<(), WatchError> {
        if self.active.is_some() {
            return Err(WatchError::EncodingFailed(
                "a recording is already open".into(),
            ));
        }

        let mut child = Command::new(tools::ffmpeg_path())
            .args(self.record_args(path, fps, width, height))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| WatchError::EncodingFailed(format!("failed to start encoder: {}", e)))?;
        let stdin = child.stdin.take();

        debug!("Encoder started for {}", path.display());
        self.active = Some(ActiveRecording {
            path: path.to_path_buf(),
            width,
            height,
            child,
            stdin,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), WatchError> {
        let active = self
            .active
            .as_mut()
            .ok_or_else(|| WatchError::EncodingFailed("no recording is open".into()))?;

        if (frame.width, frame.height) != (active.width, active.height) {
            return Err(WatchError::EncodingFailed(format!(
                "frame {}x{} does not match recording {}x{}",
                frame.width, frame.height, active.width, active.height
            )));
        }

        let stdin = active
            .stdin
            .as_mut()
            .ok_or_else(|| WatchError::EncodingFailed("encoder input closed".into()))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| WatchError::EncodingFailed(format!("encoder write failed: {}", e)))
    }

    fn close(&mut self) -> Result<PathBuf, WatchError> {
        let mut active = self
            .active
            .take()
            .ok_or_else(|| WatchError::EncodingFailed("no recording is open".into()))?;

        // EOF on stdin lets ffmpeg finish the container.
        active.stdin.take();
        let status = active
            .child
            .wait()
            .map_err(|e| WatchError::EncodingFailed(format!("encoder wait failed: {}", e)))?;

        if !status.success() {
            let _ = capture_files::discard(&active.path);
            return Err(WatchError::EncodingFailed(format!(
                "encoder exited with code {}",
                status.code().unwrap_or(-1)
            )));
        }
        Ok(active.path)
    }

    fn discard(&mut self) -> Result<(), WatchError> {
        if let Some(mut active) = self.active.take() {
            active.stop();
            capture_files::discard(&active.path)?;
            debug!("Recording {} discarded", active.path.display());
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.active.is_some()
    }

    fn extension(&self) -> &str {
        "avi"
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.stop();
            let _ = capture_files::discard(&active.path);
        }
    }
}
