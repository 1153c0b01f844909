use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use couch_watch_core::models::error::WatchError;
use couch_watch_core::storage::capture_files;
use couch_watch_core::traits::notification::Transcoder;

use crate::tools;

/// Re-encodes recordings to H.264 MP4 for delivery.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self
    }

    /// `<stem>.mp4` next to the source, or `<stem>_h264.mp4` if the source
    /// already is an mp4.
    pub fn output_path(source: &Path) -> PathBuf {
        let is_mp4 = source
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case("mp4"));
        if is_mp4 {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            source.with_file_name(format!("{}_h264.mp4", stem))
        } else {
            source.with_extension("mp4")
        }
    }

    pub fn transcode_args(source: &Path, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            source.to_string_lossy().into_owned(),
            "-vcodec".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-f".into(),
            "mp4".into(),
            "-y".into(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, source: &Path) -> Result<PathBuf, WatchError> {
        if !source.is_file() {
            return Err(WatchError::StorageError(format!(
                "recording {} not found",
                source.display()
            )));
        }

        let output = Self::output_path(source);
        let result = Command::new(tools::ffmpeg_path())
            .args(Self::transcode_args(source, &output))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| WatchError::EncodingFailed(format!("failed to start ffmpeg: {}", e)))?;

        if !result.status.success() {
            let _ = capture_files::discard(&output);
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(WatchError::EncodingFailed(format!(
                "ffmpeg exited with code {}: {}",
                result.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        debug!("Transcoded {} to {}", source.display(), output.display());
        Ok(output)
    }
}
