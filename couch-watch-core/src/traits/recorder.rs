use std::path::{Path, PathBuf};

use crate::models::error::WatchError;
use crate::models::frame::Frame;

/// Writes frames into a video file.
///
/// At most one file is open at a time.
pub trait Recorder: Send {
    /// Open a new recording at `path`.
    fn open(&mut self, path: &Path, fps: f64, width: u32, height: u32) -> Result<(), WatchError>;

    /// Append a frame to the open recording.
    fn write(&mut self, frame: &Frame) -> Result<(), WatchError>;

    /// Finalize the open recording and return its path.
    fn close(&mut self) -> Result<PathBuf, WatchError>;

    /// Abort the open recording and delete whatever was written.
    fn discard(&mut self) -> Result<(), WatchError>;

    fn is_open(&self) -> bool;

    /// File extension (without dot) of produced recordings.
    fn extension(&self) -> &str;
}

/// Writes still images.
pub trait PhotoWriter: Send {
    fn write_photo(&mut self, frame: &Frame, path: &Path) -> Result<(), WatchError>;

    /// Write the frame with the region of interest highlighted.
    fn write_roi_preview(&mut self, frame: &Frame, path: &Path) -> Result<(), WatchError>;

    /// File extension (without dot) of written images.
    fn extension(&self) -> &str;
}
