use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::error::WatchError;
use crate::models::intent::OperatorMessage;

/// Two-way channel to the operator.
///
/// Implementations must be callable from several threads: the delivery
/// worker sends files while the router loop polls for messages.
pub trait NotificationChannel: Send + Sync {
    fn send_text(&self, text: &str) -> Result<(), WatchError>;

    fn send_photo(&self, path: &Path) -> Result<(), WatchError>;

    fn send_video(&self, path: &Path) -> Result<(), WatchError>;

    /// Wait up to `timeout` for the next operator message.
    fn poll_message(&self, timeout: Duration) -> Result<Option<OperatorMessage>, WatchError>;
}

/// Converts a raw capture into a distributable video.
pub trait Transcoder: Send + Sync {
    /// Returns the path of the transcoded file. The source is left in place.
    fn transcode(&self, source: &Path) -> Result<PathBuf, WatchError>;
}
