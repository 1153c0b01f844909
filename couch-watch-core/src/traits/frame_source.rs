use crate::models::error::WatchError;
use crate::models::frame::Frame;

/// A camera or stream delivering grayscale frames.
///
/// `read_frame` blocks until the next frame is available. `Ok(None)` means
/// the device produced an empty frame and the caller should try again;
/// an error means the source is unusable and the session must stop.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> Result<Option<Frame>, WatchError>;

    /// Nominal frames per second, used for recordings.
    fn frame_rate(&self) -> f64;

    /// Frame size as `(width, height)`.
    fn dimensions(&self) -> (u32, u32);
}
