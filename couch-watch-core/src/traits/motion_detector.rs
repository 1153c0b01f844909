use crate::models::frame::Frame;

/// Per-frame motion classifier restricted to a region of interest.
pub trait MotionDetector: Send {
    /// Whether motion is present inside the region of interest.
    fn detect(&mut self, frame: &Frame) -> bool;

    /// Forget any background model built from previous frames.
    fn reset(&mut self);
}
