//! Frame-difference motion detector restricted to the region of interest.

use log::debug;

use couch_watch_core::models::frame::Frame;
use couch_watch_core::traits::motion_detector::MotionDetector;

use crate::mask::{RoiMask, SharedMask};

/// Luma difference above which a pixel counts as changed.
pub const PIXEL_THRESHOLD: u8 = 25;

/// Changed share of the mask area must lie strictly inside these bounds.
/// Below is noise, above is a lighting change or camera shake.
pub const MIN_CHANGED_SHARE: f64 = 0.10;
pub const MAX_CHANGED_SHARE: f64 = 0.50;

pub struct FrameDiffDetector {
    mask: SharedMask,
    previous: Option<Vec<u8>>,
    pixel_threshold: u8,
}

impl FrameDiffDetector {
    pub fn new(mask: SharedMask) -> Self {
        Self {
            mask,
            previous: None,
            pixel_threshold: PIXEL_THRESHOLD,
        }
    }

    fn changed_share(&self, previous: &[u8], frame: &Frame) -> f64 {
        let guard = self.mask.read();
        let resized;
        let mask: &RoiMask = if guard.dimensions() == (frame.width, frame.height) {
            &*guard
        } else {
            resized = match RoiMask::from_image(guard.image(), frame.width, frame.height) {
                Ok(mask) => mask,
                Err(_) => RoiMask::full(frame.width, frame.height),
            };
            &resized
        };

        let changed = frame
            .data
            .iter()
            .zip(previous)
            .enumerate()
            .filter(|(i, (a, b))| mask.contains(*i) && a.abs_diff(**b) > self.pixel_threshold)
            .count();

        changed as f64 / mask.area() as f64
    }
}

impl MotionDetector for FrameDiffDetector {
    fn detect(&mut self, frame: &Frame) -> bool {
        if frame.is_empty() || frame.data.len() != frame.pixel_count() {
            return false;
        }

        let detected = match self.previous.as_deref() {
            Some(previous) if previous.len() == frame.data.len() => {
                let share = self.changed_share(previous, frame);
                if share > 0.0 {
                    debug!("Changed share of region: {:.3}", share);
                }
                share > MIN_CHANGED_SHARE && share < MAX_CHANGED_SHARE
            }
            _ => false,
        };

        self.previous = Some(frame.data.clone());
        detected
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}
