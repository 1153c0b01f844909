use std::path::Path;

use couch_watch_core::models::error::WatchError;
use couch_watch_core::models::frame::Frame;
use couch_watch_core::traits::recorder::PhotoWriter;

use crate::mask::{RoiMask, SharedMask};
use crate::pgm::GrayImage;

/// Brightness kept for pixels outside the region in a preview.
const OUTSIDE_WEIGHT: f32 = 0.3;

/// Writes photos and region previews as binary PGM files.
pub struct PgmPhotoWriter {
    mask: SharedMask,
}

impl PgmPhotoWriter {
    pub fn new(mask: SharedMask) -> Self {
        Self { mask }
    }

    fn image(frame: &Frame) -> Result<GrayImage, WatchError> {
        GrayImage::new(frame.width, frame.height, frame.data.clone())
    }
}

impl PhotoWriter for PgmPhotoWriter {
    fn write_photo(&mut self, frame: &Frame, path: &Path) -> Result<(), WatchError> {
        Self::image(frame)?.write(path)
    }

    fn write_roi_preview(&mut self, frame: &Frame, path: &Path) -> Result<(), WatchError> {
        let mut image = Self::image(frame)?;
        let guard = self.mask.read();
        let mask = RoiMask::from_image(guard.image(), frame.width, frame.height)?;
        drop(guard);

        for (i, v) in image.data.iter_mut().enumerate() {
            if !mask.contains(i) {
                *v = (*v as f32 * OUTSIDE_WEIGHT).round() as u8;
            }
        }
        image.write(path)
    }

    fn extension(&self) -> &str {
        "pgm"
    }
}
