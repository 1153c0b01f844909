//! Region-of-interest masks.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use couch_watch_core::models::error::WatchError;
use couch_watch_core::traits::mask_builder::MaskBuilder;

use crate::pgm::{GrayImage, RgbImage};

/// Binary mask at frame resolution. Non-zero pixels are inside the region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiMask {
    image: GrayImage,
    area: usize,
}

impl RoiMask {
    /// Build from any grayscale image, resized to the frame size.
    pub fn from_image(image: &GrayImage, width: u32, height: u32) -> Result<Self, WatchError> {
        let mut fitted = image.resize(width, height);
        for v in fitted.data.iter_mut() {
            *v = if *v > 0 { 255 } else { 0 };
        }
        let area = fitted.data.iter().filter(|&&v| v > 0).count();
        if area == 0 {
            return Err(WatchError::ConfigurationFailed(
                "mask has no region of interest".into(),
            ));
        }
        Ok(Self {
            image: fitted,
            area,
        })
    }

    /// Load a PGM mask file.
    pub fn load(path: &Path, width: u32, height: u32) -> Result<Self, WatchError> {
        let image = GrayImage::read(path).map_err(|e| {
            WatchError::ConfigurationFailed(format!("mask {} not loaded: {}", path.display(), e))
        })?;
        Self::from_image(&image, width, height)
    }

    /// Mask covering the whole frame.
    pub fn full(width: u32, height: u32) -> Self {
        let image = GrayImage::filled(width, height, 255);
        let area = image.data.len();
        Self { image, area }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.image.data.get(index).map_or(false, |&v| v > 0)
    }

    /// Number of pixels inside the region.
    pub fn area(&self) -> usize {
        self.area
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }
}

/// Mask shared between the detector, the preview writer and the mask builder,
/// so a new drawing takes effect without restarting the session.
pub type SharedMask = Arc<RwLock<RoiMask>>;

pub fn shared(mask: RoiMask) -> SharedMask {
    Arc::new(RwLock::new(mask))
}

/// Turns an operator drawing into a mask.
///
/// The drawing is a colour PPM of a photo with closed outlines painted over
/// it. Saturated, bright pixels (HSV saturation and value both at least 200,
/// any hue) are strokes; strokes and every area they enclose form the region.
/// Gray photo content never qualifies, however bright.
pub struct DrawingMaskBuilder {
    mask: SharedMask,
    min_saturation: u8,
    min_value: u8,
}

impl DrawingMaskBuilder {
    pub fn new(mask: SharedMask) -> Self {
        Self {
            mask,
            min_saturation: 200,
            min_value: 200,
        }
    }

    fn is_stroke(&self, [r, g, b]: [u8; 3]) -> bool {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        if max == 0 {
            return false;
        }
        let saturation = (max - min) as u32 * 255 / max as u32;
        max >= self.min_value && saturation >= self.min_saturation as u32
    }
}

/// Everything not reachable from the image border without crossing a stroke.
fn fill_enclosed(strokes: &[bool], width: usize, height: usize) -> Vec<bool> {
    let mut outside = vec![false; strokes.len()];
    let mut stack = Vec::new();

    let visit = |i: usize, outside: &mut Vec<bool>, stack: &mut Vec<usize>| {
        if !strokes[i] && !outside[i] {
            outside[i] = true;
            stack.push(i);
        }
    };

    for x in 0..width {
        visit(x, &mut outside, &mut stack);
        visit((height - 1) * width + x, &mut outside, &mut stack);
    }
    for y in 0..height {
        visit(y * width, &mut outside, &mut stack);
        visit(y * width + width - 1, &mut outside, &mut stack);
    }

    // 4-connected, so diagonal strokes still close an outline.
    while let Some(i) = stack.pop() {
        let (x, y) = (i % width, i / width);
        if x > 0 {
            visit(i - 1, &mut outside, &mut stack);
        }
        if x + 1 < width {
            visit(i + 1, &mut outside, &mut stack);
        }
        if y > 0 {
            visit(i - width, &mut outside, &mut stack);
        }
        if y + 1 < height {
            visit(i + width, &mut outside, &mut stack);
        }
    }

    outside.into_iter().map(|o| !o).collect()
}

impl MaskBuilder for DrawingMaskBuilder {
    fn build(&self, drawing: &[u8], mask_path: &Path) -> Result<(), WatchError> {
        let image = RgbImage::decode(drawing)?;
        let strokes: Vec<bool> = image.pixels().map(|p| self.is_stroke(p)).collect();
        if !strokes.iter().any(|&s| s) {
            return Err(WatchError::ConfigurationFailed(
                "no coloured outlines found in the drawing".into(),
            ));
        }

        let (w, h) = (image.width as usize, image.height as usize);
        let region = fill_enclosed(&strokes, w, h)
            .into_iter()
            .map(|inside| if inside { 255 } else { 0 })
            .collect();
        let region = GrayImage::new(image.width, image.height, region)?;

        let (width, height) = self.mask.read().dimensions();
        let mask = RoiMask::from_image(&region, width, height)?;

        mask.image().write(mask_path)?;
        *self.mask.write() = mask;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_is_binarised_and_resized() {
        let image = GrayImage::new(2, 1, vec![0, 7]).unwrap();
        let mask = RoiMask::from_image(&image, 4, 2).unwrap();

        assert_eq!(mask.dimensions(), (4, 2));
        assert_eq!(mask.area(), 4);
        assert!(!mask.contains(0));
        assert!(mask.contains(3));
        assert!(!mask.contains(100));
    }

    #[test]
    fn empty_mask_is_rejected() {
        let image = GrayImage::filled(3, 3, 0);
        assert!(matches!(
            RoiMask::from_image(&image, 3, 3),
            Err(WatchError::ConfigurationFailed(_))
        ));
    }

    const RED: [u8; 3] = [230, 20, 20];

    /// 10x10 bright photo with a lamp and a red outline around (2,2)-(6,6).
    fn drawing() -> RgbImage {
        let mut data = Vec::new();
        for y in 0..10 {
            for x in 0..10 {
                let on_outline =
                    (2..=6).contains(&x) && (2..=6).contains(&y) && (x == 2 || x == 6 || y == 2 || y == 6);
                let pixel = if on_outline {
                    RED
                } else if x >= 8 && y >= 8 {
                    [255, 255, 200]
                } else {
                    [250, 250, 250]
                };
                data.extend_from_slice(&pixel);
            }
        }
        RgbImage::new(10, 10, data).unwrap()
    }

    #[test]
    fn red_outline_is_filled_and_bright_photo_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.pgm");
        let mask = shared(RoiMask::full(10, 10));
        let builder = DrawingMaskBuilder::new(Arc::clone(&mask));

        builder.build(&drawing().encode(), &path).unwrap();

        let roi = mask.read();
        assert_eq!(roi.area(), 25);
        assert!(roi.contains(4 * 10 + 4));
        assert!(roi.contains(2 * 10 + 2));
        assert!(!roi.contains(0));
        assert!(!roi.contains(9 * 10 + 9));

        let saved = GrayImage::read(&path).unwrap();
        assert_eq!(saved.data.iter().filter(|&&v| v == 255).count(), 25);
    }

    #[test]
    fn diagonal_outline_still_encloses() {
        let dir = tempfile::tempdir().unwrap();
        let mask = shared(RoiMask::full(5, 5));
        let builder = DrawingMaskBuilder::new(Arc::clone(&mask));

        // Diamond around the centre pixel, touching only diagonally.
        let mut data = vec![0u8; 5 * 5 * 3];
        for (x, y) in [(2, 0), (1, 1), (3, 1), (0, 2), (4, 2), (1, 3), (3, 3), (2, 4)] {
            let i = (y * 5 + x) * 3;
            data[i..i + 3].copy_from_slice(&RED);
        }
        let image = RgbImage::new(5, 5, data).unwrap();
        builder
            .build(&image.encode(), &dir.path().join("mask.pgm"))
            .unwrap();

        let roi = mask.read();
        assert!(roi.contains(2 * 5 + 2));
        assert!(!roi.contains(0));
        assert_eq!(roi.area(), 13);
    }

    #[test]
    fn drawing_is_fitted_to_the_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        let mask = shared(RoiMask::full(20, 20));
        let builder = DrawingMaskBuilder::new(Arc::clone(&mask));

        builder
            .build(&drawing().encode(), &dir.path().join("mask.pgm"))
            .unwrap();

        assert_eq!(mask.read().dimensions(), (20, 20));
        assert_eq!(mask.read().area(), 100);
    }

    #[test]
    fn drawing_without_outlines_keeps_previous_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.pgm");
        let mask = shared(RoiMask::full(2, 2));
        let builder = DrawingMaskBuilder::new(Arc::clone(&mask));

        let photo = RgbImage::new(2, 2, vec![250; 12]).unwrap();
        assert!(matches!(
            builder.build(&photo.encode(), &path),
            Err(WatchError::ConfigurationFailed(_))
        ));
        assert_eq!(mask.read().area(), 4);
        assert!(!path.exists());
    }

    #[test]
    fn grayscale_drawing_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mask = shared(RoiMask::full(2, 2));
        let builder = DrawingMaskBuilder::new(mask);

        let gray = GrayImage::filled(2, 2, 255);
        assert!(matches!(
            builder.build(&gray.encode(), &dir.path().join("mask.pgm")),
            Err(WatchError::EncodingFailed(_))
        ));
    }
}
