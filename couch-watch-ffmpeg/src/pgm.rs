//! Binary netpbm images: PGM (`P5`) for photos and masks, PPM (`P6`) for
//! operator drawings.

use std::fs;
use std::path::Path;

use couch_watch_core::models::error::WatchError;

/// An 8-bit grayscale image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, WatchError> {
        if data.len() != width as usize * height as usize {
            return Err(WatchError::EncodingFailed(format!(
                "{}x{} image needs {} bytes, got {}",
                width,
                height,
                width as usize * height as usize,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Nearest-neighbour resize.
    pub fn resize(&self, width: u32, height: u32) -> GrayImage {
        if width == self.width && height == self.height {
            return self.clone();
        }
        if self.data.is_empty() {
            return GrayImage::filled(width, height, 0);
        }
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            let src_y = (y as u64 * self.height as u64 / height.max(1) as u64) as usize;
            let row = src_y * self.width as usize;
            for x in 0..width {
                let src_x = (x as u64 * self.width as u64 / width.max(1) as u64) as usize;
                data.push(self.data[row + src_x]);
            }
        }
        GrayImage {
            width,
            height,
            data,
        }
    }

    /// Encode as binary PGM.
    pub fn encode(&self) -> Vec<u8> {
        let header = format!("P5\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.data.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode a binary PGM with a max value of at most 255.
    pub fn decode(bytes: &[u8]) -> Result<Self, WatchError> {
        let (width, height, data) = decode_raster(bytes, b"P5", 1)?;
        GrayImage::new(width, height, data)
    }

    pub fn read(path: &Path) -> Result<Self, WatchError> {
        let bytes = fs::read(path).map_err(|e| {
            WatchError::StorageError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::decode(&bytes)
    }

    pub fn write(&self, path: &Path) -> Result<(), WatchError> {
        fs::write(path, self.encode()).map_err(|e| {
            WatchError::StorageError(format!("failed to write {}: {}", path.display(), e))
        })
    }
}

/// An 8-bit RGB image, samples interleaved `r, g, b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, WatchError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(WatchError::EncodingFailed(format!(
                "{}x{} RGB image needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode a binary PPM with a max value of at most 255.
    pub fn decode(bytes: &[u8]) -> Result<Self, WatchError> {
        let (width, height, data) = decode_raster(bytes, b"P6", 3)?;
        RgbImage::new(width, height, data)
    }
}

/// Parse a binary netpbm header with the given magic and return the raster
/// scaled to a max value of 255.
fn decode_raster(
    bytes: &[u8],
    magic: &[u8],
    channels: usize,
) -> Result<(u32, u32, Vec<u8>), WatchError> {
    let mut cursor = HeaderCursor { bytes, pos: 0 };

    let found = cursor.token()?;
    if found != magic {
        return Err(WatchError::EncodingFailed(format!(
            "expected a binary {} image, got {}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(found)
        )));
    }
    let width = cursor.number()?;
    let height = cursor.number()?;
    let max_value = cursor.number()?;
    if max_value == 0 || max_value > 255 {
        return Err(WatchError::EncodingFailed(format!(
            "unsupported max value {}",
            max_value
        )));
    }
    // Exactly one whitespace byte separates the header from the raster.
    let start = cursor.pos + 1;
    let len = width as usize * height as usize * channels;
    let raster = bytes
        .get(start..start + len)
        .ok_or_else(|| WatchError::EncodingFailed("image raster is truncated".into()))?;

    let data = if max_value == 255 {
        raster.to_vec()
    } else {
        raster
            .iter()
            .map(|&v| (v as u32 * 255 / max_value) as u8)
            .collect()
    };
    Ok((width, height, data))
}

struct HeaderCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderCursor<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'#' {
                while let Some(&c) = self.bytes.get(self.pos) {
                    self.pos += 1;
                    if c == b'\n' {
                        break;
                    }
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> Result<&'a [u8], WatchError> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .map_or(false, |b| !b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(WatchError::EncodingFailed("image header is truncated".into()));
        }
        let bytes = self.bytes;
        Ok(&bytes[start..self.pos])
    }

    fn number(&mut self) -> Result<u32, WatchError> {
        let token = self.token()?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| WatchError::EncodingFailed("invalid number in image header".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_header_with_comment() {
        let mut bytes = b"P5\n# drawn by operator\n2 2\n255\n".to_vec();
        bytes.extend_from_slice(&[0, 255, 10, 20]);

        let image = GrayImage::decode(&bytes).unwrap();
        assert_eq!((image.width, image.height), (2, 2));
        assert_eq!(image.data, vec![0, 255, 10, 20]);
    }

    #[test]
    fn scales_low_max_value() {
        let mut bytes = b"P5 1 2 15 ".to_vec();
        bytes.extend_from_slice(&[15, 0]);

        let image = GrayImage::decode(&bytes).unwrap();
        assert_eq!(image.data, vec![255, 0]);
    }

    #[test]
    fn rejects_ascii_and_truncated_images() {
        assert!(GrayImage::decode(b"P2\n1 1\n255\n0").is_err());
        assert!(GrayImage::decode(b"P5\n4 4\n255\n\x00\x00").is_err());
        assert!(GrayImage::decode(b"P5\n4").is_err());
    }

    #[test]
    fn decodes_colour_drawings() {
        let mut bytes = b"P6\n2 1\n255\n".to_vec();
        bytes.extend_from_slice(&[255, 0, 0, 10, 20, 30]);

        let image = RgbImage::decode(&bytes).unwrap();
        assert_eq!(
            image.pixels().collect::<Vec<_>>(),
            vec![[255, 0, 0], [10, 20, 30]]
        );
        assert!(GrayImage::decode(&bytes).is_err());
        assert!(RgbImage::decode(b"P5\n1 1\n255\n\x00").is_err());
    }

    #[test]
    fn nearest_neighbour_resize() {
        let image = GrayImage::new(2, 1, vec![0, 200]).unwrap();
        let wide = image.resize(4, 2);

        assert_eq!(wide.data, vec![0, 0, 200, 200, 0, 0, 200, 200]);
    }
}
