//! # couch-watch-ffmpeg
//!
//! ffmpeg-based backend for couch-watch-core.
//!
//! Provides:
//! - `FfmpegFrameSource`: camera frames as raw gray bytes from an ffmpeg child process
//! - `FfmpegRecorder`: MJPEG `.avi` recordings through an ffmpeg stdin pipe
//! - `FfmpegTranscoder`: H.264 MP4 re-encode for delivery
//! - `FrameDiffDetector`: frame-difference motion detection inside the region of interest
//! - `PgmPhotoWriter`: photos and region previews as PGM files
//! - `RoiMask` / `DrawingMaskBuilder`: region-of-interest mask loading and redrawing
//! - `SoundDirAlarm`: random sound from a directory, played with ffplay
//! - `OutboxChannel`: console operator channel with a file outbox
//!
//! ## Runtime Requirements
//! - `ffmpeg` and `ffplay` on PATH, or `COUCH_WATCH_FFMPEG` / `COUCH_WATCH_FFPLAY`
//!
//! ## Usage
//! ```ignore
//! use couch_watch_ffmpeg::{mask, CameraSettings, FfmpegFrameSource, FrameDiffDetector, RoiMask};
//!
//! let settings = CameraSettings::default();
//! let source = FfmpegFrameSource::open(settings.clone())?;
//! let roi = mask::shared(RoiMask::full(settings.width, settings.height));
//! let detector = FrameDiffDetector::new(roi.clone());
//! ```

pub mod alarm;
pub mod detector;
pub mod frame_source;
pub mod mask;
pub mod outbox;
pub mod pgm;
pub mod photo;
pub mod recorder;
pub mod tools;
pub mod transcoder;

pub use alarm::SoundDirAlarm;
pub use detector::FrameDiffDetector;
pub use frame_source::{CameraSettings, FfmpegFrameSource};
pub use mask::{DrawingMaskBuilder, RoiMask, SharedMask};
pub use outbox::OutboxChannel;
pub use pgm::GrayImage;
pub use photo::PgmPhotoWriter;
pub use recorder::FfmpegRecorder;
pub use transcoder::FfmpegTranscoder;
