use std::path::PathBuf;

use clap::Parser;

/// Watch a camera for motion, record it, raise an alarm and deliver the clips.
#[derive(Parser, Debug, Default)]
#[command(name = "couch-watch", author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(long, env = "COUCH_WATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Camera device or any ffmpeg input
    #[arg(long, env = "COUCH_WATCH_DEVICE")]
    pub device: Option<String>,

    /// Frame width in pixels
    #[arg(long, env = "COUCH_WATCH_WIDTH")]
    pub width: Option<u32>,

    /// Frame height in pixels
    #[arg(long, env = "COUCH_WATCH_HEIGHT")]
    pub height: Option<u32>,

    /// Frames per second
    #[arg(long, env = "COUCH_WATCH_FPS")]
    pub fps: Option<f64>,

    /// Region-of-interest mask (PGM); new drawings are saved here too
    #[arg(long, env = "COUCH_WATCH_MASK")]
    pub mask: Option<PathBuf>,

    /// Directory for photos and recordings
    #[arg(long, env = "COUCH_WATCH_CAPTURES_DIR")]
    pub captures_dir: Option<PathBuf>,

    /// Directory of alarm sounds
    #[arg(long, env = "COUCH_WATCH_SOUNDS_DIR")]
    pub sounds_dir: Option<PathBuf>,

    /// Directory delivered photos and videos are moved to
    #[arg(long, env = "COUCH_WATCH_OUTBOX_DIR")]
    pub outbox_dir: Option<PathBuf>,

    /// Start with the alarm muted
    #[arg(long, env = "COUCH_WATCH_MUTED", default_value_t = false)]
    pub muted: bool,

    /// Start with motion detection enabled
    #[arg(long, env = "COUCH_WATCH_DETECT", default_value_t = false)]
    pub detect: bool,
}
