//! Location of the external ffmpeg/ffplay binaries.
//!
//! `COUCH_WATCH_FFMPEG` / `COUCH_WATCH_FFPLAY` override the lookup when they
//! point at an existing file; otherwise the binary is taken from PATH.

use std::env;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn resolve_tool(env_key: &str, default_name: &str) -> PathBuf {
    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return p;
        }
    }
    PathBuf::from(default_name)
}

pub fn ffmpeg_path() -> PathBuf {
    resolve_tool("COUCH_WATCH_FFMPEG", "ffmpeg")
}

pub fn ffplay_path() -> PathBuf {
    resolve_tool("COUCH_WATCH_FFPLAY", "ffplay")
}

/// Whether `tool` can be executed.
pub fn is_available(tool: &PathBuf) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
