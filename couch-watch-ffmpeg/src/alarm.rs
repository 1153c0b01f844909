//! Audible alarm: plays a random sound file with ffplay.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::info;
use rand::seq::SliceRandom;

use couch_watch_core::models::error::WatchError;
use couch_watch_core::traits::alarm_player::AlarmPlayer;

use crate::tools;

pub struct SoundDirAlarm {
    sounds_dir: PathBuf,
    player: PathBuf,
}

impl SoundDirAlarm {
    pub fn new(sounds_dir: impl Into<PathBuf>) -> Self {
        Self {
            sounds_dir: sounds_dir.into(),
            player: tools::ffplay_path(),
        }
    }

    pub fn with_player(mut self, player: impl Into<PathBuf>) -> Self {
        self.player = player.into();
        self
    }

    pub fn sounds_dir(&self) -> &Path {
        &self.sounds_dir
    }

    /// All regular files in the sounds directory.
    pub fn sounds(&self) -> Result<Vec<PathBuf>, WatchError> {
        let entries = fs::read_dir(&self.sounds_dir).map_err(|e| {
            WatchError::AlarmFailed(format!(
                "cannot read sounds directory {}: {}",
                self.sounds_dir.display(),
                e
            ))
        })?;

        let mut sounds: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        sounds.sort();
        Ok(sounds)
    }

    pub fn pick_sound(&self) -> Result<PathBuf, WatchError> {
        let sounds = self.sounds()?;
        sounds
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| {
                WatchError::AlarmFailed(format!(
                    "no sounds in {}",
                    self.sounds_dir.display()
                ))
            })
    }
}

impl AlarmPlayer for SoundDirAlarm {
    fn play(&self) -> Result<(), WatchError> {
        let sound = self.pick_sound()?;
        info!("Playing alarm {}", sound.display());

        let status = Command::new(&self.player)
            .args(["-nodisp", "-autoexit", "-loglevel", "quiet"])
            .arg(&sound)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| WatchError::AlarmFailed(format!("failed to start player: {}", e)))?;

        if !status.success() {
            return Err(WatchError::AlarmFailed(format!(
                "player exited with code {}",
                status.code().unwrap_or(-1)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_cannot_alarm() {
        let dir = tempfile::tempdir().unwrap();
        let alarm = SoundDirAlarm::new(dir.path());
        assert!(matches!(alarm.play(), Err(WatchError::AlarmFailed(_))));
    }

    #[test]
    fn missing_directory_cannot_alarm() {
        let alarm = SoundDirAlarm::new("/nonexistent/couch-watch-sounds");
        assert!(matches!(alarm.pick_sound(), Err(WatchError::AlarmFailed(_))));
    }

    #[test]
    fn picks_one_of_the_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.wav"), b"a").unwrap();
        fs::write(dir.path().join("b.wav"), b"b").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let alarm = SoundDirAlarm::new(dir.path());
        assert_eq!(alarm.sounds().unwrap().len(), 2);
        let picked = alarm.pick_sound().unwrap();
        assert!(picked.extension().map_or(false, |e| e == "wav"));
    }

    #[test]
    fn missing_player_is_an_alarm_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.wav"), b"a").unwrap();
        let alarm = SoundDirAlarm::new(dir.path()).with_player("/nonexistent/couch-watch-player");
        assert!(matches!(alarm.play(), Err(WatchError::AlarmFailed(_))));
    }
}
