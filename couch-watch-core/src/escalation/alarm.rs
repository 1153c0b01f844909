use std::sync::Arc;
use std::thread;

use crate::traits::alarm_player::AlarmPlayer;

/// Fire-and-forget wrapper around an `AlarmPlayer`.
///
/// Each trigger plays on its own detached thread so playback never delays
/// the caller. A playback already running is allowed to finish.
#[derive(Clone)]
pub struct AlarmTrigger {
    player: Arc<dyn AlarmPlayer>,
}

impl AlarmTrigger {
    pub fn new(player: Arc<dyn AlarmPlayer>) -> Self {
        Self { player }
    }

    /// Start playback in the background. Returns false if no thread could be spawned.
    pub fn fire(&self) -> bool {
        let player = Arc::clone(&self.player);
        let spawned = thread::Builder::new()
            .name("alarm-playback".into())
            .spawn(move || {
                if let Err(e) = player.play() {
                    log::error!("Alarm playback failed: {}", e);
                }
            });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                log::error!("Failed to spawn alarm thread: {}", e);
                false
            }
        }
    }
}
