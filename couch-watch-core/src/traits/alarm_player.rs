use crate::models::error::WatchError;

/// Audible alarm output.
///
/// `play` blocks until playback finishes; callers run it off the tick path.
pub trait AlarmPlayer: Send + Sync {
    fn play(&self) -> Result<(), WatchError>;
}
