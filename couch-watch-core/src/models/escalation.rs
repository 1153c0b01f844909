use std::time::{Duration, Instant};

/// An open detection episode.
///
/// Only exists between the first detection and the next reset, so "no
/// episode" is represented by `None` rather than by a sentinel timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Episode {
    first_detection_at: Instant,
    last_detection_at: Instant,
}

impl Episode {
    pub fn open(now: Instant) -> Self {
        Self {
            first_detection_at: now,
            last_detection_at: now,
        }
    }

    /// Record another detection. `last_detection_at` never moves backwards.
    pub fn observe(&mut self, now: Instant) {
        if now > self.last_detection_at {
            self.last_detection_at = now;
        }
    }

    pub fn first_detection_at(&self) -> Instant {
        self.first_detection_at
    }

    pub fn last_detection_at(&self) -> Instant {
        self.last_detection_at
    }

    /// Time since the episode opened.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.first_detection_at)
    }

    /// Time since motion was last observed.
    pub fn quiet_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_detection_at)
    }
}

/// Escalation state of a single camera.
///
/// `alarm_muted` is an operator preference and survives `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscalationState {
    pub episode: Option<Episode>,
    pub alarmed: bool,
    pub recording: bool,
    pub alarm_muted: bool,
}

impl EscalationState {
    pub fn new(alarm_muted: bool) -> Self {
        Self {
            alarm_muted,
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.episode.is_none()
    }

    /// Apply a detection: opens an episode if none is open, otherwise
    /// advances `last_detection_at`. Returns true when an episode was opened.
    pub fn observe_detection(&mut self, now: Instant) -> bool {
        match self.episode.as_mut() {
            Some(episode) => {
                episode.observe(now);
                false
            }
            None => {
                self.episode = Some(Episode::open(now));
                true
            }
        }
    }

    /// Close the episode. Returns true when a recording was active and must
    /// be cancelled.
    pub fn reset(&mut self) -> bool {
        let was_recording = self.recording;
        self.episode = None;
        self.alarmed = false;
        self.recording = false;
        was_recording
    }

    pub fn first_detection_at(&self) -> Option<Instant> {
        self.episode.map(|e| e.first_detection_at())
    }

    pub fn last_detection_at(&self) -> Option<Instant> {
        self.episode.map(|e| e.last_detection_at())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_detection_opens_episode() {
        let t0 = Instant::now();
        let mut state = EscalationState::default();

        assert!(state.observe_detection(t0));
        assert_eq!(state.first_detection_at(), Some(t0));
        assert_eq!(state.last_detection_at(), Some(t0));
    }

    #[test]
    fn repeated_detections_only_advance_last() {
        let t0 = Instant::now();
        let mut state = EscalationState::default();
        state.observe_detection(t0);

        for ms in [50, 100, 150] {
            assert!(!state.observe_detection(t0 + Duration::from_millis(ms)));
        }

        assert_eq!(state.first_detection_at(), Some(t0));
        assert_eq!(state.last_detection_at(), Some(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn last_detection_never_moves_backwards() {
        let t0 = Instant::now();
        let mut episode = Episode::open(t0 + Duration::from_millis(100));
        episode.observe(t0);

        assert_eq!(episode.last_detection_at(), t0 + Duration::from_millis(100));
        assert!(episode.last_detection_at() >= episode.first_detection_at());
    }

    #[test]
    fn reset_keeps_mute_and_reports_recording() {
        let mut state = EscalationState::new(true);
        state.observe_detection(Instant::now());
        state.recording = true;
        state.alarmed = true;

        assert!(state.reset());
        assert!(state.is_idle());
        assert!(!state.alarmed);
        assert!(!state.recording);
        assert!(state.alarm_muted);
        assert!(!state.reset());
    }
}
