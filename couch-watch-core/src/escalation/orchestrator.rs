use std::time::Instant;

use crate::delivery::dispatcher::DeliveryQueue;
use crate::escalation::alarm::AlarmTrigger;
use crate::escalation::command_port::CommandPort;
use crate::escalation::evaluate::{evaluate, EscalationAction, Rule};
use crate::models::capture::{CaptureCommand, CaptureEvent};
use crate::models::config::EscalationConfig;
use crate::models::escalation::EscalationState;

/// Detection escalation orchestrator for one camera.
///
/// Owns the escalation state exclusively; every method takes `&mut self`,
/// so callers must funnel ticks, detections, and operator toggles through a
/// single thread (see `OrchestratorRunner`). Decisions are made by the pure
/// `evaluate` function and applied here as best-effort commands.
pub struct Orchestrator {
    config: EscalationConfig,
    state: EscalationState,
    commands: CommandPort,
    alarm: AlarmTrigger,
    delivery: DeliveryQueue,
    session_online: bool,
    /// A `CancelRecording` was dropped and must reach the session before
    /// any new `StartRecording`.
    cancel_pending: bool,
}

impl Orchestrator {
    pub fn new(
        config: EscalationConfig,
        commands: CommandPort,
        alarm: AlarmTrigger,
        delivery: DeliveryQueue,
    ) -> Self {
        Self {
            config,
            state: EscalationState::default(),
            commands,
            alarm,
            delivery,
            session_online: false,
            cancel_pending: false,
        }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    /// Copy of the current escalation state.
    pub fn snapshot(&self) -> EscalationState {
        self.state
    }

    pub fn is_session_online(&self) -> bool {
        self.session_online
    }

    /// Whether a dropped cancel is still waiting to be re-sent.
    pub fn is_cancel_pending(&self) -> bool {
        self.cancel_pending
    }

    /// Record one motion frame. Never issues commands itself; the next tick decides.
    pub fn on_detection(&mut self, now: Instant) {
        if !self.session_online {
            log::debug!("Ignoring detection while capture session is offline");
            return;
        }
        if self.state.observe_detection(now) {
            log::info!("First detection, episode opened");
        }
    }

    /// Re-evaluate thresholds at `now` and apply the resulting actions.
    pub fn on_tick(&mut self, now: Instant) {
        if !self.session_online {
            return;
        }
        if self.cancel_pending {
            if !self.commands.send(CaptureCommand::CancelRecording) {
                log::debug!("Cancel still pending, holding escalation");
                return;
            }
            log::info!("Pending cancel delivered");
            self.cancel_pending = false;
        }
        if self.state.is_idle() {
            return;
        }

        let age = self
            .state
            .first_detection_at()
            .map(|first| now.saturating_duration_since(first))
            .unwrap_or_default();
        let was_alarmed = self.state.alarmed;
        let evaluation = evaluate(&self.state, now, &self.config);
        self.state = evaluation.state;

        match evaluation.rule {
            Some(Rule::WaitTimeout) => {
                log::info!("Episode reached wait limit after {:?}, resetting", age)
            }
            Some(Rule::Cancellation) => {
                log::info!("No motion for {:?}, episode cancelled", self.config.cancellation_threshold)
            }
            Some(Rule::Alarm) if !was_alarmed && self.state.alarm_muted => {
                log::info!("Alarm threshold reached but alarm is muted")
            }
            _ => {}
        }

        for action in evaluation.actions {
            self.apply(action);
        }
    }

    /// Set the operator mute toggle. Applies to the next alarm evaluation.
    pub fn set_muted(&mut self, muted: bool) {
        if self.state.alarm_muted != muted {
            log::info!("Alarm {}", if muted { "muted" } else { "unmuted" });
        }
        self.state.alarm_muted = muted;
    }

    /// Manual alarm, independent of escalation and mute.
    pub fn raise_alarm(&self) {
        log::info!("Manual alarm raised");
        self.alarm.fire();
    }

    /// React to an event published by the capture session.
    pub fn on_capture_event(&mut self, event: CaptureEvent, now: Instant) {
        match event {
            CaptureEvent::Detection => self.on_detection(now),
            CaptureEvent::SessionStarted => {
                log::info!("Capture session started");
                self.session_online = true;
            }
            CaptureEvent::SessionStopped => {
                log::warn!("Capture session stopped");
                self.session_online = false;
                // The session discards an open recording on exit.
                self.cancel_pending = false;
                if !self.state.is_idle() {
                    // The session already dropped its recording; nothing to cancel.
                    self.state.reset();
                    log::info!("Episode dropped with the capture session");
                }
            }
            CaptureEvent::PhotoAvailable(path) => {
                log::info!("Photo ready: {}", path.display());
                self.delivery.photo(path);
            }
            CaptureEvent::RecordingAvailable(path) => {
                log::info!("Recording ready: {}", path.display());
                self.delivery.recording(path);
            }
        }
    }

    fn apply(&mut self, action: EscalationAction) {
        match action {
            EscalationAction::StartRecording => {
                log::info!("Starting recording");
                if !self.commands.send(CaptureCommand::StartRecording) {
                    // Leave the flag clear so the next tick asks again.
                    self.state.recording = false;
                }
            }
            EscalationAction::StopRecording => {
                log::info!("Stopping recording");
                if !self.commands.send(CaptureCommand::StopRecording) {
                    // Still inside the recording-complete band, so the next tick resends.
                    self.state.recording = true;
                }
            }
            EscalationAction::CancelRecording => {
                log::info!("Cancelling recording");
                if !self.commands.send(CaptureCommand::CancelRecording) {
                    self.cancel_pending = true;
                }
            }
            EscalationAction::SoundAlarm => {
                log::info!("Sounding alarm");
                self.alarm.fire();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use crossbeam_channel::Receiver;

    use crate::delivery::dispatcher::DeliveryJob;
    use crate::models::error::WatchError;
    use crate::traits::alarm_player::AlarmPlayer;

    struct SilentAlarm;

    impl AlarmPlayer for SilentAlarm {
        fn play(&self) -> Result<(), WatchError> {
            Ok(())
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        commands: Receiver<CaptureCommand>,
        deliveries: Receiver<DeliveryJob>,
    }

    fn fixture(capacity: usize) -> Fixture {
        let (port, commands) = CommandPort::channel(capacity, 3);
        let (delivery, deliveries) = DeliveryQueue::channel();
        let mut orchestrator = Orchestrator::new(
            EscalationConfig::default(),
            port,
            AlarmTrigger::new(Arc::new(SilentAlarm)),
            delivery,
        );
        orchestrator.on_capture_event(CaptureEvent::SessionStarted, Instant::now());
        Fixture {
            orchestrator,
            commands,
            deliveries,
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn detections_ignored_until_session_started() {
        let (port, _commands) = CommandPort::channel(4, 3);
        let (delivery, _deliveries) = DeliveryQueue::channel();
        let mut orchestrator = Orchestrator::new(
            EscalationConfig::default(),
            port,
            AlarmTrigger::new(Arc::new(SilentAlarm)),
            delivery,
        );

        orchestrator.on_detection(Instant::now());
        assert!(orchestrator.snapshot().is_idle());
    }

    #[test]
    fn detection_burst_issues_no_commands() {
        let mut f = fixture(8);
        let t0 = Instant::now();
        for i in 0..20 {
            f.orchestrator.on_detection(t0 + ms(i * 10));
        }

        assert!(f.commands.try_recv().is_err());
        let state = f.orchestrator.snapshot();
        assert_eq!(state.first_detection_at(), Some(t0));
        assert_eq!(state.last_detection_at(), Some(t0 + ms(190)));
    }

    #[test]
    fn failed_start_is_retried_on_next_tick() {
        let mut f = fixture(1);
        let t0 = Instant::now();
        f.orchestrator.on_detection(t0);

        // Occupy the only slot so the start command is dropped.
        f.orchestrator.commands.send(CaptureCommand::TakePhoto);
        f.orchestrator.on_detection(t0 + ms(250));
        f.orchestrator.on_tick(t0 + ms(300));
        assert!(!f.orchestrator.snapshot().recording);

        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::TakePhoto));
        f.orchestrator.on_tick(t0 + ms(400));
        assert!(f.orchestrator.snapshot().recording);
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StartRecording));
    }

    #[test]
    fn dropped_stop_is_resent_on_next_tick() {
        let mut f = fixture(1);
        let t0 = Instant::now();
        f.orchestrator.on_detection(t0);
        f.orchestrator.on_tick(t0 + ms(300));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StartRecording));
        f.orchestrator.on_tick(t0 + ms(1100));
        assert!(f.orchestrator.snapshot().alarmed);

        f.orchestrator.commands.send(CaptureCommand::TakePhoto);
        f.orchestrator.on_tick(t0 + ms(5100));
        assert!(f.orchestrator.snapshot().recording);
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::TakePhoto));

        f.orchestrator.on_tick(t0 + ms(5200));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StopRecording));
        assert!(!f.orchestrator.snapshot().recording);

        f.orchestrator.on_tick(t0 + ms(5300));
        assert!(f.commands.try_recv().is_err());
    }

    #[test]
    fn dropped_cancel_is_resent_before_next_start() {
        let mut f = fixture(1);
        let t0 = Instant::now();
        f.orchestrator.on_detection(t0);
        f.orchestrator.on_tick(t0 + ms(300));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StartRecording));

        f.orchestrator.commands.send(CaptureCommand::TakePhoto);
        f.orchestrator.on_tick(t0 + ms(900));
        assert!(f.orchestrator.snapshot().is_idle());
        assert!(f.orchestrator.is_cancel_pending());

        // A new episode old enough to record, while the queue is still full.
        f.orchestrator.on_detection(t0 + ms(950));
        f.orchestrator.on_tick(t0 + ms(1300));
        assert!(!f.orchestrator.snapshot().recording);
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::TakePhoto));
        assert!(f.commands.try_recv().is_err());

        // Cancel goes first; the start does not fit behind it and is retried.
        f.orchestrator.on_tick(t0 + ms(1400));
        assert!(!f.orchestrator.is_cancel_pending());
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::CancelRecording));
        f.orchestrator.on_tick(t0 + ms(1500));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StartRecording));
    }

    #[test]
    fn dropped_cancel_is_resent_while_idle() {
        let mut f = fixture(1);
        let t0 = Instant::now();
        f.orchestrator.on_detection(t0);
        f.orchestrator.on_tick(t0 + ms(300));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StartRecording));

        f.orchestrator.commands.send(CaptureCommand::TakePhoto);
        f.orchestrator.on_tick(t0 + ms(900));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::TakePhoto));

        f.orchestrator.on_tick(t0 + ms(1000));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::CancelRecording));
        assert!(!f.orchestrator.is_cancel_pending());
    }

    #[test]
    fn session_stop_clears_pending_cancel() {
        let mut f = fixture(1);
        let t0 = Instant::now();
        f.orchestrator.on_detection(t0);
        f.orchestrator.on_tick(t0 + ms(300));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StartRecording));
        f.orchestrator.commands.send(CaptureCommand::TakePhoto);
        f.orchestrator.on_tick(t0 + ms(900));
        assert!(f.orchestrator.is_cancel_pending());

        f.orchestrator.on_capture_event(CaptureEvent::SessionStopped, t0 + ms(950));
        assert!(!f.orchestrator.is_cancel_pending());
    }

    #[test]
    fn session_stop_resets_without_cancel_command() {
        let mut f = fixture(8);
        let t0 = Instant::now();
        f.orchestrator.on_detection(t0);
        f.orchestrator.on_tick(t0 + ms(300));
        assert_eq!(f.commands.try_recv(), Ok(CaptureCommand::StartRecording));

        f.orchestrator.on_capture_event(CaptureEvent::SessionStopped, t0 + ms(350));
        assert!(f.orchestrator.snapshot().is_idle());
        assert!(!f.orchestrator.is_session_online());

        // Offline: detections and ticks are inert.
        f.orchestrator.on_detection(t0 + ms(400));
        f.orchestrator.on_tick(t0 + ms(1000));
        assert!(f.orchestrator.snapshot().is_idle());
        assert!(f.commands.try_recv().is_err());

        f.orchestrator.on_capture_event(CaptureEvent::SessionStarted, t0 + ms(1100));
        f.orchestrator.on_detection(t0 + ms(1200));
        assert!(!f.orchestrator.snapshot().is_idle());
    }

    #[test]
    fn mute_survives_episode_reset() {
        let mut f = fixture(8);
        let t0 = Instant::now();
        f.orchestrator.set_muted(true);
        f.orchestrator.on_detection(t0);
        f.orchestrator.on_tick(t0 + ms(700));

        let state = f.orchestrator.snapshot();
        assert!(state.is_idle());
        assert!(state.alarm_muted);
    }

    #[test]
    fn ready_files_are_forwarded_for_delivery() {
        let mut f = fixture(8);
        let now = Instant::now();
        f.orchestrator
            .on_capture_event(CaptureEvent::PhotoAvailable(PathBuf::from("p.pgm")), now);
        f.orchestrator
            .on_capture_event(CaptureEvent::RecordingAvailable(PathBuf::from("r.avi")), now);

        assert_eq!(
            f.deliveries.try_recv(),
            Ok(DeliveryJob::Photo(PathBuf::from("p.pgm")))
        );
        assert_eq!(
            f.deliveries.try_recv(),
            Ok(DeliveryJob::Recording(PathBuf::from("r.avi")))
        );
    }
}
