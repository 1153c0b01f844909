//! End-to-end escalation timelines on a simulated clock.
//!
//! The first group replays `evaluate` alone; the `orchestrator_*` scenarios
//! drive a full `Orchestrator` and read what a capture session would receive.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use couch_watch_core::{
    evaluate, AlarmPlayer, AlarmTrigger, CaptureCommand, CaptureEvent, CommandPort, DeliveryJob,
    DeliveryQueue, EscalationAction, EscalationConfig, EscalationState, Orchestrator, Rule,
    WatchError,
};
use proptest::prelude::*;

const TICK_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Action(EscalationAction),
    Reset(Rule),
}

/// Replay detections (ms offsets, sorted) and ticks every 100 ms up to `end_ms`.
///
/// Detections at the same instant as a tick are applied first.
fn simulate(detections: &[u64], end_ms: u64, muted: bool) -> Vec<(u64, Step)> {
    let config = EscalationConfig::default();
    let t0 = Instant::now();
    let at = |ms: u64| t0 + Duration::from_millis(ms);

    let mut state = EscalationState::new(muted);
    let mut log = Vec::new();
    let mut pending = detections.iter().copied().peekable();

    let mut now = 0;
    while now <= end_ms {
        while let Some(&d) = pending.peek() {
            if d > now {
                break;
            }
            state.observe_detection(at(d));
            pending.next();
        }

        let eval = evaluate(&state, at(now), &config);
        for action in &eval.actions {
            log.push((now, Step::Action(*action)));
        }
        if eval.is_reset() {
            log.push((now, Step::Reset(eval.rule.unwrap())));
        }
        state = eval.state;
        now += TICK_MS;
    }
    log
}

fn every_50ms(from: u64, to: u64) -> Vec<u64> {
    (from..=to).step_by(50).collect()
}

fn first(log: &[(u64, Step)], step: Step) -> Option<u64> {
    log.iter().find(|(_, s)| *s == step).map(|(t, _)| *t)
}

fn count(log: &[(u64, Step)], step: Step) -> usize {
    log.iter().filter(|(_, s)| *s == step).count()
}

#[test]
fn sustained_motion_records_and_alarms() {
    let log = simulate(&every_50ms(0, 2000), 8000, false);

    let start = first(&log, Step::Action(EscalationAction::StartRecording)).unwrap();
    let alarm = first(&log, Step::Action(EscalationAction::SoundAlarm)).unwrap();
    let stop = first(&log, Step::Action(EscalationAction::StopRecording)).unwrap();

    assert!((250..350).contains(&start), "start at {}", start);
    assert!((1000..1100).contains(&alarm), "alarm at {}", alarm);
    assert!((5000..5100).contains(&stop), "stop at {}", stop);
    assert_eq!(count(&log, Step::Action(EscalationAction::StartRecording)), 1);
    assert_eq!(count(&log, Step::Action(EscalationAction::SoundAlarm)), 1);
    assert_eq!(count(&log, Step::Action(EscalationAction::CancelRecording)), 0);
}

#[test]
fn isolated_blip_is_cancelled() {
    let log = simulate(&[0], 3000, false);

    let (cancel_at, _) = log
        .iter()
        .find(|(_, s)| *s == Step::Reset(Rule::Cancellation))
        .expect("episode cancelled");
    assert!((600..=700).contains(cancel_at), "cancel at {}", cancel_at);
    assert_eq!(count(&log, Step::Action(EscalationAction::SoundAlarm)), 0);
    assert_eq!(count(&log, Step::Action(EscalationAction::StopRecording)), 0);
    // The recording started at the detection threshold is thrown away.
    assert_eq!(
        count(&log, Step::Action(EscalationAction::StartRecording)),
        count(&log, Step::Action(EscalationAction::CancelRecording))
    );
}

#[test]
fn muted_motion_records_silently() {
    let loud = simulate(&every_50ms(0, 2000), 8000, false);
    let muted = simulate(&every_50ms(0, 2000), 8000, true);

    for action in [EscalationAction::StartRecording, EscalationAction::StopRecording] {
        assert_eq!(first(&muted, Step::Action(action)), first(&loud, Step::Action(action)));
    }
    assert_eq!(count(&muted, Step::Action(EscalationAction::SoundAlarm)), 0);
}

#[test]
fn endless_motion_hits_wait_limit() {
    let log = simulate(&every_50ms(0, 70_000), 70_000, false);

    let timeout = first(&log, Step::Reset(Rule::WaitTimeout)).unwrap();
    assert!((60_000..60_100).contains(&timeout), "timeout at {}", timeout);

    let before: Vec<_> = log.iter().filter(|(t, _)| *t < timeout).map(|(_, s)| *s).collect();
    assert_eq!(
        before,
        vec![
            Step::Action(EscalationAction::StartRecording),
            Step::Action(EscalationAction::SoundAlarm),
            Step::Action(EscalationAction::StopRecording),
        ]
    );
    // The recording was already stopped, so the timeout has nothing to cancel.
    assert!(!log
        .iter()
        .any(|(t, s)| *t == timeout && *s == Step::Action(EscalationAction::CancelRecording)));
}

fn detection_times() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..1500, 1..80).prop_map(|gaps| {
        let mut t = 0;
        gaps.into_iter()
            .map(|gap| {
                t += gap;
                t
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn recordings_are_balanced(detections in detection_times(), muted in any::<bool>()) {
        let end = detections.last().copied().unwrap_or(0) + 70_000;
        let log = simulate(&detections, end, muted);

        let mut open = false;
        for (_, step) in &log {
            match step {
                Step::Action(EscalationAction::StartRecording) => {
                    prop_assert!(!open, "second start while recording");
                    open = true;
                }
                Step::Action(EscalationAction::StopRecording)
                | Step::Action(EscalationAction::CancelRecording) => {
                    prop_assert!(open, "stop without start");
                    open = false;
                }
                _ => {}
            }
        }
        prop_assert!(!open, "recording left open");
    }

    #[test]
    fn alarmed_episodes_are_never_cancelled(detections in detection_times()) {
        let end = detections.last().copied().unwrap_or(0) + 70_000;
        let log = simulate(&detections, end, false);

        let mut alarmed = false;
        for (_, step) in &log {
            match step {
                Step::Action(EscalationAction::SoundAlarm) => alarmed = true,
                Step::Reset(Rule::Cancellation) => prop_assert!(!alarmed),
                Step::Reset(Rule::WaitTimeout) => alarmed = false,
                _ => {}
            }
        }
    }

    #[test]
    fn episode_open_is_idempotent(detections in detection_times()) {
        let t0 = Instant::now();
        let mut state = EscalationState::default();
        for d in &detections {
            state.observe_detection(t0 + Duration::from_millis(*d));
        }

        prop_assert_eq!(state.first_detection_at(), Some(t0 + Duration::from_millis(detections[0])));
        prop_assert_eq!(
            state.last_detection_at(),
            Some(t0 + Duration::from_millis(*detections.last().unwrap()))
        );
        prop_assert!(!state.alarmed && !state.recording);
    }
}

struct ChannelAlarm(Sender<()>);

impl AlarmPlayer for ChannelAlarm {
    fn play(&self) -> Result<(), WatchError> {
        let _ = self.0.send(());
        Ok(())
    }
}

struct Rig {
    orchestrator: Orchestrator,
    port: CommandPort,
    commands: Receiver<CaptureCommand>,
    alarms: Receiver<()>,
    jobs: Receiver<DeliveryJob>,
}

fn rig(capacity: usize) -> Rig {
    let (port, commands) = CommandPort::channel(capacity, 3);
    let (delivery, jobs) = DeliveryQueue::channel();
    let (alarm_tx, alarms) = crossbeam_channel::unbounded();
    let orchestrator = Orchestrator::new(
        EscalationConfig::default(),
        port.clone(),
        AlarmTrigger::new(Arc::new(ChannelAlarm(alarm_tx))),
        delivery,
    );
    Rig {
        orchestrator,
        port,
        commands,
        alarms,
        jobs,
    }
}

/// Feed an online orchestrator detections and 100 ms ticks, in 50 ms steps.
///
/// `session(ms, rig)` runs before each step and stands in for the capture
/// session draining its queue; it returns the commands it took.
fn drive(
    rig: &mut Rig,
    detections: &[u64],
    end_ms: u64,
    mut session: impl FnMut(u64, &mut Rig) -> Vec<CaptureCommand>,
) -> Vec<CaptureCommand> {
    let t0 = Instant::now();
    let at = |ms: u64| t0 + Duration::from_millis(ms);
    let mut received = Vec::new();

    rig.orchestrator.on_capture_event(CaptureEvent::SessionStarted, at(0));
    let mut now = 0;
    while now <= end_ms {
        received.extend(session(now, rig));
        if detections.contains(&now) {
            rig.orchestrator.on_capture_event(CaptureEvent::Detection, at(now));
        }
        if now % TICK_MS == 0 {
            rig.orchestrator.on_tick(at(now));
        }
        now += 50;
    }
    received.extend(rig.commands.try_iter());
    received
}

fn always_drain(_: u64, rig: &mut Rig) -> Vec<CaptureCommand> {
    rig.commands.try_iter().collect()
}

#[test]
fn orchestrator_sustained_motion_records_and_alarms() {
    let mut rig = rig(16);
    let received = drive(&mut rig, &every_50ms(0, 2000), 8000, always_drain);

    assert_eq!(
        received,
        vec![CaptureCommand::StartRecording, CaptureCommand::StopRecording]
    );
    assert!(rig.alarms.recv_timeout(Duration::from_secs(1)).is_ok());
    assert!(rig.alarms.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(rig.orchestrator.snapshot().alarmed);

    // The session publishes the finished file; it goes out for delivery.
    let clip = PathBuf::from("captures/clip.mkv");
    rig.orchestrator
        .on_capture_event(CaptureEvent::RecordingAvailable(clip.clone()), Instant::now());
    assert_eq!(rig.jobs.try_recv(), Ok(DeliveryJob::Recording(clip)));
}

#[test]
fn orchestrator_blip_cancels_its_recording() {
    let mut rig = rig(16);
    let received = drive(&mut rig, &[0], 3000, always_drain);

    assert_eq!(
        received,
        vec![CaptureCommand::StartRecording, CaptureCommand::CancelRecording]
    );
    assert!(rig.orchestrator.snapshot().is_idle());
    assert!(rig.alarms.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn orchestrator_congested_queue_still_cancels() {
    let mut rig = rig(1);
    // The session stalls on a photo from 400 ms to 1000 ms, so the cancel at
    // 600 ms finds the queue full.
    let received = drive(&mut rig, &[0], 3000, |ms, rig| {
        if ms == 400 {
            let taken: Vec<_> = rig.commands.try_iter().collect();
            assert!(rig.port.send(CaptureCommand::TakePhoto));
            return taken;
        }
        if (400..1000).contains(&ms) {
            return Vec::new();
        }
        rig.commands.try_iter().collect()
    });

    assert_eq!(
        received,
        vec![
            CaptureCommand::StartRecording,
            CaptureCommand::TakePhoto,
            CaptureCommand::CancelRecording,
        ]
    );
    assert!(!rig.orchestrator.is_cancel_pending());
    assert!(rig.orchestrator.snapshot().is_idle());
}

#[test]
fn orchestrator_session_stop_drops_the_episode_quietly() {
    let mut rig = rig(16);
    let received = drive(&mut rig, &every_50ms(0, 400), 500, always_drain);
    assert_eq!(received, vec![CaptureCommand::StartRecording]);

    rig.orchestrator
        .on_capture_event(CaptureEvent::SessionStopped, Instant::now());
    rig.orchestrator.on_tick(Instant::now() + Duration::from_secs(2));

    assert!(rig.orchestrator.snapshot().is_idle());
    assert!(rig.commands.try_recv().is_err());
}
