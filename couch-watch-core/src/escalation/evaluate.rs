//! Threshold evaluation for one clock tick.
//!
//! Rules are checked in strict priority order and the first whose condition
//! holds wins, even if it has nothing left to do:
//!
//! ```text
//! age >= wait_duration                                   → WaitTimeout
//! age >= recording_duration                              → RecordingComplete
//! age >= alarm_threshold                                 → Alarm
//! age >= cancellation && quiet >= cancellation && !alarmed → Cancellation
//! age >= detection_threshold                             → RecordingStart
//! ```
//!
//! `age` is measured from the first detection of the episode, `quiet` from
//! the last one. Because a rule claims its whole age band, a recording
//! stopped at `recording_duration` is never restarted and an alarmed
//! episode can only end by timing out.

use std::time::Instant;

use crate::models::config::EscalationConfig;
use crate::models::escalation::EscalationState;

/// Side effect requested by an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationAction {
    StartRecording,
    StopRecording,
    CancelRecording,
    SoundAlarm,
}

/// The rule whose condition matched on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    WaitTimeout,
    RecordingComplete,
    Alarm,
    Cancellation,
    RecordingStart,
}

/// Result of evaluating one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub state: EscalationState,
    pub actions: Vec<EscalationAction>,
    /// `None` when idle or when no rule matched yet.
    pub rule: Option<Rule>,
}

impl Evaluation {
    fn unchanged(state: &EscalationState) -> Self {
        Self {
            state: *state,
            actions: Vec::new(),
            rule: None,
        }
    }

    /// Whether the episode was closed by this evaluation.
    pub fn is_reset(&self) -> bool {
        matches!(self.rule, Some(Rule::WaitTimeout | Rule::Cancellation))
    }
}

/// Decide what a tick at `now` does to `state`.
pub fn evaluate(state: &EscalationState, now: Instant, config: &EscalationConfig) -> Evaluation {
    let Some(episode) = state.episode else {
        return Evaluation::unchanged(state);
    };

    let age = episode.age(now);
    let quiet = episode.quiet_for(now);
    let mut next = *state;
    let mut actions = Vec::new();

    let rule = if age >= config.wait_duration {
        if next.reset() {
            actions.push(EscalationAction::CancelRecording);
        }
        Rule::WaitTimeout
    } else if age >= config.recording_duration {
        if next.recording {
            next.recording = false;
            actions.push(EscalationAction::StopRecording);
        }
        Rule::RecordingComplete
    } else if age >= config.alarm_threshold {
        if !next.alarmed {
            next.alarmed = true;
            if !next.alarm_muted {
                actions.push(EscalationAction::SoundAlarm);
            }
        }
        Rule::Alarm
    } else if age >= config.cancellation_threshold
        && quiet >= config.cancellation_threshold
        && !next.alarmed
    {
        if next.reset() {
            actions.push(EscalationAction::CancelRecording);
        }
        Rule::Cancellation
    } else if age >= config.detection_threshold {
        if !next.recording {
            next.recording = true;
            actions.push(EscalationAction::StartRecording);
        }
        Rule::RecordingStart
    } else {
        return Evaluation::unchanged(state);
    };

    Evaluation {
        state: next,
        actions,
        rule: Some(rule),
    }
}
