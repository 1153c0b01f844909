//! # couch-watch-core
//!
//! Platform-agnostic motion watch core.
//!
//! Watches a camera for motion inside a region of interest and escalates from
//! "possible motion" to "recording" to "alarm" on time thresholds, then
//! delivers the kept recordings to the operator. Camera access, motion
//! classification, encoding, alarm audio and the operator channel are
//! collaborators behind traits; `couch-watch-ffmpeg` provides implementations.
//!
//! ## Architecture
//!
//! ```text
//! couch-watch-core (this crate)
//! ├── models/      ← WatchError, configs, CaptureCommand/Event, EscalationState, Frame, OperatorIntent
//! ├── traits/      ← FrameSource, MotionDetector, Recorder, PhotoWriter, AlarmPlayer,
//! │                  NotificationChannel, Transcoder, MaskBuilder
//! ├── escalation/  ← evaluate (pure), Orchestrator, OrchestratorRunner, CommandPort, AlarmTrigger
//! ├── session/     ← CaptureSession frame loop
//! ├── router/      ← CommandRouter, RouterLoop
//! ├── delivery/    ← DeliveryQueue, DeliveryDispatcher
//! └── storage/     ← capture file naming and removal
//! ```
//!
//! ## Data flow
//!
//! ```text
//! [CaptureSession] ──events──┐
//! [Ticker] ───────── Tick ───┼→ [Orchestrator queue] → Orchestrator ──commands──→ [CaptureSession]
//! [CommandRouter] ── mute ───┘                            │  └──→ AlarmTrigger
//!                                                         └──→ DeliveryQueue → Transcoder → NotificationChannel
//! ```

pub mod delivery;
pub mod escalation;
pub mod models;
pub mod router;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use delivery::dispatcher::{DeliveryDispatcher, DeliveryJob, DeliveryQueue};
pub use escalation::alarm::AlarmTrigger;
pub use escalation::command_port::CommandPort;
pub use escalation::evaluate::{evaluate, EscalationAction, Evaluation, Rule};
pub use escalation::orchestrator::Orchestrator;
pub use escalation::runner::{OrchestratorHandle, OrchestratorInput, OrchestratorRunner};
pub use models::capture::{CaptureCommand, CaptureEvent};
pub use models::config::{EscalationConfig, SessionConfig};
pub use models::error::WatchError;
pub use models::escalation::{EscalationState, Episode};
pub use models::frame::Frame;
pub use models::intent::{OperatorIntent, OperatorMessage};
pub use router::command_router::{CommandRouter, RouterLoop};
pub use session::capture::{CaptureSession, CaptureSessionHandle, EventSink};
pub use traits::alarm_player::AlarmPlayer;
pub use traits::frame_source::FrameSource;
pub use traits::mask_builder::MaskBuilder;
pub use traits::motion_detector::MotionDetector;
pub use traits::notification::{NotificationChannel, Transcoder};
pub use traits::recorder::{PhotoWriter, Recorder};
