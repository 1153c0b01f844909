use std::fmt;
use std::path::PathBuf;

/// Commands accepted by the capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureCommand {
    TakePhoto,
    StartRecording,
    StopRecording,
    CancelRecording,
    StartDetection,
    StopDetection,
    PreviewRoi,
}

impl fmt::Display for CaptureCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TakePhoto => "take-photo",
            Self::StartRecording => "start-recording",
            Self::StopRecording => "stop-recording",
            Self::CancelRecording => "cancel-recording",
            Self::StartDetection => "start-detection",
            Self::StopDetection => "stop-detection",
            Self::PreviewRoi => "preview-roi",
        };
        f.write_str(name)
    }
}

/// Events published by the capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    SessionStarted,
    SessionStopped,
    PhotoAvailable(PathBuf),
    RecordingAvailable(PathBuf),
    Detection,
}

impl CaptureEvent {
    /// File carried by the event, if any.
    pub fn file(&self) -> Option<&PathBuf> {
        match self {
            Self::PhotoAvailable(path) | Self::RecordingAvailable(path) => Some(path),
            _ => None,
        }
    }
}
