use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::models::capture::{CaptureCommand, CaptureEvent};
use crate::models::config::SessionConfig;
use crate::models::error::WatchError;
use crate::models::frame::Frame;
use crate::storage::capture_files;
use crate::traits::frame_source::FrameSource;
use crate::traits::motion_detector::MotionDetector;
use crate::traits::recorder::{PhotoWriter, Recorder};

/// Callback receiving every event the session publishes.
///
/// Called on the session thread; implementations should only enqueue.
pub type EventSink = Arc<dyn Fn(CaptureEvent) + Send + Sync + 'static>;

/// Work requested by commands and not yet carried out.
#[derive(Debug, Clone, Copy, Default)]
struct PendingWork {
    take_photo: bool,
    preview_roi: bool,
    detection_enabled: bool,
}

/// Frame loop of one camera.
///
/// Commands arrive on `commands`, events leave through `events`; neither side
/// waits on the other. While there is nothing to do (no photo or preview
/// pending, detection disabled, no recording open) the loop parks on the
/// command queue for up to `idle_poll` instead of reading frames.
///
/// ```text
/// [commands] → apply → read frame → preview / photo → detector → recorder
///                                        ↓               ↓
///                                 PhotoAvailable     Detection
/// ```
pub struct CaptureSession<F, D, R, P>
where
    F: FrameSource,
    D: MotionDetector,
    R: Recorder,
    P: PhotoWriter,
{
    source: F,
    detector: D,
    recorder: R,
    photos: P,
    config: SessionConfig,
    commands: Receiver<CaptureCommand>,
    events: EventSink,
    pending: PendingWork,
    running: Arc<AtomicBool>,
}

impl<F, D, R, P> CaptureSession<F, D, R, P>
where
    F: FrameSource + 'static,
    D: MotionDetector + 'static,
    R: Recorder + 'static,
    P: PhotoWriter + 'static,
{
    pub fn new(
        source: F,
        detector: D,
        recorder: R,
        photos: P,
        config: SessionConfig,
        commands: Receiver<CaptureCommand>,
        events: EventSink,
    ) -> Self {
        Self {
            source,
            detector,
            recorder,
            photos,
            config,
            commands,
            events,
            pending: PendingWork::default(),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Start with detection already enabled.
    pub fn with_detection(mut self, enabled: bool) -> Self {
        self.pending.detection_enabled = enabled;
        self
    }

    /// Run the loop on a dedicated thread.
    pub fn spawn(self) -> Result<CaptureSessionHandle, WatchError> {
        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("capture-session".into())
            .spawn(move || self.run())
            .map_err(|e| WatchError::Unknown(format!("failed to spawn capture thread: {}", e)))?;

        Ok(CaptureSessionHandle {
            running,
            handle: Some(handle),
        })
    }

    /// Run the loop on the current thread until stopped, the command queue is
    /// closed, or a capture error occurs. Always publishes `SessionStarted`
    /// first and `SessionStopped` last.
    pub fn run(mut self) {
        log::info!("Starting capture loop");
        self.drop_stale_recording_commands();
        self.emit(CaptureEvent::SessionStarted);

        if let Err(e) = self.run_loop() {
            log::error!("Capture loop stopped: {}", e);
        }

        if self.recorder.is_open() {
            log::info!("Discarding unfinished recording");
            if let Err(e) = self.recorder.discard() {
                log::warn!("Failed to discard recording: {}", e);
            }
        }

        self.emit(CaptureEvent::SessionStopped);
        log::info!("Capture loop finished");
    }

    /// Recording commands queued before this session started were meant for
    /// a previous one; the orchestrator forgot that episode when it stopped.
    /// Other commands still apply.
    fn drop_stale_recording_commands(&mut self) {
        let queued: Vec<CaptureCommand> = self.commands.try_iter().collect();
        for command in queued {
            match command {
                CaptureCommand::StartRecording
                | CaptureCommand::StopRecording
                | CaptureCommand::CancelRecording => {
                    log::debug!("Dropping stale {} command", command);
                }
                other => {
                    if let Err(e) = self.apply(other) {
                        log::warn!("Failed to apply {}: {}", other, e);
                    }
                }
            }
        }
    }

    /// Frame read and recording failures end the loop; photo failures are
    /// logged and the session keeps watching.
    fn run_loop(&mut self) -> Result<(), WatchError> {
        while self.running.load(Ordering::SeqCst) {
            if !self.drain_commands()? {
                return Ok(());
            }

            if self.is_idle() {
                match self.commands.recv_timeout(self.config.idle_poll) {
                    Ok(command) => self.apply(command)?,
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => return Ok(()),
                }
                continue;
            }

            let frame = match self.source.read_frame()? {
                Some(frame) if !frame.is_empty() => frame,
                _ => {
                    log::debug!("Captured frame is empty");
                    continue;
                }
            };

            self.process_frame(&frame)?;
        }
        Ok(())
    }

    /// Apply every queued command. Returns false once the queue is closed.
    fn drain_commands(&mut self) -> Result<bool, WatchError> {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command)?,
                Err(TryRecvError::Empty) => return Ok(true),
                Err(TryRecvError::Disconnected) => return Ok(false),
            }
        }
    }

    fn is_idle(&self) -> bool {
        !self.pending.take_photo
            && !self.pending.preview_roi
            && !self.pending.detection_enabled
            && !self.recorder.is_open()
    }

    fn apply(&mut self, command: CaptureCommand) -> Result<(), WatchError> {
        log::debug!("Capture command: {}", command);
        match command {
            CaptureCommand::TakePhoto => self.pending.take_photo = true,
            CaptureCommand::PreviewRoi => self.pending.preview_roi = true,
            CaptureCommand::StartDetection => {
                if !self.pending.detection_enabled {
                    log::info!("Detection enabled");
                }
                self.pending.detection_enabled = true;
            }
            CaptureCommand::StopDetection => {
                if self.pending.detection_enabled {
                    log::info!("Detection disabled");
                }
                self.pending.detection_enabled = false;
                self.detector.reset();
            }
            CaptureCommand::StartRecording => {
                if !self.recorder.is_open() {
                    self.start_recording()?;
                }
            }
            CaptureCommand::StopRecording => {
                if self.recorder.is_open() {
                    match self.recorder.close() {
                        Ok(path) => {
                            log::info!("Recording finished: {}", path.display());
                            self.emit(CaptureEvent::RecordingAvailable(path));
                        }
                        Err(e) => log::error!("Failed to finish recording: {}", e),
                    }
                }
            }
            CaptureCommand::CancelRecording => {
                if self.recorder.is_open() {
                    match self.recorder.discard() {
                        Ok(()) => log::info!("Recording cancelled"),
                        Err(e) => log::warn!("Failed to discard recording: {}", e),
                    }
                }
            }
        }
        Ok(())
    }

    fn start_recording(&mut self) -> Result<(), WatchError> {
        let path =
            capture_files::new_capture_path(&self.config.captures_dir, self.recorder.extension())?;
        let (width, height) = self.source.dimensions();
        self.recorder
            .open(&path, self.source.frame_rate(), width, height)?;
        log::info!("Recording to {}", path.display());
        Ok(())
    }

    fn process_frame(&mut self, frame: &Frame) -> Result<(), WatchError> {
        if self.pending.preview_roi {
            self.pending.preview_roi = false;
            match self.write_still(frame, true) {
                Ok(path) => self.emit(CaptureEvent::PhotoAvailable(path)),
                Err(e) => log::error!("Failed to write region preview: {}", e),
            }
        }

        if self.pending.take_photo {
            self.pending.take_photo = false;
            match self.write_still(frame, false) {
                Ok(path) => self.emit(CaptureEvent::PhotoAvailable(path)),
                Err(e) => log::error!("Failed to write photo: {}", e),
            }
        }

        if self.pending.detection_enabled && self.detector.detect(frame) {
            self.emit(CaptureEvent::Detection);
        }

        if self.recorder.is_open() {
            self.recorder.write(frame)?;
        }
        Ok(())
    }

    fn write_still(&mut self, frame: &Frame, roi_preview: bool) -> Result<PathBuf, WatchError> {
        let path = self.new_photo_path()?;
        if roi_preview {
            self.photos.write_roi_preview(frame, &path)?;
        } else {
            self.photos.write_photo(frame, &path)?;
        }
        Ok(path)
    }

    fn new_photo_path(&self) -> Result<PathBuf, WatchError> {
        capture_files::new_capture_path(&self.config.captures_dir, self.photos.extension())
    }

    fn emit(&self, event: CaptureEvent) {
        (self.events)(event);
    }
}

/// Control handle for a session running on its own thread.
pub struct CaptureSessionHandle {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CaptureSessionHandle {
    /// Ask the loop to finish after its current iteration.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the loop to finish on its own.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Stop the loop and wait for it.
    pub fn stop(self) {
        self.request_stop();
        self.join();
    }
}
