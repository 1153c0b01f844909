use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::escalation::command_port::CommandPort;
use crate::escalation::runner::OrchestratorHandle;
use crate::models::capture::CaptureCommand;
use crate::models::error::WatchError;
use crate::models::intent::{OperatorIntent, OperatorMessage};
use crate::traits::mask_builder::MaskBuilder;
use crate::traits::notification::NotificationChannel;

pub const CREATE_ROI_INSTRUCTIONS: &str = "Take the following photo and draw one or more closed red outlines over it. \
After that, upload your drawing as a colour image.";

pub const ROI_CREATED: &str = "Your drawing was parsed. Here is the new region of interest.";

/// Translates operator messages into orchestrator toggles and session commands.
///
/// Holds no escalation state: mute goes through the orchestrator queue so it
/// is ordered with ticks and detections.
pub struct CommandRouter {
    orchestrator: OrchestratorHandle,
    commands: CommandPort,
    channel: Arc<dyn NotificationChannel>,
    masks: Option<Arc<dyn MaskBuilder>>,
    mask_path: PathBuf,
}

impl CommandRouter {
    pub fn new(
        orchestrator: OrchestratorHandle,
        commands: CommandPort,
        channel: Arc<dyn NotificationChannel>,
        mask_path: PathBuf,
    ) -> Self {
        Self {
            orchestrator,
            commands,
            channel,
            masks: None,
            mask_path,
        }
    }

    /// Enable the region-of-interest drawing workflow.
    pub fn with_mask_builder(mut self, masks: Arc<dyn MaskBuilder>) -> Self {
        self.masks = Some(masks);
        self
    }

    pub fn handle_message(&mut self, message: OperatorMessage) -> Result<(), WatchError> {
        match message {
            OperatorMessage::Command(text) => match OperatorIntent::parse(&text) {
                Some(intent) => self.handle_intent(intent),
                None => {
                    log::debug!("Ignoring operator text {:?}", text);
                    Ok(())
                }
            },
            OperatorMessage::Drawing(bytes) => self.handle_drawing(&bytes),
        }
    }

    pub fn handle_intent(&mut self, intent: OperatorIntent) -> Result<(), WatchError> {
        log::info!("Operator command {}", intent);
        match intent {
            OperatorIntent::Help => self.channel.send_text(&help_text()),
            OperatorIntent::Mute => self.orchestrator.set_muted(true),
            OperatorIntent::Unmute => self.orchestrator.set_muted(false),
            OperatorIntent::Raise => self.orchestrator.raise_alarm(),
            OperatorIntent::Enable => self.issue(CaptureCommand::StartDetection),
            OperatorIntent::Disable => self.issue(CaptureCommand::StopDetection),
            OperatorIntent::Capture => self.issue(CaptureCommand::TakePhoto),
            OperatorIntent::Preview => self.issue(CaptureCommand::PreviewRoi),
            OperatorIntent::CreateRoi => {
                self.channel.send_text(CREATE_ROI_INSTRUCTIONS)?;
                self.issue(CaptureCommand::TakePhoto)
            }
        }
    }

    fn handle_drawing(&mut self, drawing: &[u8]) -> Result<(), WatchError> {
        let Some(masks) = self.masks.as_ref() else {
            return self
                .channel
                .send_text("Region of interest drawings are not supported here.");
        };

        match masks.build(drawing, &self.mask_path) {
            Ok(()) => {
                log::info!("Region of interest saved to {}", self.mask_path.display());
                self.channel.send_text(ROI_CREATED)?;
            }
            Err(e) => {
                log::warn!("Failed to build region of interest: {}", e);
                self.channel
                    .send_text(&format!("Could not use that drawing: {}", e))?;
            }
        }
        self.issue(CaptureCommand::PreviewRoi)
    }

    fn issue(&mut self, command: CaptureCommand) -> Result<(), WatchError> {
        if self.commands.send(command) {
            Ok(())
        } else {
            Err(WatchError::DeliveryFailed(format!("{} was dropped", command)))
        }
    }
}

/// Help message listing every operator command.
pub fn help_text() -> String {
    let mut text = String::from(
        "To start, create a region of interest with /createroi and start watching with /enable.\n",
    );
    for intent in OperatorIntent::ALL {
        text.push_str(&format!("\n{} - {}", intent.command(), intent.description()));
    }
    text
}

/// Polls the notification channel for operator messages on a dedicated thread.
pub struct RouterLoop {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RouterLoop {
    pub fn spawn(mut router: CommandRouter, poll_timeout: Duration) -> Result<Self, WatchError> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let channel = Arc::clone(&router.channel);

        let handle = thread::Builder::new()
            .name("command-router".into())
            .spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    match channel.poll_message(poll_timeout) {
                        Ok(Some(message)) => {
                            if let Err(e) = router.handle_message(message) {
                                log::warn!("Operator command failed: {}", e);
                            }
                        }
                        Ok(None) => {}
                        Err(WatchError::ChannelClosed) => {
                            log::info!("Operator channel closed");
                            break;
                        }
                        Err(e) => {
                            log::warn!("Failed to poll operator channel: {}", e);
                            thread::sleep(poll_timeout);
                        }
                    }
                }
            })
            .map_err(|e| WatchError::Unknown(format!("failed to spawn router thread: {}", e)))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// True once the loop has exited, e.g. because the channel closed.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stop polling; returns after the current poll times out.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
