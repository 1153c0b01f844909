//! Wiring of the daemon: orchestrator, router, delivery and the camera
//! session supervisor.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossbeam_channel::Receiver;
use log::{info, warn};

use couch_watch_core::traits::notification::NotificationChannel;
use couch_watch_core::{
    AlarmTrigger, CaptureCommand, CaptureSession, CommandPort, CommandRouter, DeliveryDispatcher,
    DeliveryQueue, Orchestrator, OrchestratorHandle, OrchestratorRunner, RouterLoop,
};
use couch_watch_ffmpeg::mask::{self, RoiMask, SharedMask};
use couch_watch_ffmpeg::{
    tools, FfmpegFrameSource, FfmpegRecorder, FfmpegTranscoder, FrameDiffDetector,
    DrawingMaskBuilder, OutboxChannel, PgmPhotoWriter, SoundDirAlarm,
};

use crate::config::WatchConfig;

const SUPERVISOR_POLL: Duration = Duration::from_millis(200);

/// Load the region of interest, or watch the whole frame if none was drawn yet.
pub fn load_mask(path: &Path, width: u32, height: u32) -> Result<SharedMask> {
    let roi = if path.exists() {
        let roi = RoiMask::load(path, width, height)?;
        info!(
            "Region of interest {} covers {} pixels",
            path.display(),
            roi.area()
        );
        roi
    } else {
        warn!(
            "No region of interest at {}, watching the whole frame",
            path.display()
        );
        RoiMask::full(width, height)
    };
    Ok(mask::shared(roi))
}

pub fn run(config: WatchConfig) -> Result<()> {
    let ffmpeg = tools::ffmpeg_path();
    if !tools::is_available(&ffmpeg) {
        bail!("ffmpeg not found at {}", ffmpeg.display());
    }

    let roi = load_mask(&config.mask, config.camera.width, config.camera.height)?;

    let channel: Arc<dyn NotificationChannel> = Arc::new(
        OutboxChannel::from_stdin(&config.outbox_dir).context("failed to open operator channel")?,
    );

    let (delivery, jobs) = DeliveryQueue::channel();
    let dispatcher =
        DeliveryDispatcher::spawn(jobs, Arc::clone(&channel), Arc::new(FfmpegTranscoder::new()))?;

    let (commands, command_rx) = CommandPort::channel(
        config.session.command_capacity,
        config.session.max_command_failures,
    );
    let alarm = AlarmTrigger::new(Arc::new(SoundDirAlarm::new(&config.sounds_dir)));

    let (handle, inputs) = OrchestratorHandle::channel();
    let orchestrator = Orchestrator::new(config.escalation, commands.clone(), alarm, delivery);
    let runner = OrchestratorRunner::start_with(orchestrator, handle.clone(), inputs)?;
    if config.muted {
        handle.set_muted(true)?;
    }

    let router = CommandRouter::new(
        handle.clone(),
        commands,
        Arc::clone(&channel),
        config.mask.clone(),
    )
    .with_mask_builder(Arc::new(DrawingMaskBuilder::new(Arc::clone(&roi))));
    let router_loop = RouterLoop::spawn(router, config.router_poll)?;

    info!(
        "Watching {} (detection {})",
        config.camera.device,
        if config.detect { "enabled" } else { "disabled" }
    );
    supervise(&config, &roi, &handle, &command_rx, &router_loop);

    info!("Shutting down");
    router_loop.stop();
    drop(handle);
    drop(runner.stop());
    dispatcher.join();
    Ok(())
}

/// Keep a capture session running until the operator channel closes,
/// reopening the camera after it fails.
fn supervise(
    config: &WatchConfig,
    roi: &SharedMask,
    handle: &OrchestratorHandle,
    commands: &Receiver<CaptureCommand>,
    router_loop: &RouterLoop,
) {
    while !router_loop.is_finished() {
        let source = match FfmpegFrameSource::open(config.camera.settings()) {
            Ok(source) => source,
            Err(e) => {
                warn!("Camera unavailable: {}", e);
                wait_or_finish(config.session_retry, router_loop);
                continue;
            }
        };

        let session = CaptureSession::new(
            source,
            FrameDiffDetector::new(Arc::clone(roi)),
            FfmpegRecorder::new(),
            PgmPhotoWriter::new(Arc::clone(roi)),
            config.session.clone(),
            commands.clone(),
            handle.event_sink(),
        )
        .with_detection(config.detect);

        let session = match session.spawn() {
            Ok(session) => session,
            Err(e) => {
                warn!("Failed to start capture session: {}", e);
                wait_or_finish(config.session_retry, router_loop);
                continue;
            }
        };

        while !session.is_finished() && !router_loop.is_finished() {
            thread::sleep(SUPERVISOR_POLL);
        }

        if router_loop.is_finished() {
            session.stop();
            break;
        }
        session.join();
        warn!(
            "Capture session ended, reopening camera in {:?}",
            config.session_retry
        );
        wait_or_finish(config.session_retry, router_loop);
    }
}

fn wait_or_finish(delay: Duration, router_loop: &RouterLoop) {
    let mut waited = Duration::ZERO;
    while waited < delay && !router_loop.is_finished() {
        thread::sleep(SUPERVISOR_POLL);
        waited += SUPERVISOR_POLL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couch_watch_ffmpeg::GrayImage;

    #[test]
    fn missing_mask_watches_the_whole_frame() {
        let dir = tempfile::tempdir().unwrap();
        let roi = load_mask(&dir.path().join("none.pgm"), 4, 4).unwrap();
        assert_eq!(roi.read().area(), 16);
    }

    #[test]
    fn existing_mask_is_fitted_to_the_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roi.pgm");
        GrayImage::new(2, 1, vec![255, 0]).unwrap().write(&path).unwrap();

        let roi = load_mask(&path, 4, 2).unwrap();
        assert_eq!(roi.read().dimensions(), (4, 2));
        assert_eq!(roi.read().area(), 4);
    }

    #[test]
    fn empty_mask_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roi.pgm");
        GrayImage::filled(2, 2, 0).write(&path).unwrap();

        assert!(load_mask(&path, 2, 2).is_err());
    }
}
