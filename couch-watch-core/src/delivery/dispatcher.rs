use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::models::error::WatchError;
use crate::storage::capture_files;
use crate::traits::notification::{NotificationChannel, Transcoder};

/// A finished capture file waiting to reach the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryJob {
    Photo(PathBuf),
    Recording(PathBuf),
}

/// Cloneable producer side of the delivery queue. Never blocks.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    sender: Sender<DeliveryJob>,
}

impl DeliveryQueue {
    pub fn channel() -> (Self, Receiver<DeliveryJob>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    pub fn photo(&self, path: PathBuf) {
        self.push(DeliveryJob::Photo(path));
    }

    pub fn recording(&self, path: PathBuf) {
        self.push(DeliveryJob::Recording(path));
    }

    fn push(&self, job: DeliveryJob) {
        if let Err(e) = self.sender.send(job) {
            log::warn!("Delivery worker gone, dropping {:?}", e.into_inner());
        }
    }
}

/// Background worker that transcodes recordings and hands files to the
/// notification channel.
///
/// Runs until every `DeliveryQueue` clone is dropped.
pub struct DeliveryDispatcher {
    handle: Option<thread::JoinHandle<()>>,
}

impl DeliveryDispatcher {
    pub fn spawn(
        jobs: Receiver<DeliveryJob>,
        channel: Arc<dyn NotificationChannel>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self, WatchError> {
        let handle = thread::Builder::new()
            .name("capture-delivery".into())
            .spawn(move || {
                for job in jobs.iter() {
                    if let Err(e) = deliver(&job, channel.as_ref(), transcoder.as_ref()) {
                        log::error!("Failed to deliver {:?}: {}", job, e);
                    }
                }
                log::debug!("Delivery worker finished");
            })
            .map_err(|e| WatchError::Unknown(format!("failed to spawn delivery thread: {}", e)))?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for queued jobs to drain. Only returns once all queues are dropped.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Deliver one job synchronously.
///
/// Recordings are transcoded first; the raw file is removed only after a
/// successful transcode, and the transcoded file after it was sent.
pub fn deliver(
    job: &DeliveryJob,
    channel: &dyn NotificationChannel,
    transcoder: &dyn Transcoder,
) -> Result<(), WatchError> {
    match job {
        DeliveryJob::Photo(path) => {
            log::info!("Delivering photo {}", path.display());
            channel.send_photo(path)
        }
        DeliveryJob::Recording(raw) => {
            log::info!("Exporting recording {}", raw.display());
            let video = transcoder.transcode(raw)?;
            remove_quietly(raw);

            let sent = channel.send_video(&video);
            remove_quietly(&video);
            sent
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = capture_files::discard(path) {
        log::warn!("{}", e);
    }
}
