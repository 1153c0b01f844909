use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::models::capture::CaptureCommand;

/// Non-blocking sender of commands toward the capture session.
///
/// Commands are enqueued with `try_send`; a full or disconnected queue
/// drops the command instead of blocking the caller. Consecutive failures
/// are counted so a dead session is reported once instead of on every tick.
#[derive(Debug, Clone)]
pub struct CommandPort {
    sender: Sender<CaptureCommand>,
    max_failures: u32,
    consecutive_failures: u32,
    dropped_total: u64,
}

impl CommandPort {
    /// Create a bounded command queue. The receiver belongs to the session.
    pub fn channel(capacity: usize, max_failures: u32) -> (Self, Receiver<CaptureCommand>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        let port = Self {
            sender,
            max_failures: max_failures.max(1),
            consecutive_failures: 0,
            dropped_total: 0,
        };
        (port, receiver)
    }

    /// Try to enqueue `command`. Returns false if it was dropped.
    pub fn send(&mut self, command: CaptureCommand) -> bool {
        match self.sender.try_send(command) {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    log::info!(
                        "Command queue recovered after {} dropped commands",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                true
            }
            Err(e) => {
                let reason = match e {
                    TrySendError::Full(_) => "queue full",
                    TrySendError::Disconnected(_) => "session gone",
                };
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.dropped_total += 1;

                if self.consecutive_failures < self.max_failures {
                    log::warn!("Dropped {} command ({})", command, reason);
                } else if self.consecutive_failures == self.max_failures {
                    log::error!(
                        "Dropped {} command ({}); {} consecutive failures, further drops are logged at debug level",
                        command,
                        reason,
                        self.consecutive_failures
                    );
                } else {
                    log::debug!("Dropped {} command ({})", command, reason);
                }
                false
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }
}
