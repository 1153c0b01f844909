//! Local operator channel.
//!
//! Text replies are written to a console writer, photos and videos are moved
//! into an outbox directory, and operator input is read line by line:
//!
//! ```text
//! /capture              → OperatorMessage::Command("/capture")
//! mute                  → OperatorMessage::Command("mute")
//! !drawing <file.ppm>   → OperatorMessage::Drawing(<file bytes>)
//! ```

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;

use couch_watch_core::models::error::WatchError;
use couch_watch_core::models::intent::OperatorMessage;
use couch_watch_core::traits::notification::NotificationChannel;

const DRAWING_PREFIX: &str = "!drawing";

pub struct OutboxChannel {
    outbox: PathBuf,
    console: Mutex<Box<dyn Write + Send>>,
    messages: Receiver<OperatorMessage>,
}

impl OutboxChannel {
    /// Channel fed from `messages`, replying on stdout.
    pub fn new(outbox: impl Into<PathBuf>, messages: Receiver<OperatorMessage>) -> Result<Self, WatchError> {
        let outbox = outbox.into();
        fs::create_dir_all(&outbox).map_err(|e| {
            WatchError::StorageError(format!(
                "failed to create outbox {}: {}",
                outbox.display(),
                e
            ))
        })?;
        Ok(Self {
            outbox,
            console: Mutex::new(Box::new(io::stdout())),
            messages,
        })
    }

    /// Channel reading operator lines from stdin on a background thread.
    ///
    /// The channel reports closed once stdin reaches end of file.
    pub fn from_stdin(outbox: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("operator-input".into())
            .spawn(move || read_lines(io::stdin().lock(), &tx))
            .map_err(|e| WatchError::Unknown(format!("failed to spawn input thread: {}", e)))?;
        Self::new(outbox, rx)
    }

    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = Mutex::new(console);
        self
    }

    pub fn outbox(&self) -> &Path {
        &self.outbox
    }

    fn deliver(&self, path: &Path, kind: &str) -> Result<(), WatchError> {
        let name = path.file_name().ok_or_else(|| {
            WatchError::DeliveryFailed(format!("{} has no file name", path.display()))
        })?;
        let target = self.outbox.join(name);

        if fs::rename(path, &target).is_err() {
            // Cross-device moves need a copy.
            fs::copy(path, &target).map_err(|e| {
                WatchError::DeliveryFailed(format!("failed to deliver {}: {}", path.display(), e))
            })?;
            let _ = fs::remove_file(path);
        }

        info!("Delivered {} {}", kind, target.display());
        self.write_line(&format!("[{}] {}", kind, target.display()))
    }

    fn write_line(&self, line: &str) -> Result<(), WatchError> {
        let mut console = self.console.lock();
        writeln!(console, "{}", line)
            .and_then(|_| console.flush())
            .map_err(|e| WatchError::DeliveryFailed(format!("console write failed: {}", e)))
    }
}

impl NotificationChannel for OutboxChannel {
    fn send_text(&self, text: &str) -> Result<(), WatchError> {
        self.write_line(text)
    }

    fn send_photo(&self, path: &Path) -> Result<(), WatchError> {
        self.deliver(path, "photo")
    }

    fn send_video(&self, path: &Path) -> Result<(), WatchError> {
        self.deliver(path, "video")
    }

    fn poll_message(&self, timeout: Duration) -> Result<Option<OperatorMessage>, WatchError> {
        match self.messages.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WatchError::ChannelClosed),
        }
    }
}

/// Turn one input line into a message. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<OperatorMessage>, WatchError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some(rest) = line.strip_prefix(DRAWING_PREFIX) {
        let path = rest.trim();
        if path.is_empty() {
            return Err(WatchError::ConfigurationFailed(
                "usage: !drawing <file>".into(),
            ));
        }
        let bytes = fs::read(path)
            .map_err(|e| WatchError::StorageError(format!("cannot read {}: {}", path, e)))?;
        return Ok(Some(OperatorMessage::Drawing(bytes)));
    }

    Ok(Some(OperatorMessage::Command(line.to_string())))
}

fn read_lines<R: BufRead>(input: R, tx: &Sender<OperatorMessage>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Operator input failed: {}", e);
                break;
            }
        };
        match parse_line(&line) {
            Ok(Some(message)) => {
                if tx.send(message).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring operator input: {}", e),
        }
    }
    debug!("Operator input closed");
}
