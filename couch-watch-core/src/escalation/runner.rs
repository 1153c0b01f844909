use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

use crate::escalation::orchestrator::Orchestrator;
use crate::models::capture::CaptureEvent;
use crate::models::error::WatchError;
use crate::session::capture::EventSink;

/// Everything the orchestrator thread reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorInput {
    Tick,
    Capture(CaptureEvent),
    SetMuted(bool),
    RaiseAlarm,
    Shutdown,
}

/// Cloneable sender into the orchestrator's single input queue.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    inputs: Sender<OrchestratorInput>,
}

impl OrchestratorHandle {
    /// Create a handle and the queue it feeds.
    pub fn channel() -> (Self, Receiver<OrchestratorInput>) {
        let (inputs, receiver) = crossbeam_channel::unbounded();
        (Self { inputs }, receiver)
    }

    pub fn set_muted(&self, muted: bool) -> Result<(), WatchError> {
        self.send(OrchestratorInput::SetMuted(muted))
    }

    pub fn raise_alarm(&self) -> Result<(), WatchError> {
        self.send(OrchestratorInput::RaiseAlarm)
    }

    pub fn publish(&self, event: CaptureEvent) -> Result<(), WatchError> {
        self.send(OrchestratorInput::Capture(event))
    }

    /// Callback for the capture session: events land in the same queue as ticks,
    /// so a detection is always seen before any tick enqueued after it.
    pub fn event_sink(&self) -> EventSink {
        let inputs = self.inputs.clone();
        Arc::new(move |event: CaptureEvent| {
            if inputs.send(OrchestratorInput::Capture(event)).is_err() {
                log::debug!("Orchestrator stopped, dropping capture event");
            }
        })
    }

    fn send(&self, input: OrchestratorInput) -> Result<(), WatchError> {
        self.inputs.send(input).map_err(|_| WatchError::ChannelClosed)
    }
}

/// Runs an `Orchestrator` on a dedicated thread fed by one ordered queue,
/// with a ticker thread pushing `Tick` every `tick_interval`.
///
/// Ticks come from `crossbeam_channel::tick`, so they stay on a fixed
/// schedule however long the send takes.
pub struct OrchestratorRunner {
    handle: OrchestratorHandle,
    ticker_stop: Option<Sender<()>>,
    ticker_handle: Option<thread::JoinHandle<()>>,
    worker_handle: Option<thread::JoinHandle<Orchestrator>>,
}

impl OrchestratorRunner {
    pub fn start(orchestrator: Orchestrator) -> Result<Self, WatchError> {
        let (handle, inputs) = OrchestratorHandle::channel();
        Self::start_with(orchestrator, handle, inputs)
    }

    /// Start on an existing queue, so producers can be wired up before the
    /// orchestrator exists.
    pub fn start_with(
        orchestrator: Orchestrator,
        handle: OrchestratorHandle,
        inputs: Receiver<OrchestratorInput>,
    ) -> Result<Self, WatchError> {
        let tick_interval = orchestrator.config().tick_interval;

        let worker_handle = thread::Builder::new()
            .name("escalation-orchestrator".into())
            .spawn(move || drain(orchestrator, inputs))
            .map_err(|e| WatchError::Unknown(format!("failed to spawn orchestrator thread: {}", e)))?;

        let mut runner = Self {
            handle,
            ticker_stop: None,
            ticker_handle: None,
            worker_handle: Some(worker_handle),
        };
        runner.start_ticker(tick_interval)?;
        Ok(runner)
    }

    pub fn handle(&self) -> OrchestratorHandle {
        self.handle.clone()
    }

    /// Stop both threads and return the orchestrator for inspection.
    ///
    /// Inputs queued before the call are still processed.
    pub fn stop(mut self) -> Option<Orchestrator> {
        self.shutdown()
    }

    fn start_ticker(&mut self, tick_interval: Duration) -> Result<(), WatchError> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let inputs = self.handle.inputs.clone();

        let handle = thread::Builder::new()
            .name("escalation-ticker".into())
            .spawn(move || run_ticker(tick_interval, &inputs, &stop_rx))
            .map_err(|e| WatchError::Unknown(format!("failed to spawn ticker thread: {}", e)))?;

        self.ticker_stop = Some(stop_tx);
        self.ticker_handle = Some(handle);
        Ok(())
    }

    fn shutdown(&mut self) -> Option<Orchestrator> {
        drop(self.ticker_stop.take());
        if let Some(handle) = self.ticker_handle.take() {
            let _ = handle.join();
        }

        let worker = self.worker_handle.take()?;
        let _ = self.handle.inputs.send(OrchestratorInput::Shutdown);
        worker.join().ok()
    }
}

impl Drop for OrchestratorRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Push `Tick` on a fixed schedule until `stop` disconnects or the queue closes.
fn run_ticker(interval: Duration, inputs: &Sender<OrchestratorInput>, stop: &Receiver<()>) {
    let ticks = crossbeam_channel::tick(interval);
    loop {
        select! {
            recv(ticks) -> _ => {
                if inputs.send(OrchestratorInput::Tick).is_err() {
                    break;
                }
            }
            recv(stop) -> _ => break,
        }
    }
}

fn drain(mut orchestrator: Orchestrator, inputs: Receiver<OrchestratorInput>) -> Orchestrator {
    for input in inputs.iter() {
        let now = Instant::now();
        match input {
            OrchestratorInput::Tick => orchestrator.on_tick(now),
            OrchestratorInput::Capture(event) => orchestrator.on_capture_event(event, now),
            OrchestratorInput::SetMuted(muted) => orchestrator.set_muted(muted),
            OrchestratorInput::RaiseAlarm => orchestrator.raise_alarm(),
            OrchestratorInput::Shutdown => break,
        }
    }
    log::debug!("Orchestrator loop finished");
    orchestrator
}
