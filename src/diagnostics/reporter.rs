//! Periodic engine status reporter for frame-skip heuristics and UI.

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::playback::engine::{EngineMetrics, EngineProbe};

type ReportCallback = Arc<Mutex<dyn FnMut(Report) + Send>>;

/// Snapshot of engine status sent to report consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub occupancy: u32,
    pub paused: bool,
    pub metrics: EngineMetrics,
}

impl Report {
    fn capture(probe: &EngineProbe) -> Self {
        Self {
            occupancy: probe.occupancy(),
            paused: probe.is_paused(),
            metrics: probe.metrics(),
        }
    }
}

struct Worker {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

/// Polls an [`EngineProbe`] on a background thread and invokes the callback
/// with the first snapshot and every snapshot that differs from the last.
pub struct Reporter {
    probe: EngineProbe,
    on_change: ReportCallback,
    interval: Duration,
    worker: Mutex<Option<Worker>>,
}

impl Reporter {
    pub fn new(
        probe: EngineProbe,
        on_change: impl FnMut(Report) + Send + 'static,
        interval: Duration,
    ) -> Self {
        Self {
            probe,
            on_change: Arc::new(Mutex::new(on_change)),
            interval,
            worker: Mutex::new(None),
        }
    }

    /// Take one snapshot without involving the worker.
    pub fn snapshot(&self) -> Report {
        Report::capture(&self.probe)
    }

    /// Return `true` while the polling thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawn the polling thread. Does nothing if it is already running.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return;
        }

        let (stop, stopped) = channel();
        let probe = self.probe.clone();
        let on_change = self.on_change.clone();
        let interval = self.interval;
        let thread = thread::spawn(move || {
            let mut last = None;
            loop {
                let report = Report::capture(&probe);
                if last != Some(report) {
                    (*on_change.lock().unwrap_or_else(PoisonError::into_inner))(report);
                    last = Some(report);
                }
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        *worker = Some(Worker { stop, thread });
    }

    /// Signal the polling thread and wait for it. Does nothing when stopped.
    pub fn stop(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Worker { stop, thread }) = worker else {
            return;
        };
        let _ = stop.send(());
        if thread.thread().id() == thread::current().id() {
            log::warn!("reporter stopped from its own callback; not joining");
        } else if thread.join().is_err() {
            log::warn!("reporter thread panicked");
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.stop();
    }
}
