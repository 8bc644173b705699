//! Refresh scheduler: the only writer to the dataset store.
//!
//! Each cycle walks `Idle → Fetching → Building → Publishing → Idle`. Fetch and
//! build run entirely off to the side; only the final `swap` touches the
//! store. A failed cycle is logged and leaves the published snapshot alone.
//!
//! The background loop runs on its own named thread. Stopping is signalled
//! over an `mpsc` channel whose `recv_timeout` doubles as the inter-cycle
//! sleep, so shutdown is observed between cycles and never mid-swap.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use buzzwatch_core::{build_snapshot, BuildError, DatasetLoader, DatasetStore, LoadError};

/// Why a refresh cycle was aborted.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("build failed: {0}")]
    Build(#[from] BuildError),
}

/// Where the scheduler currently is within a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CyclePhase {
    #[default]
    Idle,
    Fetching,
    Building,
    Publishing,
}

/// Outcome of a published cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub stocks: usize,
    pub dataset_hash: String,
    /// False when the fetched bytes hash the same as the previous snapshot.
    pub changed: bool,
    pub duration_ms: u64,
}

/// Events sent from the scheduler thread to an optional listener.
#[derive(Debug, Clone)]
pub enum CycleEvent {
    Published(CycleReport),
    Failed { cycle: u64, error: String },
}

/// Health of the refresh loop, shared with readers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStatus {
    pub phase: CyclePhase,
    pub cycles_ok: u64,
    pub cycles_failed: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Cloneable read handle for [`SchedulerStatus`].
#[derive(Debug, Clone, Default)]
pub struct StatusHandle(Arc<Mutex<SchedulerStatus>>);

impl StatusHandle {
    pub fn get(&self) -> SchedulerStatus {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update(&self, f: impl FnOnce(&mut SchedulerStatus)) {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

pub struct RefreshScheduler {
    loader: DatasetLoader,
    store: Arc<DatasetStore>,
    interval: Duration,
    next_cycle: u64,
    status: StatusHandle,
    events: Option<Sender<CycleEvent>>,
}

impl RefreshScheduler {
    pub fn new(loader: DatasetLoader, store: Arc<DatasetStore>, interval: Duration) -> Self {
        let next_cycle = store.snapshot().cycle() + 1;
        Self {
            loader,
            store,
            interval,
            next_cycle,
            status: StatusHandle::default(),
            events: None,
        }
    }

    /// Send a [`CycleEvent`] to `tx` after every cycle.
    pub fn with_events(mut self, tx: Sender<CycleEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one fetch → build → publish cycle on the calling thread.
    #[instrument(skip(self), fields(cycle = self.next_cycle))]
    pub fn run_cycle(&mut self) -> Result<CycleReport, RefreshError> {
        let cycle = self.next_cycle;
        self.next_cycle += 1;
        let started = Instant::now();

        let result = self.attempt(cycle, started);
        self.set_phase(CyclePhase::Idle);

        match &result {
            Ok(report) => {
                info!(
                    cycle,
                    stocks = report.stocks,
                    changed = report.changed,
                    duration_ms = report.duration_ms,
                    "refresh cycle published"
                );
                self.status.update(|s| {
                    s.cycles_ok += 1;
                    s.last_success = Some(Utc::now());
                    s.last_error = None;
                });
                self.emit(CycleEvent::Published(report.clone()));
            }
            Err(e) => {
                error!(cycle, error = %e, "refresh cycle failed, keeping previous snapshot");
                let message = e.to_string();
                self.status.update(|s| {
                    s.cycles_failed += 1;
                    s.last_error = Some(message.clone());
                });
                self.emit(CycleEvent::Failed {
                    cycle,
                    error: message,
                });
            }
        }

        result
    }

    fn attempt(&self, cycle: u64, started: Instant) -> Result<CycleReport, RefreshError> {
        self.set_phase(CyclePhase::Fetching);
        let loaded = self.loader.load()?;

        self.set_phase(CyclePhase::Building);
        let snapshot = build_snapshot(loaded, cycle)?;
        let stocks = snapshot.prices().len();
        let dataset_hash = snapshot.dataset_hash().to_string();

        self.set_phase(CyclePhase::Publishing);
        let previous = self.store.swap(snapshot);

        Ok(CycleReport {
            cycle,
            stocks,
            changed: previous.dataset_hash() != dataset_hash,
            dataset_hash,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn set_phase(&self, phase: CyclePhase) {
        self.status.update(|s| s.phase = phase);
    }

    fn emit(&self, event: CycleEvent) {
        if let Some(tx) = &self.events {
            // A dropped listener is not a reason to stop refreshing.
            let _ = tx.send(event);
        }
    }

    /// Start the refresh loop on a background thread. The first cycle runs
    /// immediately.
    pub fn spawn(self) -> std::io::Result<SchedulerHandle> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let status = self.status.clone();
        let join = thread::Builder::new()
            .name("buzzwatch-refresh".into())
            .spawn(move || self.run_loop(stop_rx))?;

        Ok(SchedulerHandle {
            stop_tx,
            join,
            status,
        })
    }

    fn run_loop(mut self, stop_rx: Receiver<()>) {
        info!(interval_secs = self.interval.as_secs(), "refresh scheduler started");
        loop {
            let started = Instant::now();
            // Errors are recorded in status and logged by run_cycle.
            let _ = self.run_cycle();

            match stop_rx.recv_timeout(next_wait(self.interval, started.elapsed())) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("scheduler handle dropped without stop, shutting down");
                    break;
                }
            }
        }
        info!("refresh scheduler stopped");
    }
}

/// Time left until the next tick. A cycle that overruns the interval is
/// followed immediately by the next one.
fn next_wait(interval: Duration, cycle_took: Duration) -> Duration {
    interval.saturating_sub(cycle_took)
}

/// Owner of a running refresh loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
    status: StatusHandle,
}

impl SchedulerHandle {
    pub fn status(&self) -> SchedulerStatus {
        self.status.get()
    }

    /// Ask the loop to stop after the current cycle and wait for it.
    pub fn stop(self) -> thread::Result<()> {
        let _ = self.stop_tx.send(());
        self.join.join()
    }
}
