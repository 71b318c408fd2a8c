//! Continuous input polling
//!
//! A [`Monitor`] polls one or more controller slots at a fixed rate on a
//! background thread. Every exchange goes through the shared client lock, so
//! at most one command is ever in flight. Snapshots are delivered over a
//! bounded channel and mirrored into a [`SnapshotStore`] for readers that only
//! want the latest state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controller::{ControllerState, MAX_CONTROLLERS};
use crate::protocol::{InsenClient, InsenError};

/// Polling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Slots to poll, in order, once per cycle
    pub controller_ids: Vec<u8>,
    /// Poll cycles per second
    pub rate_hz: u32,
    /// Snapshots buffered for the reader before new ones are dropped
    pub queue_depth: usize,
    /// Upper bound on waiting for the polling thread in [`Monitor::stop`].
    /// The stop flag is checked before every command, so this only needs to
    /// exceed one command timeout regardless of how many slots are polled.
    pub join_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            controller_ids: vec![0],
            rate_hz: 60,
            queue_depth: 64,
            join_timeout_ms: 3000,
        }
    }
}

impl MonitorConfig {
    fn validate(&self) -> Result<(), InsenError> {
        if self.rate_hz == 0 {
            return Err(InsenError::InvalidParam("rate_hz must be > 0".to_string()));
        }
        if self.controller_ids.is_empty() {
            return Err(InsenError::InvalidParam(
                "no controller ids to poll".to_string(),
            ));
        }
        if let Some(id) = self.controller_ids.iter().find(|&&id| id >= MAX_CONTROLLERS) {
            return Err(InsenError::InvalidParam(format!(
                "controller id {} out of range 0..{}",
                id, MAX_CONTROLLERS
            )));
        }
        Ok(())
    }

    fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.rate_hz))
    }
}

/// Last known state per controller slot, shared between the polling thread
/// and any number of readers
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<Mutex<HashMap<u8, ControllerState>>>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u8, ControllerState>> {
        // A panicking writer cannot leave a half-written record behind:
        // entries are replaced whole.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the snapshot for `state.id`
    pub fn insert(&self, state: ControllerState) {
        self.lock().insert(state.id, state);
    }

    /// Forget the snapshot for `id`
    pub fn remove(&self, id: u8) -> Option<ControllerState> {
        self.lock().remove(&id)
    }

    /// Latest snapshot for `id`
    pub fn get(&self, id: u8) -> Option<ControllerState> {
        self.lock().get(&id).cloned()
    }

    /// All known snapshots, ordered by controller id
    pub fn all(&self) -> Vec<ControllerState> {
        let mut states: Vec<ControllerState> = self.lock().values().cloned().collect();
        states.sort_by_key(|s| s.id);
        states
    }

    /// Number of slots with a snapshot
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no slot has a snapshot
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Handle to a running polling thread
pub struct Monitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    snapshots: SnapshotStore,
    join_timeout: Duration,
}

impl Monitor {
    /// Start polling. Returns the monitor handle and the receiving end of the
    /// snapshot queue.
    pub fn start(
        client: Arc<Mutex<InsenClient>>,
        config: MonitorConfig,
    ) -> Result<(Self, Receiver<ControllerState>), InsenError> {
        config.validate()?;

        let (tx, rx) = mpsc::sync_channel(config.queue_depth.max(1));
        let stop = Arc::new(AtomicBool::new(false));
        let snapshots = SnapshotStore::new();
        let join_timeout = Duration::from_millis(config.join_timeout_ms);

        let worker = PollWorker {
            client,
            ids: config.controller_ids.clone(),
            interval: config.interval(),
            stop: Arc::clone(&stop),
            snapshots: snapshots.clone(),
            tx,
        };

        let handle = thread::Builder::new()
            .name("insen-monitor".to_string())
            .spawn(move || worker.run())?;

        info!(
            ids = ?config.controller_ids,
            rate_hz = config.rate_hz,
            "started controller monitoring"
        );

        Ok((
            Self {
                stop,
                handle: Some(handle),
                snapshots,
                join_timeout,
            },
            rx,
        ))
    }

    /// Shared view of the latest snapshot per slot
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// True while the polling thread is alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the polling thread and wait (bounded) for it to exit.
    ///
    /// Returns `true` once the thread has been joined. Only after that is it
    /// safe to disconnect the client. Calling `stop` again after a successful
    /// stop is a no-op that returns `true`.
    pub fn stop(&mut self) -> bool {
        self.stop.store(true, Ordering::Release);

        let Some(handle) = self.handle.take() else {
            return true;
        };

        let deadline = Instant::now() + self.join_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    "monitor thread did not stop in time"
                );
                self.handle = Some(handle);
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }

        if handle.join().is_err() {
            warn!("monitor thread panicked");
        }
        info!("stopped controller monitoring");
        true
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State moved onto the polling thread
struct PollWorker {
    client: Arc<Mutex<InsenClient>>,
    ids: Vec<u8>,
    interval: Duration,
    stop: Arc<AtomicBool>,
    snapshots: SnapshotStore,
    tx: SyncSender<ControllerState>,
}

impl PollWorker {
    fn run(self) {
        while !self.stop.load(Ordering::Acquire) {
            let cycle_start = Instant::now();

            for &id in &self.ids {
                if self.stop.load(Ordering::Acquire) {
                    return;
                }
                if !self.poll_one(id) {
                    self.stop.store(true, Ordering::Release);
                    return;
                }
            }

            if let Some(rest) = self.interval.checked_sub(cycle_start.elapsed()) {
                thread::sleep(rest);
            }
        }
    }

    /// Poll one slot. Returns `false` when polling cannot continue.
    fn poll_one(&self, id: u8) -> bool {
        let result = {
            let mut client = self
                .client
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            client.get_controller_input(id)
        };

        match result {
            Ok(state) => {
                self.snapshots.insert(state.clone());
                match self.tx.try_send(state) {
                    Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                    Err(TrySendError::Full(_)) => {
                        debug!(id, "snapshot queue full, dropping sample");
                    }
                }
                true
            }
            Err(InsenError::ControllerDisconnected(_)) => {
                if self.snapshots.remove(id).is_some() {
                    info!(id, "controller disconnected");
                }
                true
            }
            Err(InsenError::Timeout) => {
                debug!(id, "poll timed out");
                true
            }
            Err(InsenError::InvalidResponse(reason)) => {
                warn!(id, reason = reason.as_str(), "ignoring malformed reply");
                true
            }
            Err(e) => {
                warn!(id, error = %e, "stopping monitor");
                false
            }
        }
    }
}
