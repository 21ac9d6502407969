//! Wake-alarm backends.
//!
//! The platform alarm service is abstracted behind [`AlarmBackend`] with
//! exactly two operations, so the scheduler core is testable without a real
//! OS alarm facility. A backend holds at most one registration: scheduling
//! replaces the previous alarm, it never accumulates.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cycle::Phase;
use crate::error::AlarmError;

/// A one-shot wake alarm registration.
///
/// `fire_in` is a relative offset from now on a monotonic base: wall-clock
/// adjustments must not move the alarm. The payload carries only the tag of
/// the phase expected to complete, so the receiving handler can detect
/// desynchronization after process death.
pub trait AlarmBackend: Send + Sync {
    /// Register the single wake alarm, replacing any previous registration.
    fn schedule(&self, phase: Phase, fire_in: Duration) -> Result<(), AlarmError>;

    /// Cancel the pending wake alarm, if any.
    fn cancel(&self) -> Result<(), AlarmError>;
}

/// In-process backend: a single tokio sleep task stands in for the OS alarm
/// manager. When the alarm fires, the phase tag is sent into the channel
/// handed out at construction; the session loop feeds it to the wake
/// receiver. tokio's timer is monotonic, so the fire time survives
/// wall-clock changes.
pub struct TaskAlarmBackend {
    fired_tx: mpsc::UnboundedSender<String>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl TaskAlarmBackend {
    /// Create the backend and the channel on which fired phase tags arrive.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                fired_tx,
                pending: Mutex::new(None),
            },
            fired_rx,
        )
    }

    fn replace(&self, next: Option<JoinHandle<()>>) {
        let mut slot = self.pending.lock().expect("pending alarm slot poisoned");
        if let Some(old) = slot.take() {
            old.abort();
        }
        *slot = next;
    }
}

impl AlarmBackend for TaskAlarmBackend {
    fn schedule(&self, phase: Phase, fire_in: Duration) -> Result<(), AlarmError> {
        let tx = self.fired_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(fire_in).await;
            let _ = tx.send(phase.to_string());
        });
        self.replace(Some(handle));
        info!(%phase, fire_in_secs = fire_in.as_secs(), "alarm scheduled");
        Ok(())
    }

    fn cancel(&self) -> Result<(), AlarmError> {
        self.replace(None);
        debug!("alarm cancelled");
        Ok(())
    }
}

/// Recording backend for tests: keeps the last scheduled request and counts
/// outstanding registrations.
#[derive(Debug, Default)]
pub struct MemoryAlarmBackend {
    inner: Mutex<MemoryAlarmState>,
}

#[derive(Debug, Default)]
struct MemoryAlarmState {
    scheduled: Option<(Phase, Duration)>,
    schedule_calls: usize,
    cancel_calls: usize,
}

impl MemoryAlarmBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently registered alarm, if any.
    pub fn scheduled(&self) -> Option<(Phase, Duration)> {
        self.inner.lock().expect("alarm state poisoned").scheduled
    }

    /// Number of outstanding registrations: 0 or 1 by construction.
    pub fn outstanding(&self) -> usize {
        usize::from(self.scheduled().is_some())
    }

    pub fn schedule_calls(&self) -> usize {
        self.inner.lock().expect("alarm state poisoned").schedule_calls
    }

    pub fn cancel_calls(&self) -> usize {
        self.inner.lock().expect("alarm state poisoned").cancel_calls
    }
}

impl AlarmBackend for MemoryAlarmBackend {
    fn schedule(&self, phase: Phase, fire_in: Duration) -> Result<(), AlarmError> {
        let mut state = self.inner.lock().expect("alarm state poisoned");
        state.scheduled = Some((phase, fire_in));
        state.schedule_calls += 1;
        Ok(())
    }

    fn cancel(&self) -> Result<(), AlarmError> {
        let mut state = self.inner.lock().expect("alarm state poisoned");
        state.scheduled = None;
        state.cancel_calls += 1;
        Ok(())
    }
}
