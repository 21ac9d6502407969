//! Mirrors the cycle's run state into the wake-alarm backend.
//!
//! There should be only one scheduler per process: the backend holds a
//! single registration, so any additional scheduler would override alarms
//! set by the others.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::backend::AlarmBackend;
use crate::cycle::Cycle;
use crate::error::AlarmError;

/// Observes the cycle's control-event stream and keeps exactly one pending
/// wake alarm in sync with it: armed for the phase expiration while the
/// cycle runs, cancelled otherwise.
pub struct AlarmScheduler {
    cycle: Arc<Cycle>,
    backend: Arc<dyn AlarmBackend>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl AlarmScheduler {
    /// Create the scheduler and subscribe it to the cycle's control stream.
    ///
    /// Every control event triggers [`AlarmScheduler::update_alarms`]. The
    /// subscription task holds only a weak reference; dropping the returned
    /// scheduler ends it.
    pub fn spawn(cycle: Arc<Cycle>, backend: Arc<dyn AlarmBackend>) -> Arc<Self> {
        let scheduler = Arc::new(Self {
            cycle: Arc::clone(&cycle),
            backend,
            subscription: Mutex::new(None),
        });

        let mut control_rx = cycle.subscribe_control();
        let weak = Arc::downgrade(&scheduler);
        let handle = tokio::spawn(async move {
            while control_rx.changed().await.is_ok() {
                let event = *control_rx.borrow_and_update();
                let Some(event) = event else { continue };
                let Some(scheduler) = weak.upgrade() else { break };
                debug!(%event, "timer control event");
                if let Err(err) = scheduler.update_alarms() {
                    error!(%err, "failed to update alarms after control event");
                }
            }
        });
        *scheduler
            .subscription
            .lock()
            .expect("subscription slot poisoned") = Some(handle);

        info!("alarm scheduler started");
        scheduler
    }

    /// Update the pending alarm from the current state of the cycle.
    ///
    /// If the cycle is running, (re)schedules the wake alarm for the
    /// current phase's expiration; otherwise cancels it. Calling this twice
    /// without an intervening state change leaves exactly one registration,
    /// because the backend replaces rather than accumulates.
    pub fn update_alarms(&self) -> Result<(), AlarmError> {
        if self.cycle.running() {
            let phase = self.cycle.phase();
            let fire_in = Duration::from_secs(self.cycle.remaining_secs());
            info!(%phase, fire_in_secs = fire_in.as_secs(), "scheduling phase completion alarm");
            self.backend.schedule(phase, fire_in)
        } else {
            info!("cycle not running; cancelling pending alarm");
            self.backend.cancel()
        }
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self
            .subscription
            .lock()
            .expect("subscription slot poisoned")
            .take()
        {
            handle.abort();
        }
    }
}
