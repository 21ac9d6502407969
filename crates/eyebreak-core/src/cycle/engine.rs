//! Cycle state machine.
//!
//! The cycle tracks the current phase, elapsed time, and running flag, and
//! owns the per-second ticker task. All mutation goes through the control
//! operations; the ticker only ever advances a state it can prove is still
//! its own (generation check under the state lock).
//!
//! ## State transitions
//!
//! ```text
//! {Work, Break} x {running, paused}
//! start/pause/toggle_running flip the running flag;
//! restart_phase / start_next_phase move within and between phases;
//! a phase whose elapsed time reaches its duration advances automatically.
//! ```
//!
//! Control operations are synchronous and fast. They must be called from
//! within a tokio runtime: `start` spawns the ticker task on it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::phase::Phase;
use crate::events::{ControlEvent, CycleSnapshot};
use crate::storage::PrefSource;

struct CycleState {
    phase: Phase,
    running: bool,
    elapsed_secs: u64,
    duration_secs: u64,
    /// Bumped on every start/pause/skip so a ticker that was cancelled
    /// mid-wakeup cannot touch the state that replaced its own.
    generation: u64,
}

fn snapshot_of(state: &CycleState) -> CycleSnapshot {
    CycleSnapshot {
        phase: state.phase,
        running: state.running,
        elapsed_secs: state.elapsed_secs,
        duration_secs: state.duration_secs,
        at: Utc::now(),
    }
}

/// The repeating work/break cycle: one instance per process.
///
/// Publishes a state-snapshot stream (every tick, every control transition)
/// and a discrete control-event stream. Both are watch channels: late
/// subscribers see the latest value, slow subscribers observe conflated
/// updates, and the producer never blocks.
pub struct Cycle {
    state: Arc<Mutex<CycleState>>,
    prefs: Arc<dyn PrefSource>,
    state_tx: watch::Sender<CycleSnapshot>,
    control_tx: watch::Sender<Option<ControlEvent>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    // Keep one receiver of each stream alive so sends cannot fail while
    // no external subscriber is attached.
    _state_rx: watch::Receiver<CycleSnapshot>,
    _control_rx: watch::Receiver<Option<ControlEvent>>,
}

impl Cycle {
    /// Create a paused cycle in the work phase, with the phase duration
    /// resolved from the preference store.
    pub fn new(prefs: Arc<dyn PrefSource>) -> Self {
        let duration_secs = Phase::Work.duration_secs(prefs.as_ref());
        let state = CycleState {
            phase: Phase::Work,
            running: false,
            elapsed_secs: 0,
            duration_secs,
            generation: 0,
        };
        let (state_tx, state_rx) = watch::channel(snapshot_of(&state));
        let (control_tx, control_rx) = watch::channel(None);
        Self {
            state: Arc::new(Mutex::new(state)),
            prefs,
            state_tx,
            control_tx,
            ticker: Mutex::new(None),
            _state_rx: state_rx,
            _control_rx: control_rx,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.locked().phase
    }

    pub fn running(&self) -> bool {
        self.locked().running
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.locked().elapsed_secs
    }

    pub fn duration_secs(&self) -> u64 {
        self.locked().duration_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        let state = self.locked();
        state.duration_secs.saturating_sub(state.elapsed_secs)
    }

    pub fn is_finishing_phase(&self) -> bool {
        let state = self.locked();
        state.elapsed_secs + 1 == state.duration_secs
    }

    /// Current full state snapshot.
    pub fn snapshot(&self) -> CycleSnapshot {
        snapshot_of(&self.locked())
    }

    /// Subscribe to the state-snapshot stream.
    pub fn subscribe_state(&self) -> watch::Receiver<CycleSnapshot> {
        self.state_tx.subscribe()
    }

    /// Subscribe to the control-event stream. Holds `None` until the first
    /// control transition.
    pub fn subscribe_control(&self) -> watch::Receiver<Option<ControlEvent>> {
        self.control_tx.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin ticking the current phase, optionally after a startup delay.
    ///
    /// A no-op when already running. The running flag is published before
    /// the first tick, so observers see it immediately rather than one
    /// second later.
    pub fn start(&self, delay_secs: Option<u64>) {
        let (snap, generation) = {
            let mut state = self.locked();
            if state.running {
                debug!("start requested while cycle already running; ignoring");
                return;
            }
            state.running = true;
            state.generation += 1;
            (snapshot_of(&state), state.generation)
        };
        self.publish(snap);
        self.emit(ControlEvent::Started);
        self.spawn_ticker(generation, delay_secs.unwrap_or(0));
    }

    /// Stop ticking. A no-op when not running.
    pub fn pause(&self) {
        let snap = {
            let mut state = self.locked();
            if !state.running {
                debug!("pause requested while cycle not running; ignoring");
                return;
            }
            state.running = false;
            state.generation += 1;
            snapshot_of(&state)
        };
        self.cancel_ticker();
        self.publish(snap);
        self.emit(ControlEvent::Paused);
    }

    /// Pause if running, otherwise start.
    pub fn toggle_running(&self) {
        if self.running() {
            self.pause();
        } else {
            self.start(None);
        }
    }

    /// Reset the current phase to its beginning, re-resolving the duration
    /// from preferences. The running flag is unchanged; an active ticker
    /// keeps ticking against the reset state.
    pub fn restart_phase(&self) {
        let snap = {
            let mut state = self.locked();
            state.elapsed_secs = 0;
            state.duration_secs = state.phase.duration_secs(self.prefs.as_ref());
            snapshot_of(&state)
        };
        self.publish(snap);
        self.emit(ControlEvent::Restarted);
    }

    /// Immediately end the current phase and move to the next one.
    ///
    /// If the cycle was running, ticking resumes after `delay_secs` without
    /// re-emitting `Started`: the continuation is not a fresh user start.
    pub fn start_next_phase(&self, delay_secs: u64) {
        let (snap, was_running, generation) = {
            let mut state = self.locked();
            state.generation += 1;
            let was_running = state.running;
            state.phase = state.phase.next();
            state.elapsed_secs = 0;
            state.duration_secs = state.phase.duration_secs(self.prefs.as_ref());
            (snapshot_of(&state), was_running, state.generation)
        };
        self.cancel_ticker();
        info!(phase = %snap.phase, duration_secs = snap.duration_secs, "skipping to next phase");
        self.publish(snap);
        self.emit(ControlEvent::SkippedPhase);
        if was_running {
            self.spawn_ticker(generation, delay_secs);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn locked(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().expect("cycle state poisoned")
    }

    fn publish(&self, snap: CycleSnapshot) {
        if self.state_tx.send(snap).is_err() {
            warn!("state stream closed; snapshot dropped");
        }
    }

    fn emit(&self, event: ControlEvent) {
        debug!(%event, "control event");
        if self.control_tx.send(Some(event)).is_err() {
            warn!("control stream closed; event dropped");
        }
    }

    fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().expect("ticker slot poisoned").take() {
            handle.abort();
        }
    }

    /// Spawn the per-second ticker for the given state generation.
    ///
    /// Each tick increments the elapsed time and publishes a snapshot.
    /// When the elapsed time reaches the phase duration the ticker advances
    /// to the next phase in place and keeps ticking; the continuation emits
    /// no control event.
    fn spawn_ticker(&self, generation: u64, delay_secs: u64) {
        let state = Arc::clone(&self.state);
        let prefs = Arc::clone(&self.prefs);
        let state_tx = self.state_tx.clone();

        let handle = tokio::spawn(async move {
            if delay_secs > 0 {
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }
            let mut ticks = tokio::time::interval(Duration::from_secs(1));
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first interval tick completes immediately; the per-second
            // cadence starts after it.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let snap = {
                    let mut state = state.lock().expect("cycle state poisoned");
                    if state.generation != generation || !state.running {
                        break;
                    }
                    state.elapsed_secs += 1;
                    if state.elapsed_secs >= state.duration_secs {
                        let completed = state.phase;
                        state.phase = state.phase.next();
                        state.elapsed_secs = 0;
                        state.duration_secs = state.phase.duration_secs(prefs.as_ref());
                        info!(
                            completed = %completed,
                            next = %state.phase,
                            duration_secs = state.duration_secs,
                            "phase complete; continuing with next phase"
                        );
                    }
                    snapshot_of(&state)
                };
                if state_tx.send(snap).is_err() {
                    break;
                }
            }
        });

        let mut slot = self.ticker.lock().expect("ticker slot poisoned");
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }
}

impl Drop for Cycle {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPrefs;

    fn cycle_with_prefs(work: &str, brk: &str) -> (Cycle, Arc<MemoryPrefs>) {
        let prefs = Arc::new(MemoryPrefs::new());
        prefs.set(Phase::Work.pref_key(), work);
        prefs.set(Phase::Break.pref_key(), brk);
        (Cycle::new(Arc::clone(&prefs) as Arc<dyn PrefSource>), prefs)
    }

    #[tokio::test(start_paused = true)]
    async fn initial_state() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        assert!(!cycle.running());
        assert_eq!(cycle.phase(), Phase::Work);
        assert_eq!(cycle.elapsed_secs(), 0);
        assert_eq!(cycle.duration_secs(), 60);
        assert_eq!(cycle.remaining_secs(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn start_publishes_running_before_first_tick() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        let rx = cycle.subscribe_state();
        cycle.start(None);
        let snap = rx.borrow().clone();
        assert!(snap.running);
        assert_eq!(snap.elapsed_secs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_is_a_noop() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.start(None);
        cycle.start(None);
        // Two concurrent tickers would advance at 2/sec.
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(cycle.elapsed_secs(), 3);
        assert!(cycle.running());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticking_and_resume_continues() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        cycle.pause();
        assert!(!cycle.running());
        let paused_at = cycle.elapsed_secs();
        assert_eq!(paused_at, 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cycle.elapsed_secs(), paused_at);

        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cycle.elapsed_secs(), paused_at + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_while_paused_is_a_noop() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        let rx = cycle.subscribe_control();
        cycle.pause();
        assert_eq!(*rx.borrow(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_running_flips_state() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.toggle_running();
        assert!(cycle.running());
        cycle.toggle_running();
        assert!(!cycle.running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_phase_resets_elapsed_and_keeps_running_flag() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        cycle.restart_phase();
        assert_eq!(cycle.elapsed_secs(), 0);
        assert!(cycle.running());

        cycle.pause();
        cycle.restart_phase();
        assert!(!cycle.running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_phase_rereads_duration() {
        let (cycle, prefs) = cycle_with_prefs("60", "30");
        assert_eq!(cycle.duration_secs(), 60);
        prefs.set(Phase::Work.pref_key(), "90");
        cycle.restart_phase();
        assert_eq!(cycle.duration_secs(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_advances_phase_without_running() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.start_next_phase(0);
        assert_eq!(cycle.phase(), Phase::Break);
        assert_eq!(cycle.elapsed_secs(), 0);
        assert_eq!(cycle.duration_secs(), 30);
        assert!(!cycle.running());
    }

    #[tokio::test(start_paused = true)]
    async fn skip_while_running_keeps_ticking_the_new_phase() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        cycle.start_next_phase(0);
        assert_eq!(cycle.phase(), Phase::Break);
        assert!(cycle.running());
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(cycle.elapsed_secs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn phase_rolls_over_exactly_once() {
        let (cycle, _) = cycle_with_prefs("3", "30");
        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(cycle.phase(), Phase::Break);
        assert_eq!(cycle.elapsed_secs(), 0);
        assert!(cycle.running());
    }

    #[tokio::test(start_paused = true)]
    async fn one_second_work_phase_rolls_into_break() {
        let (cycle, _) = cycle_with_prefs("1", "30");
        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cycle.phase(), Phase::Break);
        assert_eq!(cycle.elapsed_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_phase_is_true_one_tick_before_rollover() {
        let (cycle, _) = cycle_with_prefs("3", "30");
        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(cycle.is_finishing_phase());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cycle.phase(), Phase::Break);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_advance_does_not_emit_control_events() {
        let (cycle, _) = cycle_with_prefs("2", "30");
        let mut rx = cycle.subscribe_control();
        cycle.start(None);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(ControlEvent::Started));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(cycle.phase(), Phase::Break);
        // Rollover happened, but no further control event was emitted.
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn start_delay_defers_first_tick() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.start(Some(5));
        assert!(cycle.running());
        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(cycle.elapsed_secs(), 0);
        tokio::time::sleep(Duration::from_millis(1700)).await;
        assert_eq!(cycle.elapsed_secs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn state_stream_replays_latest_to_late_subscribers() {
        let (cycle, _) = cycle_with_prefs("60", "30");
        cycle.start(None);
        tokio::time::sleep(Duration::from_millis(3100)).await;
        let rx = cycle.subscribe_state();
        let snap = rx.borrow().clone();
        assert_eq!(snap.elapsed_secs, 3);
        assert!(snap.running);
    }
}
