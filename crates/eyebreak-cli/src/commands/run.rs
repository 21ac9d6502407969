//! Foreground timer session.
//!
//! Wires the cycle, the alarm scheduler, and the desktop notifier together
//! and drives them until interrupted. The session renders progress on
//! every tick, pre-arms the completion notification one tick before a
//! phase rolls over, and feeds fired alarms back through the wake
//! receiver so the notification path is the same one a backgrounded
//! process would take.

use std::sync::Arc;

use eyebreak_core::alarms::receiver;
use eyebreak_core::{AlarmScheduler, Config, Cycle, LivePrefs, Notifier, PrefSource, TaskAlarmBackend};
use tracing::info;

use crate::notify::DesktopNotifier;

pub async fn run(delay: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let notifier = DesktopNotifier::new(config.notifications.clone());
    // Phase lengths are re-read from the config file at every phase
    // (re)start, so `eyebreak config set` from another terminal takes
    // effect without restarting the session.
    let prefs: Arc<dyn PrefSource> = Arc::new(LivePrefs::new()?);

    let cycle = Arc::new(Cycle::new(prefs));
    let (backend, mut fired_rx) = TaskAlarmBackend::new();
    let scheduler = AlarmScheduler::spawn(Arc::clone(&cycle), Arc::new(backend));

    let mut state_rx = cycle.subscribe_state();
    cycle.start(delay);
    info!(
        phase = %cycle.phase(),
        duration_secs = cycle.duration_secs(),
        "session started"
    );

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = state_rx.borrow_and_update().clone();
                notifier.progress(&snap);
                if snap.is_finishing_phase() {
                    // One-second lead: the completion notification goes out
                    // before the phase actually rolls over.
                    notifier.phase_complete(snap.phase);
                }
            }
            fired = fired_rx.recv() => {
                match fired {
                    Some(tag) => receiver::on_alarm(&cycle, &scheduler, &notifier, &tag)?,
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("interrupt received; stopping session");
                cycle.pause();
                scheduler.update_alarms()?;
                break;
            }
        }
    }

    Ok(())
}
