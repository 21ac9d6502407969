//! Handles fired wake alarms.
//!
//! The alarm payload carries only a phase tag, so this is where in-memory
//! cycle state gets reconciled with what the alarm claims completed. The
//! hosting process may have been torn down and restarted since the alarm
//! was armed; in that case the cycle still sits at the phase the alarm was
//! armed for and must be force-advanced before ticking resumes.

use tracing::info;

use super::scheduler::AlarmScheduler;
use crate::cycle::{Cycle, Phase};
use crate::error::Result;
use crate::notify::Notifier;

/// Process a fired wake alarm carrying `phase_tag`.
///
/// Notifies the user of the completed phase, resynchronizes the cycle if
/// the process had been restarted in the meantime, and re-arms the next
/// alarm.
///
/// # Errors
///
/// Returns [`crate::CoreError::UnknownPhase`] if the tag does not name a
/// known phase: acting on it could desynchronize the pending alarm from
/// the in-memory cycle, so the payload is rejected outright.
pub fn on_alarm(
    cycle: &Cycle,
    scheduler: &AlarmScheduler,
    notifier: &dyn Notifier,
    phase_tag: &str,
) -> Result<()> {
    let completed: Phase = phase_tag.parse()?;
    info!(phase = %completed, "wake alarm fired");

    notifier.phase_complete(completed);

    if !cycle.running() {
        if cycle.phase() == completed {
            info!("cycle is out of sync with the fired alarm; starting next phase");
            cycle.start_next_phase(0);
        }
        info!("cycle was stopped; restarting");
        cycle.start(None);
    }

    scheduler.update_alarms()?;
    Ok(())
}
