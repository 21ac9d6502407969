//! Notification seam.
//!
//! The core does not render notifications; it hands completion and
//! progress signals to whatever the host wires in here.

use crate::cycle::Phase;
use crate::events::CycleSnapshot;

/// Consumer of cycle progress and phase-completion signals.
pub trait Notifier: Send + Sync {
    /// The given phase has completed (or is about to, when driven from the
    /// finishing-phase lead).
    fn phase_complete(&self, phase: Phase);

    /// Continuous progress of the current phase, one update per tick.
    fn progress(&self, snapshot: &CycleSnapshot);
}

/// Notifier that drops every signal. Useful in tests and headless embeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn phase_complete(&self, _phase: Phase) {}

    fn progress(&self, _snapshot: &CycleSnapshot) {}
}
