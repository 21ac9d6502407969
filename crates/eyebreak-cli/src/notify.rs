//! Desktop and terminal notification rendering.

use std::io::Write;

use eyebreak_core::storage::NotificationsConfig;
use eyebreak_core::{CycleSnapshot, Notifier, Phase};
use tracing::warn;

/// Renders phase-completion signals as desktop notifications and progress
/// signals as a terminal status line.
pub struct DesktopNotifier {
    config: NotificationsConfig,
}

impl DesktopNotifier {
    pub fn new(config: NotificationsConfig) -> Self {
        Self { config }
    }

    fn show(&self, summary: &str, body: &str) {
        if !self.config.enabled {
            return;
        }
        let mut note = notify_rust::Notification::new();
        note.summary(summary).body(body).appname("eyebreak");
        if self.config.sound {
            note.sound_name("complete");
        }
        if let Err(err) = note.show() {
            warn!(%err, "failed to display desktop notification");
        }
    }
}

impl Notifier for DesktopNotifier {
    fn phase_complete(&self, phase: Phase) {
        let (summary, body) = match phase {
            Phase::Work => (
                "Work phase complete",
                "Look at something 20 feet away for 20 seconds.",
            ),
            Phase::Break => ("Break over", "Back to work."),
        };
        self.show(summary, body);
    }

    fn progress(&self, snapshot: &CycleSnapshot) {
        let state = if snapshot.running { "" } else { " (paused)" };
        print!(
            "\r{} {} remaining{}   ",
            snapshot.phase.label(),
            snapshot.remaining_text(),
            state
        );
        let _ = std::io::stdout().flush();
    }
}
