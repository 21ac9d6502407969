use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::Phase;

/// Full state snapshot of the cycle, published on every tick and on every
/// control transition. Subscribers read everything they need from here
/// rather than querying the cycle back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub phase: Phase,
    pub running: bool,
    pub elapsed_secs: u64,
    pub duration_secs: u64,
    pub at: DateTime<Utc>,
}

impl CycleSnapshot {
    pub fn remaining_secs(&self) -> u64 {
        self.duration_secs.saturating_sub(self.elapsed_secs)
    }

    /// True exactly one tick before the phase rolls over, giving
    /// subscribers a one-second lead to prepare a completion notification.
    pub fn is_finishing_phase(&self) -> bool {
        self.elapsed_secs + 1 == self.duration_secs
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        self.elapsed_secs as f64 / self.duration_secs as f64
    }

    /// Remaining time as `h:mm:ss`, `m:ss`, or bare seconds.
    pub fn remaining_text(&self) -> String {
        format_time(self.remaining_secs())
    }
}

/// Discrete control-stream events, emitted when the corresponding cycle
/// operation actually executes. No-op calls and automatic phase
/// continuations do not emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlEvent {
    Started,
    Paused,
    Restarted,
    SkippedPhase,
}

impl std::fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlEvent::Started => "started",
            ControlEvent::Paused => "paused",
            ControlEvent::Restarted => "restarted",
            ControlEvent::SkippedPhase => "skipped_phase",
        };
        f.write_str(name)
    }
}

/// Format a second count for display.
pub fn format_time(total_secs: u64) -> String {
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}")
    } else if mins > 0 {
        format!("{mins}:{secs:02}")
    } else {
        format!("{secs}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(elapsed: u64, duration: u64) -> CycleSnapshot {
        CycleSnapshot {
            phase: Phase::Work,
            running: true,
            elapsed_secs: elapsed,
            duration_secs: duration,
            at: Utc::now(),
        }
    }

    #[test]
    fn remaining_is_duration_minus_elapsed() {
        assert_eq!(snapshot(5, 20).remaining_secs(), 15);
        assert_eq!(snapshot(20, 20).remaining_secs(), 0);
    }

    #[test]
    fn finishing_phase_flips_one_tick_before_rollover() {
        assert!(!snapshot(18, 20).is_finishing_phase());
        assert!(snapshot(19, 20).is_finishing_phase());
        assert!(!snapshot(20, 20).is_finishing_phase());
    }

    #[test]
    fn progress_is_bounded() {
        assert_eq!(snapshot(0, 20).progress(), 0.0);
        assert_eq!(snapshot(10, 20).progress(), 0.5);
        assert_eq!(snapshot(0, 0).progress(), 0.0);
    }

    #[test]
    fn format_time_picks_shortest_form() {
        assert_eq!(format_time(42), "42");
        assert_eq!(format_time(60), "1:00");
        assert_eq!(format_time(19 * 60 + 5), "19:05");
        assert_eq!(format_time(3600 + 2 * 60 + 3), "1:02:03");
    }

    #[test]
    fn control_event_serde_tags() {
        let json = serde_json::to_string(&ControlEvent::SkippedPhase).unwrap();
        assert_eq!(json, "\"skipped_phase\"");
        let back: ControlEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ControlEvent::SkippedPhase);
    }
}
