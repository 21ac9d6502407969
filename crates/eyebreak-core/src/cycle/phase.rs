use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::storage::PrefSource;

/// Preference key holding the work phase length in seconds.
pub const PREF_KEY_WORK_PHASE_SECS: &str = "timer.work_phase_secs";
/// Preference key holding the break phase length in seconds.
pub const PREF_KEY_BREAK_PHASE_SECS: &str = "timer.break_phase_secs";

/// The alternating phases of the 20-20-20 cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// The longer phase of the cycle.
    Work,
    /// The shorter phase of the cycle.
    Break,
}

impl Phase {
    /// The default duration for this phase, in seconds.
    pub const fn default_duration_secs(self) -> u64 {
        match self {
            Phase::Work => 20 * 60,
            Phase::Break => 20,
        }
    }

    /// The next sequential phase that follows this phase.
    pub const fn next(self) -> Phase {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
        }
    }

    /// The preference key holding this phase's length.
    pub const fn pref_key(self) -> &'static str {
        match self {
            Phase::Work => PREF_KEY_WORK_PHASE_SECS,
            Phase::Break => PREF_KEY_BREAK_PHASE_SECS,
        }
    }

    /// Display name for this phase.
    pub const fn label(self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::Break => "Break",
        }
    }

    /// Resolve this phase's duration from the preference store.
    ///
    /// The stored value is an integer-as-string. Absent, unparsable, or
    /// zero values fall back to the built-in default; zero counts as unset
    /// so a cleared settings field cannot produce an instantly-expiring
    /// phase. Re-reads the store on every call.
    pub fn duration_secs(self, prefs: &dyn PrefSource) -> u64 {
        match prefs.get(self.pref_key()).and_then(|s| s.trim().parse::<u64>().ok()) {
            Some(0) | None => self.default_duration_secs(),
            Some(secs) => secs,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Phase::Work => "work",
            Phase::Break => "break",
        };
        f.write_str(tag)
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(Phase::Work),
            "break" => Ok(Phase::Break),
            _ => Err(CoreError::UnknownPhase { tag: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPrefs;
    use proptest::prelude::*;

    #[test]
    fn next_phase_is_an_involution() {
        assert_eq!(Phase::Work.next(), Phase::Break);
        assert_eq!(Phase::Break.next(), Phase::Work);
        for phase in [Phase::Work, Phase::Break] {
            assert_eq!(phase.next().next(), phase);
        }
    }

    #[test]
    fn duration_falls_back_to_default_when_unset() {
        let prefs = MemoryPrefs::new();
        assert_eq!(Phase::Work.duration_secs(&prefs), 20 * 60);
        assert_eq!(Phase::Break.duration_secs(&prefs), 20);
    }

    #[test]
    fn duration_reads_stored_preference() {
        let prefs = MemoryPrefs::new();
        prefs.set(PREF_KEY_WORK_PHASE_SECS, "100");
        assert_eq!(Phase::Work.duration_secs(&prefs), 100);
    }

    #[test]
    fn duration_is_not_cached_between_reads() {
        let prefs = MemoryPrefs::new();
        prefs.set(PREF_KEY_WORK_PHASE_SECS, "100");
        assert_eq!(Phase::Work.duration_secs(&prefs), 100);
        prefs.set(PREF_KEY_WORK_PHASE_SECS, "3600");
        assert_eq!(Phase::Work.duration_secs(&prefs), 3600);
    }

    #[test]
    fn zero_duration_counts_as_unset() {
        let prefs = MemoryPrefs::new();
        prefs.set(PREF_KEY_BREAK_PHASE_SECS, "0");
        assert_eq!(Phase::Break.duration_secs(&prefs), 20);
    }

    #[test]
    fn phase_tag_roundtrip() {
        for phase in [Phase::Work, Phase::Break] {
            let parsed: Phase = phase.to_string().parse().unwrap();
            assert_eq!(parsed, phase);
        }
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let err = "lunch".parse::<Phase>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownPhase { .. }));
    }

    proptest! {
        #[test]
        fn malformed_preference_never_panics(value in "\\PC*") {
            let prefs = MemoryPrefs::new();
            prefs.set(PREF_KEY_WORK_PHASE_SECS, &value);
            let secs = Phase::Work.duration_secs(&prefs);
            prop_assert!(secs > 0);
        }

        #[test]
        fn non_numeric_preference_yields_default(value in "[a-zA-Z ]+") {
            let prefs = MemoryPrefs::new();
            prefs.set(PREF_KEY_BREAK_PHASE_SECS, &value);
            prop_assert_eq!(Phase::Break.duration_secs(&prefs), 20);
        }
    }
}
