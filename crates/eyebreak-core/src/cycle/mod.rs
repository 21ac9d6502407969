mod engine;
mod phase;

pub use engine::Cycle;
pub use phase::{Phase, PREF_KEY_BREAK_PHASE_SECS, PREF_KEY_WORK_PHASE_SECS};
