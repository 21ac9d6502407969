//! # Eyebreak Core Library
//!
//! Core business logic for the Eyebreak 20-20-20 interval timer: a long
//! work phase alternating with a short break phase, with wake alarms that
//! deliver phase-completion notifications even when no foreground session
//! is ticking.
//!
//! ## Architecture
//!
//! - **Cycle**: the timer state machine. Owns the per-second ticker task
//!   and publishes a state-snapshot stream plus a discrete control-event
//!   stream (watch channels: replay-latest, conflating).
//! - **Alarms**: [`AlarmScheduler`] mirrors the cycle's run state into an
//!   [`AlarmBackend`] holding a single replaceable wake alarm;
//!   [`alarms::receiver::on_alarm`] reconciles cycle state when one fires.
//! - **Storage**: TOML configuration, exposed to the cycle through the
//!   [`PrefSource`] key-value seam.
//!
//! ## Key Components
//!
//! - [`Cycle`]: control operations and event streams
//! - [`Phase`]: the two alternating phases and their durations
//! - [`AlarmScheduler`]: keeps the pending wake alarm in sync
//! - [`Config`]: application configuration management

pub mod alarms;
pub mod cycle;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;

pub use alarms::{AlarmBackend, AlarmScheduler, MemoryAlarmBackend, TaskAlarmBackend};
pub use cycle::{Cycle, Phase};
pub use error::{AlarmError, ConfigError, CoreError, Result};
pub use events::{ControlEvent, CycleSnapshot};
pub use notify::{Notifier, NullNotifier};
pub use storage::{Config, LivePrefs, MemoryPrefs, PrefSource};
