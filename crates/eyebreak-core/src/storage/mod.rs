mod config;

pub use config::{Config, NotificationsConfig, TimerConfig};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::{ConfigError, Result};

/// A read-only key-value string store for user preferences.
///
/// Phase lengths are resolved through this trait on every phase (re)start,
/// so a settings change takes effect the next time the phase begins.
pub trait PrefSource: Send + Sync {
    /// Look up a preference by dot-separated key. `None` means unset.
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory preference store, used by tests and embedders that do not
/// want a config file on disk.
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .expect("preference map poisoned")
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values
            .lock()
            .expect("preference map poisoned")
            .remove(key);
    }
}

impl PrefSource for MemoryPrefs {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .expect("preference map poisoned")
            .get(key)
            .cloned()
    }
}

/// Preference source that re-reads the config file on every lookup, so a
/// settings change made by another process takes effect the next time a
/// phase (re)starts.
///
/// A missing or malformed file yields `None` for every key, which makes
/// the phase defaults apply.
pub struct LivePrefs {
    path: PathBuf,
}

impl LivePrefs {
    /// Watch the default config path.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: Config::path()?,
        })
    }

    /// Watch an explicit config file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PrefSource for LivePrefs {
    fn get(&self, key: &str) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let config: Config = toml::from_str(&content).ok()?;
        config.get(key)
    }
}

/// Returns `~/.config/eyebreak[-dev]/` based on EYEBREAK_ENV.
///
/// Set EYEBREAK_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("EYEBREAK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("eyebreak-dev")
    } else {
        base_dir.join("eyebreak")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_prefs_roundtrip() {
        let prefs = MemoryPrefs::new();
        assert_eq!(prefs.get("timer.work_phase_secs"), None);
        prefs.set("timer.work_phase_secs", "90");
        assert_eq!(prefs.get("timer.work_phase_secs").as_deref(), Some("90"));
        prefs.remove("timer.work_phase_secs");
        assert_eq!(prefs.get("timer.work_phase_secs"), None);
    }

    #[test]
    fn live_prefs_sees_writes_between_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let prefs = LivePrefs::at(&path);
        assert_eq!(prefs.get("timer.work_phase_secs"), None);

        let mut config = Config::default();
        config.timer.work_phase_secs = "100".into();
        config.save_to(&path).unwrap();
        assert_eq!(prefs.get("timer.work_phase_secs").as_deref(), Some("100"));

        config.timer.work_phase_secs = "3600".into();
        config.save_to(&path).unwrap();
        assert_eq!(prefs.get("timer.work_phase_secs").as_deref(), Some("3600"));
    }

    #[test]
    fn live_prefs_treats_malformed_file_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timer = \"not a table\"").unwrap();
        let prefs = LivePrefs::at(&path);
        assert_eq!(prefs.get("timer.work_phase_secs"), None);
    }
}
