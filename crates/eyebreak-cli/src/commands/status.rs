use std::sync::Arc;

use eyebreak_core::{Config, Cycle, PrefSource};

/// Print the state a fresh session would start from, with phase lengths
/// resolved from the current configuration.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let prefs: Arc<dyn PrefSource> = Arc::new(config);
    let cycle = Cycle::new(prefs);
    let snapshot = cycle.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
