//! Coalescing of keyed editor events
//!
//! Editor hosts fire activation/modification events in bursts; only the
//! most recent scheduled call for a given (event-kind, file) key should
//! reach the bridge. The timer itself belongs to the host. This module
//! keeps just the generation bookkeeping: scheduling a new task for a
//! key invalidates earlier generations, which the host checks at fire
//! time.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Debouncer {
    state: Mutex<DebounceState>,
}

#[derive(Debug, Default)]
struct DebounceState {
    next_generation: u64,
    latest: HashMap<String, u64>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly scheduled task for `key` and return its generation.
    /// Any generation handed out earlier for the same key is now stale.
    pub fn schedule(&self, key: &str) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.next_generation += 1;
        let generation = state.next_generation;
        state.latest.insert(key.to_string(), generation);
        generation
    }

    /// True iff `generation` is still the latest scheduled for `key`.
    /// Called by the host when its timer fires.
    pub fn should_fire(&self, key: &str, generation: u64) -> bool {
        self.state.lock().unwrap().latest.get(key) == Some(&generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_schedule_invalidates_older() {
        let debouncer = Debouncer::new();
        let first = debouncer.schedule("modified /proj/a.html");
        let second = debouncer.schedule("modified /proj/a.html");
        assert!(!debouncer.should_fire("modified /proj/a.html", first));
        assert!(debouncer.should_fire("modified /proj/a.html", second));
    }

    #[test]
    fn test_keys_are_independent() {
        let debouncer = Debouncer::new();
        let activated = debouncer.schedule("activated /proj/a.html");
        let modified = debouncer.schedule("modified /proj/a.html");
        assert!(debouncer.should_fire("activated /proj/a.html", activated));
        assert!(debouncer.should_fire("modified /proj/a.html", modified));
    }

    #[test]
    fn test_unknown_key_never_fires() {
        let debouncer = Debouncer::new();
        assert!(!debouncer.should_fire("deactivated /proj/a.html", 1));
    }
}
