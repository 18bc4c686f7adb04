//! Lightweight cache-event counters.
//!
//! Compile and tuning caches report hits and misses here so callers and tests
//! can observe cache behaviour without a full profiler.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

static CACHE_EVENTS: OnceLock<Mutex<HashMap<&'static str, u64>>> = OnceLock::new();

fn cache_events() -> &'static Mutex<HashMap<&'static str, u64>> {
    CACHE_EVENTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Records one occurrence of a named cache event.
pub fn cache_event(name: &'static str) {
    tracing::trace!(event = name, "cache event");
    if let Ok(mut events) = cache_events().lock() {
        *events.entry(name).or_insert(0) += 1;
    }
}

/// Number of times `name` was recorded since process start.
pub fn cache_event_count(name: &str) -> u64 {
    cache_events()
        .lock()
        .ok()
        .and_then(|events| events.get(name).copied())
        .unwrap_or(0)
}
