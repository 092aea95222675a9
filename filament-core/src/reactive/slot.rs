//! Value bookkeeping for a signal node.
//!
//! A `ValueSlot` holds the current and previous value, an update counter
//! that advances by exactly one whenever the value is genuinely replaced,
//! and wall-clock timestamps of the last two updates. It is pure data; the
//! decision of *whether* a compute result counts as a genuine replacement
//! lives with the node.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::value::Value;

/// Wall-clock seconds since the unix epoch; `0.0` means "never".
pub(crate) fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Current/previous value pair plus update counter and timestamps.
#[derive(Debug, Clone, Default)]
pub struct ValueSlot {
    current: Option<Value>,
    previous: Option<Value>,
    update_count: u64,
    timestamp: f64,
    previous_timestamp: f64,
}

impl ValueSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current value, if one was ever produced.
    pub fn current(&self) -> Option<&Value> {
        self.current.as_ref()
    }

    /// The value from right before the last update.
    pub fn previous(&self) -> Option<&Value> {
        self.previous.as_ref()
    }

    /// How many times the value was genuinely replaced.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Unix timestamp of the last update; `0.0` if never updated.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn previous_timestamp(&self) -> f64 {
        self.previous_timestamp
    }

    /// Whether a value was ever produced.
    pub fn has_value(&self) -> bool {
        self.current.is_some()
    }

    /// Whether `value` equals the current value.
    pub fn is_current(&self, value: &Value) -> bool {
        self.current.as_ref() == Some(value)
    }

    /// Store a genuinely new value: rotate current into previous, advance
    /// the counter by one, rotate timestamps.
    pub fn record(&mut self, value: Value) {
        self.previous = self.current.replace(value);
        self.update_count += 1;
        self.previous_timestamp = self.timestamp;
        self.timestamp = now();
    }

    /// Store a default produced by self-initialization. The counter does
    /// not advance and the timestamp is pinned to `1.0` — "updated long
    /// ago" — so the counter only ever tracks genuine updates.
    pub fn seed(&mut self, value: Value) {
        self.current = Some(value);
        self.timestamp = 1.0;
    }
}
