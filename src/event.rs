//! Trace event records and entry/exit classification
//!
//! Kernel tracers name syscall events with a marker that tells entry and exit
//! apart (LTTng: `syscall_entry_read` / `syscall_exit_read`). The call name is
//! whatever remains once the marker is removed.

use serde::{Deserialize, Serialize};

/// Default LTTng entry marker
pub const DEFAULT_ENTRY_MARKER: &str = "syscall_entry_";

/// Default LTTng exit marker
pub const DEFAULT_EXIT_MARKER: &str = "syscall_exit_";

/// A single decoded trace event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Full event name (e.g., "syscall_entry_openat")
    pub name: String,
    /// Nanoseconds from the trace clock origin
    pub timestamp_ns: u64,
}

impl EventRecord {
    pub fn new(name: impl Into<String>, timestamp_ns: u64) -> Self {
        Self {
            name: name.into(),
            timestamp_ns,
        }
    }
}

/// What an event means for entry/exit matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Call entry for the named syscall
    Entry(String),
    /// Call exit for the named syscall
    Exit(String),
    /// Anything else (sched_switch, irq_handler_entry, ...)
    Other,
}

/// Entry/exit markers used to classify event names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMarkers {
    pub entry: String,
    pub exit: String,
}

impl Default for EventMarkers {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY_MARKER.to_string(),
            exit: DEFAULT_EXIT_MARKER.to_string(),
        }
    }
}

impl EventMarkers {
    pub fn new(entry: impl Into<String>, exit: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            exit: exit.into(),
        }
    }

    /// Classify an event name as entry, exit, or other
    ///
    /// The entry marker is checked first. A name that contains a marker but
    /// nothing else (empty call name) is treated as Other.
    pub fn classify(&self, event_name: &str) -> EventKind {
        if let Some(call) = strip_marker(event_name, &self.entry) {
            return EventKind::Entry(call);
        }
        if let Some(call) = strip_marker(event_name, &self.exit) {
            return EventKind::Exit(call);
        }
        EventKind::Other
    }
}

fn strip_marker(event_name: &str, marker: &str) -> Option<String> {
    if marker.is_empty() || !event_name.contains(marker) {
        return None;
    }
    let call = event_name.replacen(marker, "", 1);
    if call.is_empty() {
        None
    } else {
        Some(call)
    }
}
