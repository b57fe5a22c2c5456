//! Entry/exit matching: turns an ordered event stream into call durations
//!
//! Each call name owns a LIFO stack of pending entry timestamps. An exit pops
//! the most recent entry of the same name, so recursive and re-entrant calls
//! pair innermost-first. Different names never interact.

use crate::error::{Result, TraceError};
use crate::event::{EventKind, EventMarkers, EventRecord};
use crate::filter::CallFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One matched entry/exit pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRecord {
    pub call_name: String,
    pub duration_ns: u64,
}

impl DurationRecord {
    pub fn new(call_name: impl Into<String>, duration_ns: u64) -> Self {
        Self {
            call_name: call_name.into(),
            duration_ns,
        }
    }
}

/// Counters collected during one extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Total events read from the source
    pub events: u64,
    /// Entry events pushed onto a pending stack
    pub entries: u64,
    /// Exit events that closed a pending entry
    pub matched_exits: u64,
    /// Exit events with no pending entry (trace window began mid-call)
    pub unmatched_exits: u64,
    /// Entries still open when the stream ended
    pub open_at_end: u64,
    /// Events that are neither entry nor exit, or were filtered out
    pub ignored: u64,
}

/// Outstanding entry timestamps per call name
#[derive(Debug, Default)]
struct PendingEntries {
    stacks: HashMap<String, Vec<u64>>,
}

impl PendingEntries {
    fn push(&mut self, call_name: String, timestamp_ns: u64) {
        self.stacks.entry(call_name).or_default().push(timestamp_ns);
    }

    fn pop(&mut self, call_name: &str) -> Option<u64> {
        self.stacks.get_mut(call_name).and_then(Vec::pop)
    }

    fn outstanding(&self) -> u64 {
        self.stacks.values().map(|s| s.len() as u64).sum()
    }
}

/// Single-pass duration extractor
#[derive(Debug, Clone, Default)]
pub struct DurationExtractor {
    markers: EventMarkers,
    filter: CallFilter,
}

impl DurationExtractor {
    /// Create an extractor with LTTng markers and no filter
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(mut self, markers: EventMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_filter(mut self, filter: CallFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Match entries to exits over an infallible event sequence
    pub fn extract<I>(&self, events: I) -> Result<(Vec<DurationRecord>, ExtractionStats)>
    where
        I: IntoIterator<Item = EventRecord>,
    {
        self.try_extract(events.into_iter().map(Ok))
    }

    /// Match entries to exits, aborting on the first decoding error
    ///
    /// Timestamps must be non-decreasing across the whole stream, including
    /// events that are otherwise ignored.
    pub fn try_extract<I>(&self, events: I) -> Result<(Vec<DurationRecord>, ExtractionStats)>
    where
        I: IntoIterator<Item = Result<EventRecord>>,
    {
        let mut pending = PendingEntries::default();
        let mut durations = Vec::new();
        let mut stats = ExtractionStats::default();
        let mut last_ts: Option<u64> = None;

        for event in events {
            let event = event?;
            stats.events += 1;

            if let Some(previous_ns) = last_ts {
                if event.timestamp_ns < previous_ns {
                    return Err(TraceError::OutOfOrder {
                        name: event.name,
                        timestamp_ns: event.timestamp_ns,
                        previous_ns,
                    });
                }
            }
            last_ts = Some(event.timestamp_ns);

            match self.markers.classify(&event.name) {
                EventKind::Entry(call) if self.filter.should_trace(&call) => {
                    pending.push(call, event.timestamp_ns);
                    stats.entries += 1;
                }
                EventKind::Exit(call) if self.filter.should_trace(&call) => {
                    match pending.pop(&call) {
                        Some(entry_ns) => {
                            durations.push(DurationRecord {
                                call_name: call,
                                duration_ns: event.timestamp_ns - entry_ns,
                            });
                            stats.matched_exits += 1;
                        }
                        None => stats.unmatched_exits += 1,
                    }
                }
                _ => stats.ignored += 1,
            }
        }

        stats.open_at_end = pending.outstanding();

        tracing::debug!(
            events = stats.events,
            durations = durations.len(),
            unmatched_exits = stats.unmatched_exits,
            open_at_end = stats.open_at_end,
            ignored = stats.ignored,
            "extraction pass complete"
        );

        Ok((durations, stats))
    }
}

/// Extract durations with default LTTng markers and no filter
pub fn extract<I>(events: I) -> Result<Vec<DurationRecord>>
where
    I: IntoIterator<Item = EventRecord>,
{
    DurationExtractor::new()
        .extract(events)
        .map(|(durations, _)| durations)
}
