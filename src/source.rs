//! Trace event sources
//!
//! Decodes an on-disk trace into a lazy, ordered stream of `EventRecord`s.
//! Two formats are understood:
//!
//! - `jsonl`: one object per line, `{"name": "syscall_entry_read", "timestamp_ns": 100}`
//! - `babeltrace`: text output of `babeltrace2 --clock-seconds <trace dir>`
//!
//! # Example
//!
//! ```
//! use latencia::source::{EventReader, InputFormat};
//!
//! let text = "{\"name\": \"syscall_entry_read\", \"timestamp_ns\": 100}\n";
//! let events: Vec<_> = EventReader::new(text.as_bytes(), InputFormat::Jsonl)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(events[0].timestamp_ns, 100);
//! ```

use crate::error::{Result, TraceError};
use crate::event::EventRecord;
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

/// On-disk trace encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Detect from extension or first line
    #[default]
    Auto,
    /// JSON Lines, one event object per line
    Jsonl,
    /// babeltrace2 text output with --clock-seconds
    Babeltrace,
}

#[derive(Debug, Deserialize)]
struct JsonEvent {
    name: Option<String>,
    timestamp_ns: Option<u64>,
}

fn babeltrace_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\[(?P<secs>\d+)\.(?P<frac>\d{1,9})\]\s+(?:\([^)]*\)\s+)?(?:\S+\s+)?(?P<name>[^\s:]+):",
        )
        .expect("babeltrace line regex is valid")
    })
}

/// Parse one JSON Lines record
pub fn parse_json_line(line: &str, line_no: usize) -> Result<EventRecord> {
    let raw: JsonEvent = serde_json::from_str(line)
        .map_err(|e| TraceError::malformed(line_no, format!("invalid JSON: {}", e)))?;

    let name = match raw.name {
        Some(name) if !name.is_empty() => name,
        _ => return Err(TraceError::malformed(line_no, "missing event name")),
    };
    let timestamp_ns = raw
        .timestamp_ns
        .ok_or_else(|| TraceError::malformed(line_no, "missing timestamp_ns"))?;

    Ok(EventRecord { name, timestamp_ns })
}

/// Parse one line of `babeltrace2 --clock-seconds` output
pub fn parse_babeltrace_line(line: &str, line_no: usize) -> Result<EventRecord> {
    let caps = babeltrace_line_regex().captures(line).ok_or_else(|| {
        TraceError::malformed(
            line_no,
            "expected `[SECONDS.NANOS] ... event_name: ...` (run babeltrace2 with --clock-seconds)",
        )
    })?;

    let secs: u64 = caps["secs"]
        .parse()
        .map_err(|_| TraceError::malformed(line_no, "timestamp seconds out of range"))?;
    let frac = &caps["frac"];
    let nanos: u64 = format!("{:0<9}", frac)
        .parse()
        .map_err(|_| TraceError::malformed(line_no, "invalid timestamp fraction"))?;
    let timestamp_ns = secs
        .checked_mul(1_000_000_000)
        .and_then(|ns| ns.checked_add(nanos))
        .ok_or_else(|| TraceError::malformed(line_no, "timestamp overflows u64 nanoseconds"))?;

    Ok(EventRecord {
        name: caps["name"].to_string(),
        timestamp_ns,
    })
}

/// Lazy line-by-line event decoder
pub struct EventReader {
    lines: Box<dyn Iterator<Item = io::Result<String>>>,
    format: InputFormat,
    line_no: usize,
}

impl EventReader {
    /// Create a reader over any buffered source
    ///
    /// `InputFormat::Auto` sniffs the first non-blank line: `{` selects JSON
    /// Lines, `[` selects babeltrace text. Anything else falls back to JSON
    /// Lines; use `detect` to reject it instead.
    pub fn new<R: BufRead + 'static>(reader: R, format: InputFormat) -> Self {
        let (reader, _) = Self::sniffed(reader, format);
        reader
    }

    /// Like `new`, but `None` when `Auto` cannot recognize the first line
    pub fn detect<R: BufRead + 'static>(reader: R, format: InputFormat) -> Option<Self> {
        match Self::sniffed(reader, format) {
            (reader, true) => Some(reader),
            (_, false) => None,
        }
    }

    fn sniffed<R: BufRead + 'static>(reader: R, format: InputFormat) -> (Self, bool) {
        let mut lines: Box<dyn Iterator<Item = io::Result<String>>> = Box::new(reader.lines());
        let mut recognized = true;

        let format = match format {
            InputFormat::Auto => {
                let mut prefix = Vec::new();
                let mut detected = InputFormat::Jsonl;
                for line in lines.by_ref() {
                    let sniff = line.as_ref().ok().map(|l| l.trim_start().to_string());
                    prefix.push(line);
                    match sniff.as_deref() {
                        Some("") => continue,
                        Some(l) if l.starts_with('[') => detected = InputFormat::Babeltrace,
                        Some(l) if l.starts_with('{') => {}
                        // read errors surface from the iterator
                        None => {}
                        Some(_) => recognized = false,
                    }
                    break;
                }
                lines = Box::new(prefix.into_iter().chain(lines));
                detected
            }
            other => other,
        };

        let reader = Self {
            lines,
            format,
            line_no: 0,
        };
        (reader, recognized)
    }

    /// Resolved format (never `Auto`)
    pub fn format(&self) -> InputFormat {
        self.format
    }
}

impl Iterator for EventReader {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(TraceError::IoError(e))),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(match self.format {
                InputFormat::Babeltrace => parse_babeltrace_line(trimmed, self.line_no),
                _ => parse_json_line(trimmed, self.line_no),
            });
        }
    }
}

/// Open a trace file (or `-` for stdin)
pub fn open(path: &Path, format: InputFormat) -> Result<EventReader> {
    let format = match (format, path.extension().and_then(|e| e.to_str())) {
        (InputFormat::Auto, Some("jsonl" | "json" | "ndjson")) => InputFormat::Jsonl,
        (format, _) => format,
    };

    let unknown = || TraceError::UnknownFormat(path.to_path_buf());

    if path == Path::new("-") {
        let stdin = BufReader::new(io::stdin());
        return EventReader::detect(stdin, format).ok_or_else(unknown);
    }

    let file = File::open(path)?;
    let reader = EventReader::detect(BufReader::new(file), format).ok_or_else(unknown)?;
    tracing::debug!(path = %path.display(), format = ?reader.format(), "opened trace");
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(text: &'static str, format: InputFormat) -> Result<Vec<EventRecord>> {
        EventReader::new(text.as_bytes(), format).collect()
    }

    #[test]
    fn test_parse_json_line() {
        let event =
            parse_json_line(r#"{"name": "syscall_entry_read", "timestamp_ns": 42}"#, 1).unwrap();
        assert_eq!(event, EventRecord::new("syscall_entry_read", 42));
    }

    #[test]
    fn test_json_extra_fields_ignored() {
        let event = parse_json_line(
            r#"{"name": "syscall_exit_read", "timestamp_ns": 7, "cpu_id": 3}"#,
            1,
        )
        .unwrap();
        assert_eq!(event.timestamp_ns, 7);
    }

    #[test]
    fn test_json_missing_timestamp() {
        let err = parse_json_line(r#"{"name": "syscall_entry_read"}"#, 4).unwrap_err();
        assert!(matches!(err, TraceError::Malformed { line: 4, .. }));
        assert!(err.to_string().contains("timestamp_ns"));
    }

    #[test]
    fn test_json_missing_name() {
        let err = parse_json_line(r#"{"timestamp_ns": 1}"#, 2).unwrap_err();
        assert!(err.to_string().contains("missing event name"));
    }

    #[test]
    fn test_json_negative_timestamp_rejected() {
        assert!(parse_json_line(r#"{"name": "x", "timestamp_ns": -5}"#, 1).is_err());
    }

    #[test]
    fn test_parse_babeltrace_line_with_host() {
        let line = "[1697712000.000000150] (+0.000000050) myhost syscall_exit_read: { cpu_id = 0 }, { ret = 4 }";
        let event = parse_babeltrace_line(line, 1).unwrap();
        assert_eq!(event.name, "syscall_exit_read");
        assert_eq!(event.timestamp_ns, 1_697_712_000_000_000_150);
    }

    #[test]
    fn test_parse_babeltrace_line_without_host_or_delta() {
        let line = "[12.5] sched_switch: { cpu_id = 1 }";
        let event = parse_babeltrace_line(line, 1).unwrap();
        assert_eq!(event.name, "sched_switch");
        assert_eq!(event.timestamp_ns, 12_500_000_000);
    }

    #[test]
    fn test_babeltrace_wall_clock_rejected() {
        let line = "[14:02:11.123456789] (+0.000000050) myhost syscall_exit_read: { }";
        let err = parse_babeltrace_line(line, 9).unwrap_err();
        assert!(err.to_string().contains("--clock-seconds"));
    }

    #[test]
    fn test_reader_skips_blank_lines_and_counts_lines() {
        let text = "\n{\"name\": \"a\", \"timestamp_ns\": 1}\n\nnot json\n";
        let results: Vec<_> = EventReader::new(text.as_bytes(), InputFormat::Jsonl).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(TraceError::Malformed { line: 4, .. })
        ));
    }

    #[test]
    fn test_auto_detects_babeltrace() {
        let text = "\n[1.000000000] (+?.?????????) h syscall_entry_read: { }\n[1.000000010] (+0.000000010) h syscall_exit_read: { }\n";
        let reader = EventReader::new(text.as_bytes(), InputFormat::Auto);
        assert_eq!(reader.format(), InputFormat::Babeltrace);
        let events: Vec<_> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].timestamp_ns, 1_000_000_010);
    }

    #[test]
    fn test_auto_detects_jsonl() {
        let events = read_all(
            "{\"name\": \"syscall_entry_read\", \"timestamp_ns\": 3}\n",
            InputFormat::Auto,
        )
        .unwrap();
        assert_eq!(events, vec![EventRecord::new("syscall_entry_read", 3)]);
    }

    #[test]
    fn test_auto_rejects_unrecognized_first_line() {
        let text = "\nsyscall_entry_read 100\n";
        assert!(EventReader::detect(text.as_bytes(), InputFormat::Auto).is_none());
        assert!(EventReader::detect(text.as_bytes(), InputFormat::Jsonl).is_some());
        assert!(EventReader::detect("".as_bytes(), InputFormat::Auto).is_some());
    }

    #[test]
    fn test_open_unrecognized_file_is_unknown_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("trace.txt");
        std::fs::write(&path, "plain text trace\n").unwrap();
        let result = open(&path, InputFormat::Auto);
        assert!(matches!(result, Err(TraceError::UnknownFormat(p)) if p == path));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(read_all("", InputFormat::Auto).unwrap().is_empty());
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let result = open(Path::new("/nonexistent/trace.jsonl"), InputFormat::Auto);
        assert!(matches!(result, Err(TraceError::IoError(_))));
    }
}
