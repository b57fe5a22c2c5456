//! Call-name filtering for -e trace= expressions
//!
//! Supports:
//! - Individual calls: -e trace=open,read,write
//! - Call classes: -e trace=file, -e trace=network, -e trace=process, -e trace=memory
//! - Exclusions: -e trace=!futex,!memory
//! - Regex patterns: -e trace=/^mmap/ (and !/pattern/ to exclude)

use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::HashSet;

const FILE_CALLS: &[&str] = &[
    "open",
    "openat",
    "close",
    "read",
    "write",
    "lseek",
    "stat",
    "fstat",
    "newfstatat",
    "access",
    "mkdir",
    "rmdir",
    "unlink",
];

const NETWORK_CALLS: &[&str] = &[
    "socket",
    "connect",
    "accept",
    "bind",
    "listen",
    "send",
    "recv",
    "sendto",
    "recvfrom",
    "setsockopt",
    "getsockopt",
];

const PROCESS_CALLS: &[&str] = &[
    "fork",
    "vfork",
    "clone",
    "execve",
    "exit",
    "exit_group",
    "wait4",
    "waitid",
    "kill",
    "tkill",
    "tgkill",
];

const MEMORY_CALLS: &[&str] = &["mmap", "munmap", "mprotect", "mremap", "brk", "sbrk"];

fn class_members(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "file" => Some(FILE_CALLS),
        "network" => Some(NETWORK_CALLS),
        "process" => Some(PROCESS_CALLS),
        "memory" => Some(MEMORY_CALLS),
        _ => None,
    }
}

/// Name set plus regex patterns for one side (include or exclude) of a filter
#[derive(Debug, Clone, Default)]
struct NameMatcher {
    names: HashSet<String>,
    patterns: Vec<Regex>,
}

impl NameMatcher {
    fn is_empty(&self) -> bool {
        self.names.is_empty() && self.patterns.is_empty()
    }

    fn matches(&self, call_name: &str) -> bool {
        self.names.contains(call_name) || self.patterns.iter().any(|re| re.is_match(call_name))
    }

    fn add(&mut self, token: &str) -> Result<()> {
        if let Some(pattern) = token
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            let re = Regex::new(pattern)
                .with_context(|| format!("Invalid regex pattern in filter: /{}/", pattern))?;
            self.patterns.push(re);
        } else if let Some(members) = class_members(token) {
            self.names.extend(members.iter().map(|s| s.to_string()));
        } else {
            self.names.insert(token.to_string());
        }
        Ok(())
    }
}

/// Filter that decides which call names take part in latency matching
#[derive(Debug, Clone)]
pub struct CallFilter {
    /// Calls to include (None = all calls)
    include: Option<NameMatcher>,
    /// Calls to drop even when included
    exclude: NameMatcher,
}

impl Default for CallFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl CallFilter {
    /// Create a filter that includes all calls
    pub fn all() -> Self {
        Self {
            include: None,
            exclude: NameMatcher::default(),
        }
    }

    /// Parse a filter expression like "trace=open,read,write" or "trace=!file"
    pub fn from_expr(expr: &str) -> Result<Self> {
        if let Some(trace_spec) = expr.strip_prefix("trace=") {
            Self::from_trace_spec(trace_spec)
        } else {
            bail!(
                "Invalid filter expression: {}. Expected format: trace=SPEC",
                expr
            );
        }
    }

    /// Parse a trace specification (the part after "trace=")
    fn from_trace_spec(spec: &str) -> Result<Self> {
        let mut include = NameMatcher::default();
        let mut exclude = NameMatcher::default();
        let mut saw_include = false;

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some(negated) = part.strip_prefix('!') {
                let negated = negated.trim();
                if negated.is_empty() {
                    bail!("Empty exclusion in filter expression: {}", spec);
                }
                exclude.add(negated)?;
            } else {
                saw_include = true;
                include.add(part)?;
            }
        }

        // "trace=!futex" means everything except futex; "trace=" traces nothing
        let include = if saw_include || exclude.is_empty() {
            Some(include)
        } else {
            None
        };

        Ok(Self { include, exclude })
    }

    /// Check if a call name should be matched
    pub fn should_trace(&self, call_name: &str) -> bool {
        if self.exclude.matches(call_name) {
            return false;
        }
        match &self.include {
            None => true,
            Some(matcher) => !matcher.is_empty() && matcher.matches(call_name),
        }
    }
}
