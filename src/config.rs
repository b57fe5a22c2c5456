//! Analysis configuration
//!
//! Loaded from an optional TOML file, then overridden by CLI flags.
//!
//! # Example TOML
//! ```toml
//! clusters = 4
//! seed = 7
//! max_iterations = 500
//! entry_marker = "syscall_entry_"
//! exit_marker = "syscall_exit_"
//! filter = "trace=!futex"
//! selection = { by = "rank", value = 0 }
//! ```

use crate::event::{EventMarkers, DEFAULT_ENTRY_MARKER, DEFAULT_EXIT_MARKER};
use crate::kmeans::DEFAULT_MAX_ITERATIONS;
use crate::report::GroupSelector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Parameters for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Number of latency tiers (k)
    pub clusters: usize,

    /// Seed for k-means++ initialization
    pub seed: u64,

    /// Bound on k-means iterations
    pub max_iterations: usize,

    /// Substring marking a syscall entry event
    pub entry_marker: String,

    /// Substring marking a syscall exit event
    pub exit_marker: String,

    /// Optional `trace=` filter expression
    pub filter: Option<String>,

    /// Group whose members are listed
    pub selection: GroupSelector,

    /// Include every matched duration in the output
    pub show_durations: bool,
}

fn default_clusters() -> usize {
    3
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            clusters: default_clusters(),
            seed: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            entry_marker: DEFAULT_ENTRY_MARKER.to_string(),
            exit_marker: DEFAULT_EXIT_MARKER.to_string(),
            filter: None,
            selection: GroupSelector::default(),
            show_durations: false,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn markers(&self) -> EventMarkers {
        EventMarkers::new(self.entry_marker.clone(), self.exit_marker.clone())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clusters < 1 {
            return Err(ConfigError::Invalid(format!(
                "clusters must be >= 1, got {}",
                self.clusters
            )));
        }

        if self.max_iterations < 1 {
            return Err(ConfigError::Invalid(format!(
                "max_iterations must be >= 1, got {}",
                self.max_iterations
            )));
        }

        if self.entry_marker.is_empty() || self.exit_marker.is_empty() {
            return Err(ConfigError::Invalid(
                "entry_marker and exit_marker must be non-empty".to_string(),
            ));
        }

        // classify() tests the entry marker first, so overlap would misread exits
        if self.exit_marker.contains(self.entry_marker.as_str())
            || self.entry_marker.contains(self.exit_marker.as_str())
        {
            return Err(ConfigError::Invalid(format!(
                "entry_marker {:?} and exit_marker {:?} must not contain one another",
                self.entry_marker, self.exit_marker
            )));
        }

        match self.selection {
            GroupSelector::Id(group) if group >= self.clusters => Err(ConfigError::Invalid(
                format!("group {} out of range for {} clusters", group, self.clusters),
            )),
            GroupSelector::Rank(rank) if rank >= self.clusters => Err(ConfigError::Invalid(
                format!("rank {} out of range for {} clusters", rank, self.clusters),
            )),
            _ => Ok(()),
        }
    }
}
