//! CLI argument parsing for latencia

use crate::config::{AnalysisConfig, ConfigError};
use crate::report::GroupSelector;
use crate::source::InputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for latency reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "latencia")]
#[command(version)]
#[command(about = "Cluster system call latencies from a kernel trace", long_about = None)]
pub struct Cli {
    /// Trace file: JSON Lines or `babeltrace2 --clock-seconds` text (`-` for stdin)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Number of latency tiers (default: 3)
    #[arg(short = 'k', long = "clusters", value_name = "K")]
    pub clusters: Option<usize>,

    /// Seed for reproducible k-means initialization (default: 0)
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Bound on k-means iterations (default: 300)
    #[arg(long = "max-iterations", value_name = "N")]
    pub max_iterations: Option<usize>,

    /// List the members of this group id
    #[arg(long = "group", value_name = "ID", conflicts_with = "rank")]
    pub group: Option<usize>,

    /// List the members of the tier at this rank (0 = slowest, the default)
    #[arg(long = "rank", value_name = "RANK")]
    pub rank: Option<usize>,

    /// Trace encoding
    #[arg(long = "input-format", value_enum, default_value = "auto")]
    pub input_format: InputFormat,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Filter calls (e.g., -e trace=read,write or -e trace=!futex)
    #[arg(short = 'e', long = "expr", value_name = "EXPR")]
    pub filter: Option<String>,

    /// Substring marking entry events (default: syscall_entry_)
    #[arg(long = "entry-marker", value_name = "MARKER")]
    pub entry_marker: Option<String>,

    /// Substring marking exit events (default: syscall_exit_)
    #[arg(long = "exit-marker", value_name = "MARKER")]
    pub exit_marker: Option<String>,

    /// Load analysis settings from a TOML file (flags override it)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print every matched call with its duration
    #[arg(long = "show-durations")]
    pub show_durations: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Merge the optional config file with command-line overrides
    pub fn analysis_config(&self) -> Result<AnalysisConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(clusters) = self.clusters {
            config.clusters = clusters;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(expr) = &self.filter {
            config.filter = Some(expr.clone());
        }
        if let Some(marker) = &self.entry_marker {
            config.entry_marker = marker.clone();
        }
        if let Some(marker) = &self.exit_marker {
            config.exit_marker = marker.clone();
        }
        if let Some(group) = self.group {
            config.selection = GroupSelector::Id(group);
        } else if let Some(rank) = self.rank {
            config.selection = GroupSelector::Rank(rank);
        }
        if self.show_durations {
            config.show_durations = true;
        }

        config.validate()?;
        Ok(config)
    }
}
