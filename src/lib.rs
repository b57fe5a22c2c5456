//! Latencia - system call latency tiers from kernel traces
//!
//! This library pairs syscall entry/exit events from a chronological trace
//! into durations, partitions the durations into latency tiers with seeded
//! 1-D k-means, and summarizes each tier.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod extractor;
pub mod filter;
pub mod kmeans;
pub mod output;
pub mod report;
pub mod source;

pub use error::TraceError;
pub use event::{EventKind, EventMarkers, EventRecord};
pub use extractor::{extract, DurationExtractor, DurationRecord, ExtractionStats};
pub use kmeans::{cluster, ClusterError, Clustering, KMeans};
pub use report::{
    members_of, rank_by_centroid, summarize, ClusterSummary, GroupSelector, LatencyReport,
    ReportError,
};
