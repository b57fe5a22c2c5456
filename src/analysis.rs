//! End-to-end pipeline: events -> durations -> clusters -> report

use crate::config::AnalysisConfig;
use crate::error::Result as TraceResult;
use crate::event::EventRecord;
use crate::extractor::DurationExtractor;
use crate::filter::CallFilter;
use crate::kmeans::KMeans;
use crate::report::LatencyReport;
use anyhow::{Context, Result};

/// Run the full analysis over a fallible event stream
pub fn analyze<I>(events: I, config: &AnalysisConfig) -> Result<LatencyReport>
where
    I: IntoIterator<Item = TraceResult<EventRecord>>,
{
    config.validate()?;

    let filter = match &config.filter {
        Some(expr) => CallFilter::from_expr(expr)?,
        None => CallFilter::all(),
    };

    let extractor = DurationExtractor::new()
        .with_markers(config.markers())
        .with_filter(filter);
    let (records, stats) = extractor
        .try_extract(events)
        .context("Failed to extract syscall durations from trace")?;

    if records.is_empty() {
        anyhow::bail!(
            "No matched syscall entry/exit pairs in trace ({} events read, {} unmatched exits)",
            stats.events,
            stats.unmatched_exits
        );
    }

    let durations: Vec<u64> = records.iter().map(|r| r.duration_ns).collect();
    let clustering = KMeans::new(config.clusters)
        .with_seed(config.seed)
        .with_max_iterations(config.max_iterations)
        .fit(&durations)
        .context("Failed to cluster syscall durations")?;

    let report =
        LatencyReport::build(&records, &clustering, config.selection, config.seed, stats)?;

    Ok(if config.show_durations {
        report.with_durations(records)
    } else {
        report
    })
}
