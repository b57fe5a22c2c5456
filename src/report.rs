//! Per-tier latency summaries built from a clustering
//!
//! Joins group assignments back to the duration records: counts, means and
//! ranges per group, member listings, and ranking of groups by centroid so
//! callers never have to assume which id holds the slow calls.

use crate::extractor::{DurationRecord, ExtractionStats};
use crate::kmeans::{silhouette_score, Clustering};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for invalid report requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Group {group} out of range (k = {k})")]
    GroupOutOfRange { group: usize, k: usize },

    #[error("Rank {rank} out of range (k = {k})")]
    RankOutOfRange { rank: usize, k: usize },

    #[error("Length mismatch: {records} duration records but {assignments} assignments")]
    LengthMismatch { records: usize, assignments: usize },
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Summary of one latency tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub group_id: usize,
    pub member_count: usize,
    /// Arithmetic mean of member durations (0 for an empty group)
    pub mean_duration_ns: f64,
    pub min_duration_ns: u64,
    pub max_duration_ns: u64,
}

/// How the caller picks the group whose members are listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "by", content = "value")]
pub enum GroupSelector {
    /// Explicit group id
    Id(usize),
    /// Position in centroid order, 0 = slowest tier
    Rank(usize),
}

impl Default for GroupSelector {
    fn default() -> Self {
        GroupSelector::Rank(0)
    }
}

impl GroupSelector {
    /// Resolve to a concrete group id given the clustering centroids
    pub fn resolve(&self, centroids: &[f64]) -> Result<usize> {
        let k = centroids.len();
        match *self {
            GroupSelector::Id(group) if group < k => Ok(group),
            GroupSelector::Id(group) => Err(ReportError::GroupOutOfRange { group, k }),
            GroupSelector::Rank(rank) => rank_by_centroid(centroids)
                .get(rank)
                .copied()
                .ok_or(ReportError::RankOutOfRange { rank, k }),
        }
    }
}

fn check_lengths(records: &[DurationRecord], assignments: &[usize]) -> Result<()> {
    if records.len() != assignments.len() {
        return Err(ReportError::LengthMismatch {
            records: records.len(),
            assignments: assignments.len(),
        });
    }
    Ok(())
}

/// Count, mean and range of every group `0..k`
pub fn summarize(
    records: &[DurationRecord],
    assignments: &[usize],
    k: usize,
) -> Result<Vec<ClusterSummary>> {
    check_lengths(records, assignments)?;

    let mut counts = vec![0usize; k];
    let mut sums = vec![0u128; k];
    let mut mins = vec![u64::MAX; k];
    let mut maxs = vec![0u64; k];

    for (record, &group) in records.iter().zip(assignments) {
        if group >= k {
            return Err(ReportError::GroupOutOfRange { group, k });
        }
        counts[group] += 1;
        sums[group] += u128::from(record.duration_ns);
        mins[group] = mins[group].min(record.duration_ns);
        maxs[group] = maxs[group].max(record.duration_ns);
    }

    Ok((0..k)
        .map(|group| {
            let count = counts[group];
            if count == 0 {
                ClusterSummary {
                    group_id: group,
                    member_count: 0,
                    mean_duration_ns: 0.0,
                    min_duration_ns: 0,
                    max_duration_ns: 0,
                }
            } else {
                ClusterSummary {
                    group_id: group,
                    member_count: count,
                    mean_duration_ns: sums[group] as f64 / count as f64,
                    min_duration_ns: mins[group],
                    max_duration_ns: maxs[group],
                }
            }
        })
        .collect())
}

/// Call name of every record assigned to `group`, one entry per occurrence
pub fn members_of<'a>(
    records: &'a [DurationRecord],
    assignments: &[usize],
    group: usize,
    k: usize,
) -> Result<Vec<&'a str>> {
    check_lengths(records, assignments)?;
    if group >= k {
        return Err(ReportError::GroupOutOfRange { group, k });
    }

    Ok(records
        .iter()
        .zip(assignments)
        .filter(|&(_, &g)| g == group)
        .map(|(record, _)| record.call_name.as_str())
        .collect())
}

/// Group ids ordered by centroid, largest first; equal centroids keep id order
pub fn rank_by_centroid(centroids: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|&a, &b| centroids[b].total_cmp(&centroids[a]).then(a.cmp(&b)));
    order
}

/// One row of the report: summary plus its centroid and rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierReport {
    #[serde(flatten)]
    pub summary: ClusterSummary,
    pub centroid_ns: f64,
    /// 0 = slowest tier
    pub rank: usize,
}

/// Complete result of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyReport {
    /// Number of matched system calls
    pub total_calls: usize,
    pub clusters: usize,
    pub seed: u64,
    pub iterations: usize,
    pub converged: bool,
    pub silhouette_score: f64,
    /// Tiers in rank order (slowest first)
    pub tiers: Vec<TierReport>,
    pub selected_group: usize,
    /// Call names in the selected group, one per occurrence
    pub selected_members: Vec<String>,
    pub extraction: ExtractionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durations: Option<Vec<DurationRecord>>,
}

impl LatencyReport {
    /// Build the full report from records and their clustering
    pub fn build(
        records: &[DurationRecord],
        clustering: &Clustering,
        selector: GroupSelector,
        seed: u64,
        extraction: ExtractionStats,
    ) -> Result<Self> {
        let k = clustering.k();
        let summaries = summarize(records, &clustering.assignments, k)?;
        let order = rank_by_centroid(&clustering.centroids);
        let selected_group = selector.resolve(&clustering.centroids)?;
        let selected_members = members_of(records, &clustering.assignments, selected_group, k)?
            .into_iter()
            .map(str::to_string)
            .collect();

        let tiers = order
            .iter()
            .enumerate()
            .map(|(rank, &group)| TierReport {
                summary: summaries[group].clone(),
                centroid_ns: clustering.centroids[group],
                rank,
            })
            .collect();

        let durations: Vec<u64> = records.iter().map(|r| r.duration_ns).collect();

        Ok(Self {
            total_calls: records.len(),
            clusters: k,
            seed,
            iterations: clustering.iterations,
            converged: clustering.converged,
            silhouette_score: silhouette_score(&durations, &clustering.assignments, k),
            tiers,
            selected_group,
            selected_members,
            extraction,
            durations: None,
        })
    }

    /// Attach the raw duration list (printed with --show-durations)
    pub fn with_durations(mut self, records: Vec<DurationRecord>) -> Self {
        self.durations = Some(records);
        self
    }

    /// Tier entry for a group id
    pub fn tier(&self, group: usize) -> Option<&TierReport> {
        self.tiers.iter().find(|t| t.summary.group_id == group)
    }
}
