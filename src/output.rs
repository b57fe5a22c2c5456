//! Rendering of latency reports as text, JSON, or CSV

use crate::report::LatencyReport;
use std::fmt::Write as _;

/// Human-readable tier table followed by the selected group's members
pub fn format_text(report: &LatencyReport) -> String {
    let mut output = String::new();

    if let Some(durations) = &report.durations {
        output.push_str("=== Syscall Durations ===\n");
        for record in durations {
            let _ = writeln!(output, "{:<20} {:>14}", record.call_name, record.duration_ns);
        }
        output.push('\n');
    }

    output.push_str("=== Syscall Latency Tiers ===\n");
    let _ = writeln!(
        output,
        "Matched system calls: {} (durations in nanoseconds)",
        report.total_calls
    );
    if report.converged {
        let _ = writeln!(
            output,
            "Clusters: {} (seed {}, converged after {} iterations)",
            report.clusters, report.seed, report.iterations
        );
    } else {
        let _ = writeln!(
            output,
            "Clusters: {} (seed {}, NOT converged after {} iterations)",
            report.clusters, report.seed, report.iterations
        );
    }
    let _ = writeln!(output, "Silhouette Score: {:.3}", report.silhouette_score);

    let stats = &report.extraction;
    if stats.unmatched_exits > 0 || stats.open_at_end > 0 {
        let _ = writeln!(
            output,
            "Unmatched: {} exits without entry, {} entries still open",
            stats.unmatched_exits, stats.open_at_end
        );
    }

    output.push('\n');
    let _ = writeln!(
        output,
        "{:>4} {:>6} {:>10} {:>16} {:>14} {:>14}",
        "rank", "group", "calls", "mean", "min", "max"
    );
    output.push_str("---- ------ ---------- ---------------- -------------- --------------\n");
    for tier in &report.tiers {
        let s = &tier.summary;
        let _ = writeln!(
            output,
            "{:>4} {:>6} {:>10} {:>16.2} {:>14} {:>14}",
            tier.rank,
            s.group_id,
            s.member_count,
            s.mean_duration_ns,
            s.min_duration_ns,
            s.max_duration_ns
        );
    }

    let rank = report
        .tier(report.selected_group)
        .map(|t| t.rank)
        .unwrap_or_default();
    let _ = writeln!(
        output,
        "\nMembers of group {} (rank {}, {} calls):",
        report.selected_group,
        rank,
        report.selected_members.len()
    );
    for name in &report.selected_members {
        let _ = writeln!(output, "  {}", name);
    }

    output
}

/// Pretty-printed JSON document of the whole report
pub fn format_json(report: &LatencyReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// One CSV row per tier, in rank order
pub fn format_csv(report: &LatencyReport) -> String {
    let mut output = String::from("group,rank,count,mean_ns,min_ns,max_ns,centroid_ns\n");
    for tier in &report.tiers {
        let s = &tier.summary;
        let _ = writeln!(
            output,
            "{},{},{},{:.2},{},{},{:.2}",
            s.group_id,
            tier.rank,
            s.member_count,
            s.mean_duration_ns,
            s.min_duration_ns,
            s.max_duration_ns,
            tier.centroid_ns
        );
    }
    output
}
