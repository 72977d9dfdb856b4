use std::fmt::Write;

use crate::models::{CrmStatus, EventRecord, ProspectOverview};

pub fn summarize_by_status(overviews: &[ProspectOverview]) -> Vec<(CrmStatus, usize)> {
    let mut counts = [
        (CrmStatus::Hot, 0usize),
        (CrmStatus::Warm, 0usize),
        (CrmStatus::Cold, 0usize),
    ];

    for overview in overviews {
        for entry in counts.iter_mut() {
            if entry.0 == overview.crm_status {
                entry.1 += 1;
            }
        }
    }

    counts.to_vec()
}

pub fn build_report(overviews: &[ProspectOverview], events: &[EventRecord]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Outreach Engagement Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Pipeline Temperature");

    if overviews.is_empty() {
        let _ = writeln!(output, "No prospects registered yet.");
    } else {
        for (status, count) in summarize_by_status(overviews) {
            let _ = writeln!(output, "- {}: {} prospects", status, count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Engaged Prospects");

    if overviews.is_empty() {
        let _ = writeln!(output, "No engagement recorded yet.");
    } else {
        for overview in overviews.iter().take(10) {
            let last_viewed = overview
                .last_viewed_at
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "never viewed".to_string());
            let _ = writeln!(
                output,
                "- {} ({}) {} visits, {} events, last viewed {}",
                overview.company_name,
                overview.crm_status,
                overview.visit_count,
                overview.event_count,
                last_viewed
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Events");

    if events.is_empty() {
        let _ = writeln!(output, "No report views tracked yet.");
    } else {
        for event in events.iter().take(10) {
            let scroll = event
                .scroll_depth
                .map(|depth| format!("{depth}%"))
                .unwrap_or_else(|| "-".to_string());
            let dwell = event
                .dwell_seconds
                .map(|secs| format!("{secs:.0}s"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "- {} {} (scroll {}, dwell {}) at {}",
                event.company_name,
                event.event_type,
                scroll,
                dwell,
                event.recorded_at.format("%Y-%m-%d %H:%M UTC")
            );
        }
    }

    output
}
