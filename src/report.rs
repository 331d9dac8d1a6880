use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{AnalyticsSummary, FileRecord};

pub fn build_report(
    generated_at: DateTime<Utc>,
    summary: &AnalyticsSummary,
    recent: &[FileRecord],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Trade File Analytics");
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Total files: {}", summary.total_files);
    let _ = writeln!(output, "- Success rate: {:.1}%", summary.success_rate);
    let _ = writeln!(
        output,
        "- Avg process time: {:.2}s (placeholder, not measured)",
        summary.avg_process_time_secs
    );
    let _ = writeln!(output, "- Avg file size: {:.1} KB", summary.avg_file_size_kb);
    let _ = writeln!(output);
    let _ = writeln!(output, "## File Types");

    if summary.file_types.is_empty() {
        let _ = writeln!(output, "No files uploaded yet.");
    } else {
        let _ = writeln!(output, "| Type | Files | Avg Size | Success Rate |");
        let _ = writeln!(output, "|------|-------|----------|--------------|");
        for group in summary.file_types.iter() {
            let _ = writeln!(
                output,
                "| {} | {} | {:.1} KB | {:.1}% |",
                group.file_type, group.files, group.avg_size_kb, group.success_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Uploads");

    if recent.is_empty() {
        let _ = writeln!(output, "No files uploaded yet.");
    } else {
        for file in recent.iter() {
            let _ = writeln!(
                output,
                "- {} ({}, {}) on {}: {} trades",
                file.filename,
                file.file_size,
                file.status,
                file.uploaded_at.format("%Y-%m-%d"),
                file.trade_count()
            );
        }
    }

    output
}
