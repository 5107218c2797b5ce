use crate::model::AggregateReport;
use crate::util::{utc_minute, utc_second};

/// Render the aggregate into the fixed plain-text layout. Pure and
/// deterministic: same report, same bytes.
pub fn format_report(report: &AggregateReport, period_label: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("📊 GitHub {period_label} Activity Report"));
    lines.push(format!(
        "⏰ Window: {} UTC to {} UTC",
        utc_minute(&report.window.start),
        utc_minute(&report.window.end)
    ));
    lines.push(format!("📁 Repositories: {}", report.repos.len()));
    lines.push(String::new());

    lines.push("📈 Totals:".to_string());
    lines.push(format!(
        "  • Commits: {}",
        thousands(report.totals.commit_count as i64)
    ));
    lines.push(format!(
        "  • Lines added: {}",
        thousands(report.totals.additions as i64)
    ));
    lines.push(format!(
        "  • Lines deleted: {}",
        thousands(report.totals.deletions as i64)
    ));
    lines.push(format!("  • Net lines: {}", thousands(report.totals.net)));
    if report.include_issues {
        lines.push(format!(
            "  • Issues opened: {}",
            thousands(report.totals.issues_opened as i64)
        ));
        lines.push(format!(
            "  • Issues closed: {}",
            thousands(report.totals.issues_closed as i64)
        ));
        lines.push(format!(
            "  • Comments: {}",
            thousands(report.totals.comments as i64)
        ));
    }
    lines.push(String::new());

    lines.push("📋 Per-repository breakdown:".to_string());
    lines.push(String::new());

    for metrics in &report.repos {
        lines.push(format!("🔹 {}:", metrics.repo));
        if metrics.is_ok() {
            lines.push(format!(
                "  • Commits: {}",
                thousands(metrics.commit_count as i64)
            ));
            lines.push(format!(
                "  • Lines added: {}",
                thousands(metrics.additions as i64)
            ));
            lines.push(format!(
                "  • Lines deleted: {}",
                thousands(metrics.deletions as i64)
            ));
            lines.push(format!("  • Net lines: {}", thousands(metrics.net)));
            if report.include_issues {
                lines.push(format!(
                    "  • Issues opened: {}",
                    thousands(metrics.issues_opened as i64)
                ));
                lines.push(format!(
                    "  • Issues closed: {}",
                    thousands(metrics.issues_closed as i64)
                ));
                lines.push(format!(
                    "  • Comments: {}",
                    thousands(metrics.comments as i64)
                ));
            }
        } else {
            lines.push(format!(
                "  ⚠ Failed: {}",
                metrics.error.as_deref().unwrap_or("unknown error")
            ));
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(format!(
        "Generated at {} UTC",
        utc_second(&report.generated_at)
    ));
    lines.push("Powered by repopulse".to_string());

    lines.join("\n")
}

fn thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{out}")
    } else {
        out
    }
}
