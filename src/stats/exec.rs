use anyhow::Context;
use chrono::Utc;
use console::style;
use tracing::{info, warn};

use super::aggregate::collect_all;
use crate::cli::CommonArgs;
use crate::config::{self, ReportKind, Settings};
use crate::github::GitHubClient;
use crate::model::{parse_repo_list, TimeWindow};
use crate::notify::Webhook;
use crate::report::format_report;
use crate::util::utc_minute;

/// One report run end to end: config, window, collection, rendering,
/// delivery. Identifier and window failures abort; per-repository failures
/// are already folded into the report by the aggregator.
pub fn exec(common: CommonArgs, kind: ReportKind) -> anyhow::Result<()> {
    let settings = Settings::load(&common.config_dir.join("settings.json"))
        .context("Failed to load settings")?;
    let cfg = settings.for_kind(kind);
    if !cfg.enabled {
        println!(
            "{} report is disabled in settings, nothing to do",
            kind.label()
        );
        return Ok(());
    }

    let repo_names = config::load_repo_list(&common.config_dir.join("repos.json"))
        .context("Failed to load repository list")?;
    let repos = parse_repo_list(&repo_names)
        .context("Failed to resolve repository identifiers")?;

    let window = TimeWindow::ending_at_midnight(Utc::now(), cfg.days_back)
        .context("Failed to construct time window")?;
    info!(start = %window.start, end = %window.end, repos = repos.len(), "collecting activity");
    println!(
        "{} {} repositories, window {} UTC to {} UTC",
        style("Collecting").bold().green(),
        repos.len(),
        utc_minute(&window.start),
        utc_minute(&window.end)
    );

    let token = config::github_token().context("A GitHub token is required")?;
    let client =
        GitHubClient::new(token, common.timeout).context("Failed to build GitHub client")?;

    let report = collect_all(
        &client,
        &repos,
        window,
        cfg.include_issues,
        common.concurrency,
    )
    .context("Failed to aggregate repository activity")?;

    let failed = report.repos.iter().filter(|m| !m.is_ok()).count();
    if failed > 0 {
        warn!(failed, "some repositories could not be collected");
        println!(
            "{} {failed} of {} repositories failed, details in the report",
            style("Warning:").bold().yellow(),
            report.repos.len()
        );
    }

    let text = format_report(&report, kind.label());

    if common.print_only {
        println!("{text}");
        return Ok(());
    }

    match Webhook::from_env() {
        Some(webhook) => match webhook.send(&kind.subject(), &text) {
            Ok(()) => println!("{} report delivered", style("✓").green()),
            Err(err) => {
                warn!("delivery failed: {err}");
                println!(
                    "{} delivery failed ({err}), printing report instead\n",
                    style("✗").red()
                );
                println!("{text}");
            }
        },
        None => println!("{text}"),
    }

    Ok(())
}
