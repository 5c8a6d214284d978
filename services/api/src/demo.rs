use crate::infra::{build_service, end_of_day, AppService};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use civic_triage::config::{AppConfig, ConfigError, TriageConfig};
use civic_triage::error::AppError;
use civic_triage::telemetry;
use civic_triage::triage::import::{reports_from_path, RecordedReport};
use civic_triage::triage::{IssueId, Locale, ReportOutcome, ResolvedMatchPolicy};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ReplayArgs {
    /// CSV with `text,location[,reported_at[,resolves]]` columns
    #[arg(long)]
    pub(crate) reports: PathBuf,
    /// Locale for suggested actions (hinglish or en)
    #[arg(long)]
    pub(crate) locale: Option<String>,
    /// Let resolved issues absorb later duplicates instead of opening new ones
    #[arg(long)]
    pub(crate) absorb_resolved: bool,
    /// Date the area health pass is evaluated at (defaults to now)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Locale for suggested actions (hinglish or en)
    #[arg(long)]
    pub(crate) locale: Option<String>,
}

pub(crate) fn run_replay(args: ReplayArgs) -> Result<(), AppError> {
    let ReplayArgs {
        reports,
        locale,
        absorb_resolved,
        today,
    } = args;

    let mut config = AppConfig::load()?;
    apply_overrides(&mut config.triage, locale.as_deref(), absorb_resolved)?;
    telemetry::init(&config.telemetry)?;

    let service = build_service(&config.triage)?;
    let now = today.map(end_of_day).unwrap_or_else(Utc::now);

    let recorded = reports_from_path(&reports)?;
    println!(
        "Replaying {} rows from {} (resolved match: {})",
        recorded.len(),
        reports.display(),
        config.triage.resolved_match
    );

    let summary = replay_reports(&service, &recorded, now);
    for line in &summary.lines {
        println!("{line}");
    }
    if summary.rejected > 0 {
        println!("{} rows rejected", summary.rejected);
    }

    render_admin_views(&service, now);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config.triage, args.locale.as_deref(), false)?;
    telemetry::init(&config.telemetry)?;

    let service = build_service(&config.triage)?;
    let now = Utc::now();
    let week_ago = now - Duration::days(7);

    println!("Civic triage demo");

    let script: [(&str, &str, DateTime<Utc>); 5] = [
        ("spark near transformer", "28.61,77.20", now),
        ("spark near transformer", "28.6105,77.2008", now),
        ("garbage not picked up for days", "28.70,77.10", week_ago),
        ("pothole on the service road", "28.70,77.10", now),
        ("loud music every night", "28.55,77.25", now),
    ];

    let mut outcomes = Vec::new();
    for (text, location, reported_at) in script {
        let outcome = service.report(text, location, reported_at)?;
        println!("- \"{text}\" @ {location}");
        print_outcome(&outcome);
        outcomes.push(outcome);
    }

    if let Some(pothole) = outcomes.get(3) {
        let resolved = service.resolve(pothole.id)?;
        println!(
            "\nAdmin resolved issue {} ({})",
            resolved.id, resolved.category
        );
    }

    render_admin_views(&service, now);
    Ok(())
}

/// Flag values win over `APP_LOCALE` and `APP_RESOLVED_MATCH`.
fn apply_overrides(
    triage: &mut TriageConfig,
    locale: Option<&str>,
    absorb_resolved: bool,
) -> Result<(), ConfigError> {
    if let Some(locale) = locale {
        triage.locale = locale.parse::<Locale>()?;
    }
    if absorb_resolved {
        triage.resolved_match = ResolvedMatchPolicy::Absorb;
    }
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct ReplaySummary {
    pub(crate) lines: Vec<String>,
    pub(crate) rejected: usize,
}

/// Files or resolves every row in order; invalid rows are counted and skipped.
pub(crate) fn replay_reports(
    service: &AppService,
    reports: &[RecordedReport],
    now: DateTime<Utc>,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    // Issue filed by each row, for later `resolves` references.
    let mut filed: Vec<Option<IssueId>> = Vec::with_capacity(reports.len());

    for (index, report) in reports.iter().enumerate() {
        let row = index + 1;

        if let Some(target) = report.resolves {
            let issue_id = target
                .checked_sub(1)
                .and_then(|position| filed.get(position).copied().flatten());
            let line = match issue_id.map(|id| service.resolve(id)) {
                Some(Ok(issue)) => format!("{row:>4} | resolved issue {} (row {target})", issue.id),
                Some(Err(err)) => {
                    summary.rejected += 1;
                    format!("{row:>4} | rejected: {err}")
                }
                None => {
                    summary.rejected += 1;
                    format!("{row:>4} | rejected: row {target} filed no issue")
                }
            };
            summary.lines.push(line);
            filed.push(None);
            continue;
        }

        let reported_at = report.reported_at.unwrap_or(now);
        match service.report(&report.text, &report.location, reported_at) {
            Ok(outcome) => {
                summary.lines.push(format!(
                    "{row:>4} | issue {} | {} | {} | priority {} | trust {} | supporters {}",
                    outcome.id,
                    if outcome.duplicate { "duplicate" } else { "new" },
                    outcome.category,
                    outcome.priority,
                    outcome.trust_level,
                    outcome.supporters
                ));
                filed.push(Some(outcome.id));
            }
            Err(err) => {
                summary.rejected += 1;
                summary.lines.push(format!("{row:>4} | rejected: {err}"));
                filed.push(None);
            }
        }
    }

    summary
}

fn print_outcome(outcome: &ReportOutcome) {
    println!(
        "  {} issue {} -> {} ({}), priority {}, trust {}, supporters {}",
        if outcome.duplicate { "Merged into" } else { "Opened" },
        outcome.id,
        outcome.category,
        outcome.authority,
        outcome.priority,
        outcome.trust_level,
        outcome.supporters
    );
    for action in &outcome.actions {
        println!("    * {action}");
    }
}

fn render_admin_views(service: &AppService, now: DateTime<Utc>) {
    // Area health runs first: it escalates aging open issues.
    let health = service.area_health(now);
    let stats = service.stats();

    println!("\nStats");
    println!(
        "- {} total | {} open | {} resolved | {} high priority",
        stats.total_issues, stats.open_issues, stats.resolved_issues, stats.high_priority_issues
    );

    let high = service.high_priority_open();
    if high.is_empty() {
        println!("\nHigh priority open issues: none");
    } else {
        println!("\nHigh priority open issues");
        for issue in &high {
            println!(
                "- issue {} | {} | {:.4},{:.4} | supporters {}",
                issue.id, issue.category, issue.lat, issue.lon, issue.supporters
            );
        }
    }

    println!("\nArea health");
    for row in &health {
        println!(
            "- {}: {}% ({}) | {}/{} resolved",
            row.area,
            row.health_score,
            row.color.label(),
            row.resolved_issues,
            row.total_issues
        );
    }

    let critical = service.critical_areas();
    if critical.is_empty() {
        println!("\nCritical areas: none");
    } else {
        println!("\nCritical areas");
        for area in &critical {
            println!("- {} (health {}%)", area.area, area.health_score);
        }
    }
}
