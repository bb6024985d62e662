//! `sitegrade audit <url>`: run one audit and print the report.

use crate::cli::output::{self, Styled};
use crate::cli::progress;
use crate::cli::settings::{self, FlagOverrides};
use anyhow::{Context, Result};
use sitegrade::model::{Category, Confidence};
use sitegrade::{
    AuditReport, Completion, Engine, ProviderCredentials, StopReason, Target, CATALOGUE,
    CATALOGUE_VERSION,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit status when the site could not be graded at all.
const EXIT_UNGRADEABLE: u8 = 2;
/// Exit status when `--fail-under` was not met.
const EXIT_BELOW_THRESHOLD: u8 = 1;

/// Priority fixes listed in the text report.
const TOP_FIXES: usize = 5;

pub struct AuditArgs {
    pub url: String,
    pub config: Option<PathBuf>,
    pub overrides: FlagOverrides,
    /// Also write the JSON report here.
    pub output: Option<PathBuf>,
    pub fail_under: Option<f64>,
}

pub async fn run(args: AuditArgs) -> Result<ExitCode> {
    let file = settings::load_file(args.config.as_deref())?;
    let (audit, engine_settings) =
        settings::resolve(file, ProviderCredentials::from_env(), &args.overrides);

    let target = Target::new(&args.url, audit).context("cannot audit this target")?;
    let engine = Engine::new(engine_settings).context("invalid scoring settings")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing with the pages fetched so far");
            on_interrupt.cancel();
        }
    });

    let show_progress = !output::is_quiet() && !output::is_json();
    let spinner = show_progress.then(|| progress::audit_spinner(target.url.as_str()));

    let started = Instant::now();
    let outcome = engine.run_audit(&target, cancel).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let result = outcome.with_context(|| format!("audit of {} failed", target.url))?;
    let report = result.report();

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
    }

    if output::is_json() {
        output::print_json(&report)?;
    } else if !output::is_quiet() {
        print_report(&Styled::new(), &report, started.elapsed().as_millis());
    }

    Ok(ExitCode::from(exit_status(report.overall_score, args.fail_under)))
}

fn exit_status(score: Option<f64>, fail_under: Option<f64>) -> u8 {
    match (score, fail_under) {
        (None, _) => EXIT_UNGRADEABLE,
        (Some(score), Some(min)) if score < min => EXIT_BELOW_THRESHOLD,
        _ => 0,
    }
}

fn print_report(s: &Styled, report: &AuditReport, elapsed_ms: u128) {
    output::print_header(s);
    println!("  {}", s.bold(&report.target));
    println!(
        "  {} pages audited ({} ok, {} failed) in {}",
        report.pages.total,
        report.pages.ok,
        report.pages.errors,
        output::format_duration_ms(elapsed_ms)
    );
    println!();

    match report.overall_score {
        Some(score) => {
            let label = format!("{} {}", report.grade, report.classification.unwrap_or(""));
            let grade = s.score(score, &label);
            println!(
                "  Grade {}   {}   coverage {}",
                s.bold(&grade),
                s.score(score, &format!("{score:.1} / 100")),
                output::percent(report.overall_coverage)
            );
            if report.provisional {
                println!(
                    "  {} provisional: too few metrics could be measured",
                    s.warn_sym()
                );
            }
        }
        None => {
            println!(
                "  {} {}",
                s.fail_sym(),
                s.red("Ungradeable: nothing could be measured")
            );
        }
    }
    if let Completion::Partial { reason } = report.completion {
        let why = match reason {
            StopReason::Cancelled => "cancelled",
            StopReason::Deadline => "overall timeout reached",
        };
        println!("  {} partial audit ({why})", s.warn_sym());
    }
    println!();

    output::print_section(s, "Categories");
    for category in Category::ALL {
        let Some(c) = report.categories.get(&category) else {
            continue;
        };
        let value = match c.score {
            Some(score) => format!(
                "{} {:>5.1}  {}",
                s.score(score, &output::score_bar(score, 20)),
                score,
                s.dim(&format!("coverage {}", output::percent(c.coverage)))
            ),
            None => s.dim("not measured"),
        };
        let sym = s.subscore_sym(c.score);
        output::print_check(sym, category.label(), &value);
    }

    if !report.summary.priority_fixes.is_empty() {
        println!();
        output::print_section(s, "Priority fixes");
        for fix in report.summary.priority_fixes.iter().take(TOP_FIXES) {
            output::print_check(
                s.subscore_sym(Some(fix.subscore)),
                fix.name,
                &format!("{:.0}/100", fix.subscore),
            );
            output::print_detail(&s.dim(&fix.detail));
        }
    }

    if output::is_verbose() {
        print_metrics(s, report);
    }

    if !report.competitors.is_empty() {
        println!();
        output::print_section(s, "Competitors");
        for c in &report.competitors {
            let value = match (&c.error, c.overall_score) {
                (Some(err), _) => s.red(err),
                (None, Some(score)) => format!("{} {score:.1}", c.grade),
                (None, None) => c.grade.clone(),
            };
            output::print_check(s.subscore_sym(c.overall_score), &c.url, &value);
        }
    }
}

/// Every metric, grouped by category.
fn print_metrics(s: &Styled, report: &AuditReport) {
    for category in Category::ALL {
        println!();
        output::print_section(s, category.label());
        for d in CATALOGUE.iter().filter(|d| d.category == category) {
            let Some(m) = report.metrics.get(&d.id) else {
                continue;
            };
            let value = match (m.subscore, m.confidence) {
                (Some(v), Confidence::Estimated) => format!("{v:.0} (estimated)"),
                (Some(v), _) => format!("{v:.0}"),
                (None, _) => s.dim("unavailable"),
            };
            output::print_check(s.subscore_sym(m.subscore), d.name, &value);
            if !m.detail.is_empty() {
                output::print_detail(&s.dim(&m.detail));
            }
        }
    }
    println!();
    println!("  {}", s.dim(&format!("catalogue {CATALOGUE_VERSION}")));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_status(None, None), EXIT_UNGRADEABLE);
        assert_eq!(exit_status(None, Some(50.0)), EXIT_UNGRADEABLE);
        assert_eq!(exit_status(Some(72.0), None), 0);
        assert_eq!(exit_status(Some(72.0), Some(70.0)), 0);
        assert_eq!(exit_status(Some(68.5), Some(70.0)), EXIT_BELOW_THRESHOLD);
    }
}
