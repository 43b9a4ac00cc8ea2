//! Report renderers for scenario outcomes: console, JSON, and markdown.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::scenarios::ScenarioOutcome;

/// Envelope around a full run, stamped with the wall clock so archived
/// reports can be told apart.
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    generated_at: String,
    total: usize,
    passed: usize,
    failed: usize,
    outcomes: &'a [ScenarioOutcome],
}

fn tally(outcomes: &[ScenarioOutcome]) -> (usize, usize, usize) {
    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    (total, passed, total - passed)
}

pub fn generate_console_report(
    writer: &mut impl Write,
    outcomes: &[ScenarioOutcome],
    total_duration: Duration,
) -> Result<()> {
    let (total, passed, failed) = tally(outcomes);

    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Scenario Results Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "===========================".cyan())?;
    writeln!(writer, "Total runs: {total}")?;
    writeln!(writer, "Passed: {}", passed.to_string().green())?;
    writeln!(writer, "Failed: {}", failed.to_string().red())?;
    #[allow(clippy::cast_precision_loss)]
    let success_rate = if total == 0 {
        100.0
    } else {
        (passed as f64 / total as f64) * 100.0
    };
    writeln!(writer, "Success rate: {success_rate:.1}%")?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for outcome in outcomes {
        let status = if outcome.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            writer,
            "{} {} (seed {})",
            status,
            outcome.scenario.bold(),
            outcome.seed_code
        )?;
        writeln!(writer, "   Time: {:?}", outcome.duration)?;
        if !outcome.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &outcome.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    if let (Some(fastest), Some(slowest)) = (
        outcomes.iter().min_by_key(|o| o.duration),
        outcomes.iter().max_by_key(|o| o.duration),
    ) {
        writeln!(writer, "{}", "⚡ Performance".bright_yellow().bold())?;
        writeln!(writer, "{}", "=============".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario.green(),
            fastest.duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario.yellow(),
            slowest.duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(writer: &mut impl Write, outcomes: &[ScenarioOutcome]) -> Result<()> {
    let (total, passed, failed) = tally(outcomes);
    let report = RunReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        total,
        passed,
        failed,
        outcomes,
    };
    let json_output = serde_json::to_string_pretty(&report)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(
    writer: &mut impl Write,
    outcomes: &[ScenarioOutcome],
) -> Result<()> {
    let (total, passed, failed) = tally(outcomes);

    writeln!(writer, "# Farhold Scenario Results\n")?;
    writeln!(writer, "Generated: {}\n", chrono::Utc::now().to_rfc3339())?;
    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total runs**: {total}")?;
    writeln!(writer, "- **Passed**: {passed}")?;
    writeln!(writer, "- **Failed**: {failed}\n")?;

    writeln!(writer, "## Detailed Results\n")?;
    for outcome in outcomes {
        let status = if outcome.passed { "✅" } else { "❌" };
        writeln!(writer, "### {} {}\n", status, outcome.scenario)?;
        writeln!(writer, "- **Seed**: {}", outcome.seed_code)?;
        writeln!(writer, "- **Time**: {:?}", outcome.duration)?;
        if !outcome.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &outcome.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}
